use app::{App, Stores, demo};
use domain::EntityId;

#[tokio::test]
async fn walk_through_on_in_memory_stores() {
    let app = App::build(Stores::in_memory()).unwrap();

    let summary = demo::run(&app).await.unwrap();

    assert_eq!(summary.race_conflicts, 1);
    assert_eq!(
        &summary.event_types[..4],
        ["OrderPlaced", "ItemAdded", "ItemAdded", "OrderReady"]
    );
    match summary.event_types[4].as_str() {
        "OrderCompleted" => assert_eq!(summary.loyalty_points, 12),
        "OrderCancelled" => assert_eq!(summary.loyalty_points, 0),
        other => panic!("unexpected final event {other}"),
    }
    assert_eq!(summary.event_types.len(), 5);

    // Terminal orders leave the board
    let order_id = EntityId::from(summary.order_id.as_str());
    assert!(app.board.get_order(&order_id).await.is_none());
    assert_eq!(app.kitchen.notifications().await.len(), 2);
}
