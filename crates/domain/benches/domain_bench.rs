use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    AggregateRoot, EntityId, EventSourcedRepository, Money, Order, OrderEvent, OrderItem,
    UnitOfWork,
};
use event_store::{EventStore, InMemoryEventStore};

fn history(items: usize) -> Vec<OrderEvent> {
    let mut events = vec![OrderEvent::order_placed(
        EntityId::from("order-bench"),
        EntityId::from("customer-bench"),
    )];
    for n in 0..items {
        let item = OrderItem::new(
            format!("SKU-{n:03}"),
            format!("Product {n}"),
            1,
            Money::from_cents(100 + n as i64),
        );
        events.push(OrderEvent::item_added(&item));
    }
    events
}

fn bench_load_from_history(c: &mut Criterion) {
    let events = history(100);

    c.bench_function("domain/load_from_history_100", |b| {
        b.iter(|| Order::load_from_history(EntityId::from("order-bench"), events.clone()));
    });
}

fn bench_commit_and_drain(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/place_commit_drain", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
                let orders = EventSourcedRepository::<Order>::new(store);
                let uow = UnitOfWork::new();

                let order = orders
                    .add(&uow, Order::place(EntityId::new(), EntityId::from("c-1")).unwrap())
                    .await
                    .unwrap();
                order
                    .write()
                    .await
                    .add_item(OrderItem::new("SKU-1", "Mocha", 2, Money::from_cents(500)))
                    .unwrap();

                uow.commit().await.unwrap();
                uow.collect_and_clear_events().await.unwrap();
            });
        });
    });
}

fn bench_get_by_id_replay(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
    let orders = EventSourcedRepository::<Order>::new(store);
    let id = EntityId::from("order-bench");

    rt.block_on(async {
        let uow = UnitOfWork::new();
        let order = orders
            .add(&uow, Order::place(id.clone(), EntityId::from("c-1")).unwrap())
            .await
            .unwrap();
        {
            let mut order = order.write().await;
            for n in 0..50 {
                order
                    .add_item(OrderItem::new(
                        format!("SKU-{n:03}"),
                        "Pastry",
                        1,
                        Money::from_cents(300),
                    ))
                    .unwrap();
            }
        }
        uow.commit().await.unwrap();
    });

    c.bench_function("domain/get_by_id_51_events", |b| {
        b.iter(|| {
            rt.block_on(async {
                let uow = UnitOfWork::new();
                orders.get_by_id(&uow, &id).await.unwrap().unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_load_from_history,
    bench_commit_and_drain,
    bench_get_by_id_replay,
);
criterion_main!(benches);
