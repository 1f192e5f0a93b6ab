//! PostgreSQL integration tests
//!
//! These tests start a shared PostgreSQL container and need Docker.
//! Run with:
//!
//! ```bash
//! cargo test -p event-store --test postgres_integration -- --ignored
//! ```

use std::sync::Arc;

use event_store::{
    EntityId, EventStore, EventStoreExt, NewEvent, PostgresEventStore, PostgresStateStore,
    StateStore, StoreError, Version,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresEventStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh pool with cleared tables
async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE events, records")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

fn create_test_event(event_type: &str) -> NewEvent {
    NewEvent::builder()
        .aggregate_type("TestAggregate")
        .event_type(event_type)
        .payload_raw(serde_json::json!({"test": true}))
        .metadata("source", serde_json::json!("integration"))
        .build()
        .unwrap()
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn append_and_read_stream() {
    let store = PostgresEventStore::new(get_test_pool().await);
    let stream_id = EntityId::new();

    let version = store
        .append(
            &stream_id,
            Version::initial(),
            vec![
                create_test_event("Event1"),
                create_test_event("Event2"),
                create_test_event("Event3"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(version, Version::new(3));

    let events = store.read_full_stream(&stream_id).await.unwrap();
    let versions: Vec<i64> = events.iter().map(|e| e.version.as_i64()).collect();
    assert_eq!(versions, vec![1, 2, 3]);
    assert_eq!(events[0].event_type, "Event1");
    assert_eq!(
        events[0].metadata.get("source"),
        Some(&serde_json::json!("integration"))
    );

    let from_v2 = store.read_stream(&stream_id, Version::new(2)).await.unwrap();
    assert_eq!(from_v2.len(), 2);
    assert_eq!(from_v2[0].version, Version::new(2));
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn stale_expected_version_is_rejected() {
    let store = PostgresEventStore::new(get_test_pool().await);
    let stream_id = EntityId::new();

    store
        .append_one(&stream_id, Version::initial(), create_test_event("Event1"))
        .await
        .unwrap();

    let result = store
        .append_one(&stream_id, Version::initial(), create_test_event("Event2"))
        .await;

    match result {
        Err(StoreError::ConcurrencyConflict {
            expected, actual, ..
        }) => {
            assert_eq!(expected, Version::initial());
            assert_eq!(actual, Version::first());
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(
        store.stream_version(&stream_id).await.unwrap(),
        Version::first()
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn concurrent_appends_have_one_winner() {
    let store = PostgresEventStore::new(get_test_pool().await);
    let stream_id = EntityId::new();
    store
        .append_one(&stream_id, Version::initial(), create_test_event("Event1"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let store = store.clone();
        let stream_id = stream_id.clone();
        handles.push(tokio::spawn(async move {
            store
                .append_one(&stream_id, Version::first(), create_test_event("Event2"))
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            // Losers wait on the stream lock and see the winner's head
            Err(StoreError::ConcurrencyConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, Version::first());
                assert_eq!(actual, Version::new(2));
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(store.read_full_stream(&stream_id).await.unwrap().len(), 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn read_all_follows_commit_order() {
    use futures_util::StreamExt;

    let store = PostgresEventStore::new(get_test_pool().await);
    let first = EntityId::new();
    let second = EntityId::new();

    store
        .append_one(&first, Version::initial(), create_test_event("A"))
        .await
        .unwrap();
    store
        .append_one(&second, Version::initial(), create_test_event("B"))
        .await
        .unwrap();
    store
        .append_one(&first, Version::first(), create_test_event("C"))
        .await
        .unwrap();

    let types: Vec<String> = store
        .read_all()
        .await
        .unwrap()
        .map(|e| e.unwrap().event_type)
        .collect()
        .await;
    assert_eq!(types, vec!["A", "B", "C"]);
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn state_store_round_trip_and_conflicts() {
    let store = PostgresStateStore::new(get_test_pool().await);
    let id = EntityId::new();

    let v1 = store
        .save("Customer", &id, Version::initial(), serde_json::json!({"points": 0}))
        .await
        .unwrap();
    assert_eq!(v1, Version::first());

    let v2 = store
        .save("Customer", &id, v1, serde_json::json!({"points": 10}))
        .await
        .unwrap();
    assert_eq!(v2, Version::new(2));

    // Unchanged state does not bump the version
    let same = store
        .save("Customer", &id, v2, serde_json::json!({"points": 10}))
        .await
        .unwrap();
    assert_eq!(same, v2);

    let stale = store
        .save("Customer", &id, v1, serde_json::json!({"points": 99}))
        .await;
    assert!(stale.unwrap_err().is_concurrency_conflict());

    let record = store.load("Customer", &id).await.unwrap().unwrap();
    assert_eq!(record.state["points"], 10);

    store.delete("Customer", &id, v2).await.unwrap();
    assert!(store.load("Customer", &id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn duplicate_insert_of_new_record_conflicts() {
    let store = PostgresStateStore::new(get_test_pool().await);
    let id = EntityId::new();

    store
        .save("Customer", &id, Version::initial(), serde_json::json!({"name": "Ada"}))
        .await
        .unwrap();
    let second = store
        .save("Customer", &id, Version::initial(), serde_json::json!({"name": "Bob"}))
        .await;
    assert!(second.unwrap_err().is_concurrency_conflict());
}
