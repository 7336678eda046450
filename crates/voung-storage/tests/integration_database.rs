//! Integration tests for the SQLite board store.
//!
//! Run with: cargo test --package voung-storage --test integration_database

use std::sync::Arc;
use tokio::sync::Barrier;
use voung_core::{DeviceId, LockStatus, OperationType, OrderNumber};
use voung_storage::{
    BoardRegistration, BoardStore, Database, DatabaseConfig, NewOperation, SqliteBoardStore,
};

async fn store() -> (Database, SqliteBoardStore) {
    let db = Database::in_memory().await.unwrap();
    let store = SqliteBoardStore::new(db.pool().clone());
    (db, store)
}

fn registration(id: &str, address: u8) -> BoardRegistration {
    BoardRegistration::new(DeviceId::new(id).unwrap(), address)
}

#[tokio::test]
async fn test_in_memory_database() {
    let db = Database::in_memory().await.unwrap();
    db.health_check().await.unwrap();
    db.close().await;
}

#[tokio::test]
async fn test_migration_idempotency() {
    let db = Database::in_memory().await.unwrap();

    db.migrate().await.unwrap();
    db.migrate().await.unwrap();

    let result: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('boards', 'locks', 'operations')",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();

    assert_eq!(result.0, 3);

    db.close().await;
}

#[tokio::test]
async fn test_file_database_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("voung.db");
    let path = path.to_str().unwrap().to_string();

    {
        let db = Database::new(DatabaseConfig::new(&path)).await.unwrap();
        let store = SqliteBoardStore::new(db.pool().clone());
        store
            .upsert_board(&registration("BOARD001", 1))
            .await
            .unwrap();
        db.close().await;
    }

    let db = Database::new(DatabaseConfig::new(&path)).await.unwrap();
    let store = SqliteBoardStore::new(db.pool().clone());
    let board = store
        .find_board_by_device_id(&DeviceId::new("BOARD001").unwrap())
        .await
        .unwrap();
    assert!(board.is_some());
    db.close().await;
}

#[tokio::test]
async fn test_upsert_board_create_and_refresh() {
    let (db, store) = store().await;

    let created = store
        .upsert_board(
            &registration("BOARD001", 1)
                .device_type("0025")
                .ip_address("10.0.0.5"),
        )
        .await
        .unwrap();
    assert!(created.created);
    assert!(created.board.is_online);
    assert!(created.board.last_heartbeat.is_some());
    assert_eq!(created.board.total_channels, 25);
    assert_eq!(created.board.ip_address.as_deref(), Some("10.0.0.5"));

    let refreshed = store
        .upsert_board(&registration("BOARD001", 7).ccid("89860012345678901234"))
        .await
        .unwrap();
    assert!(!refreshed.created);
    assert_eq!(refreshed.board.id, created.board.id);
    assert_eq!(refreshed.board.board_address, 7);
    assert_eq!(refreshed.board.ccid, "89860012345678901234");

    db.close().await;
}

#[tokio::test]
async fn test_find_board_by_address() {
    let (db, store) = store().await;
    store.upsert_board(&registration("BOARD001", 1)).await.unwrap();
    store.upsert_board(&registration("BOARD002", 2)).await.unwrap();

    let board = store.find_board_by_address(2).await.unwrap().unwrap();
    assert_eq!(board.device_id, "BOARD002");
    assert!(store.find_board_by_address(9).await.unwrap().is_none());

    db.close().await;
}

#[tokio::test]
async fn test_channels_lifecycle() {
    let (db, store) = store().await;
    let board = store
        .upsert_board(&registration("BOARD001", 1).total_channels(5))
        .await
        .unwrap()
        .board;

    assert_eq!(store.create_channels_for_board(board.id, 5).await.unwrap(), 5);
    assert_eq!(store.create_channels_for_board(board.id, 5).await.unwrap(), 0);

    let locks = store.list_channels(board.id).await.unwrap();
    assert_eq!(locks.len(), 5);
    assert_eq!(locks[0].channel, 1);
    assert_eq!(locks[4].name, "Lock 5");
    assert!(
        locks
            .iter()
            .all(|l| l.lock_status().unwrap() == LockStatus::Closed)
    );

    assert!(
        store
            .update_channel_status(board.id, 3, LockStatus::Open)
            .await
            .unwrap()
    );
    let lock = store.find_channel(board.id, 3).await.unwrap().unwrap();
    assert_eq!(lock.lock_status().unwrap(), LockStatus::Open);

    assert!(
        !store
            .update_channel_status(board.id, 9, LockStatus::Open)
            .await
            .unwrap()
    );

    db.close().await;
}

#[tokio::test]
async fn test_heartbeat_and_offline() {
    let (db, store) = store().await;
    let id = DeviceId::new("BOARD001").unwrap();
    store.upsert_board(&registration("BOARD001", 1)).await.unwrap();

    assert!(store.mark_board_offline(&id).await.unwrap());
    let board = store.find_board_by_device_id(&id).await.unwrap().unwrap();
    assert!(!board.is_online);

    assert!(store.record_heartbeat(&id).await.unwrap());
    let board = store.find_board_by_device_id(&id).await.unwrap().unwrap();
    assert!(board.is_online);

    let ghost = DeviceId::new("GHOST").unwrap();
    assert!(!store.record_heartbeat(&ghost).await.unwrap());
    assert!(!store.mark_board_offline(&ghost).await.unwrap());

    db.close().await;
}

#[tokio::test]
async fn test_operation_log() {
    let (db, store) = store().await;
    let board = store
        .upsert_board(&registration("BOARD001", 1))
        .await
        .unwrap()
        .board;

    let first = NewOperation::new(board.id, OperationType::OpenSingle, vec![2])
        .order_number(OrderNumber::new("ORD-1"))
        .succeeded();
    let second =
        NewOperation::new(board.id, OperationType::OpenMultiple, vec![1, 3]).failed("timeout");

    store.record_operation(&first).await.unwrap();
    store.record_operation(&second).await.unwrap();

    let ops = store.recent_operations(board.id, 10).await.unwrap();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].operation_type().unwrap(), OperationType::OpenMultiple);
    assert_eq!(ops[0].channels().unwrap(), vec![1, 3]);
    assert!(!ops[0].success);
    assert_eq!(ops[0].error_message.as_deref(), Some("timeout"));
    assert_eq!(ops[1].order_number, "ORD-1");
    assert!(ops[1].success);

    assert_eq!(store.recent_operations(board.id, 1).await.unwrap().len(), 1);

    db.close().await;
}

#[tokio::test]
async fn test_concurrent_heartbeats() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.db");
    let db = Database::new(DatabaseConfig::new(path.to_str().unwrap()).max_connections(4))
        .await
        .unwrap();
    let store = Arc::new(SqliteBoardStore::new(db.pool().clone()));

    const NUM_BOARDS: usize = 8;
    for i in 0..NUM_BOARDS {
        store
            .upsert_board(&registration(&format!("LK{i:02}"), i as u8))
            .await
            .unwrap();
    }

    let barrier = Arc::new(Barrier::new(NUM_BOARDS));
    let mut handles = vec![];

    for i in 0..NUM_BOARDS {
        let store = store.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let id = DeviceId::new(&format!("LK{i:02}")).unwrap();
            store.record_heartbeat(&id).await.unwrap()
        }));
    }

    let results = futures::future::join_all(handles).await;
    assert!(results.into_iter().all(|r| r.unwrap()));

    db.close().await;
}
