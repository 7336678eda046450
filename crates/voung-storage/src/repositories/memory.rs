use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use voung_core::{DeviceId, LockStatus};

use crate::error::{StorageError, StorageResult};
use crate::models::{Board, BoardRegistration, BoardUpsert, Lock, NewOperation, Operation};
use crate::store::BoardStore;

#[derive(Debug, Default)]
struct State {
    boards: Vec<Board>,
    locks: Vec<Lock>,
    operations: Vec<Operation>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process [`BoardStore`] used by tests and tooling.
///
/// Counts every successful mutation and can be switched to fail all calls
/// with [`StorageError::Unavailable`].
#[derive(Debug, Default)]
pub struct InMemoryBoardStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
    mutations: AtomicUsize,
}

impl InMemoryBoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of calls that changed stored data.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Snapshot of all boards.
    pub fn boards(&self) -> Vec<Board> {
        self.lock_state()
            .map(|state| state.boards.clone())
            .unwrap_or_default()
    }

    /// Snapshot of all operations, oldest first.
    pub fn operations(&self) -> Vec<Operation> {
        self.lock_state()
            .map(|state| state.operations.clone())
            .unwrap_or_default()
    }

    fn lock_state(&self) -> StorageResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StorageError::Internal("in-memory store mutex poisoned".to_string()))
    }

    fn state(&self) -> StorageResult<MutexGuard<'_, State>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(
                "in-memory store switched off".to_string(),
            ));
        }
        self.lock_state()
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

impl BoardStore for InMemoryBoardStore {
    async fn find_board_by_device_id(&self, device_id: &DeviceId) -> StorageResult<Option<Board>> {
        let state = self.state()?;
        Ok(state
            .boards
            .iter()
            .find(|b| b.device_id == device_id.as_str())
            .cloned())
    }

    async fn find_board_by_address(&self, board_address: u8) -> StorageResult<Option<Board>> {
        let state = self.state()?;
        Ok(state
            .boards
            .iter()
            .filter(|b| b.board_address == i32::from(board_address))
            .max_by_key(|b| (b.updated_at, b.id))
            .cloned())
    }

    async fn upsert_board(&self, registration: &BoardRegistration) -> StorageResult<BoardUpsert> {
        let mut state = self.state()?;
        let now = Utc::now();

        let existing = state
            .boards
            .iter_mut()
            .find(|b| b.device_id == registration.device_id.as_str());

        let upsert = match existing {
            Some(board) => {
                board.device_type = registration.device_type.clone();
                board.ccid = registration.ccid.clone();
                board.board_address = i32::from(registration.board_address);
                board.is_online = true;
                board.last_heartbeat = Some(now);
                board.ip_address = registration.ip_address.clone();
                board.updated_at = now;
                BoardUpsert {
                    board: board.clone(),
                    created: false,
                }
            }
            None => {
                let board = Board {
                    id: state.next_id(),
                    device_id: registration.device_id.as_str().to_string(),
                    device_type: registration.device_type.clone(),
                    ccid: registration.ccid.clone(),
                    board_address: i32::from(registration.board_address),
                    total_channels: i32::from(registration.total_channels),
                    is_online: true,
                    last_heartbeat: Some(now),
                    ip_address: registration.ip_address.clone(),
                    created_at: now,
                    updated_at: now,
                };
                state.boards.push(board.clone());
                BoardUpsert {
                    board,
                    created: true,
                }
            }
        };

        drop(state);
        self.mutated();
        Ok(upsert)
    }

    async fn create_channels_for_board(&self, board_id: i64, total: u8) -> StorageResult<u64> {
        let mut state = self.state()?;
        let now = Utc::now();
        let mut created = 0;

        for channel in 1..=total {
            let exists = state
                .locks
                .iter()
                .any(|l| l.board_id == board_id && l.channel == i32::from(channel));
            if exists {
                continue;
            }

            let id = state.next_id();
            state.locks.push(Lock {
                id,
                board_id,
                channel: i32::from(channel),
                name: Lock::default_name(channel),
                status: i32::from(LockStatus::Closed.to_u8()),
                last_status_change: now,
            });
            created += 1;
        }

        drop(state);
        if created > 0 {
            self.mutated();
        }
        Ok(created)
    }

    async fn find_channel(&self, board_id: i64, channel: u8) -> StorageResult<Option<Lock>> {
        let state = self.state()?;
        Ok(state
            .locks
            .iter()
            .find(|l| l.board_id == board_id && l.channel == i32::from(channel))
            .cloned())
    }

    async fn list_channels(&self, board_id: i64) -> StorageResult<Vec<Lock>> {
        let state = self.state()?;
        let mut locks: Vec<Lock> = state
            .locks
            .iter()
            .filter(|l| l.board_id == board_id)
            .cloned()
            .collect();
        locks.sort_by_key(|l| l.channel);
        Ok(locks)
    }

    async fn update_channel_status(
        &self,
        board_id: i64,
        channel: u8,
        status: LockStatus,
    ) -> StorageResult<bool> {
        let mut state = self.state()?;
        let Some(lock) = state
            .locks
            .iter_mut()
            .find(|l| l.board_id == board_id && l.channel == i32::from(channel))
        else {
            return Ok(false);
        };

        lock.status = i32::from(status.to_u8());
        lock.last_status_change = Utc::now();
        drop(state);
        self.mutated();
        Ok(true)
    }

    async fn record_heartbeat(&self, device_id: &DeviceId) -> StorageResult<bool> {
        let mut state = self.state()?;
        let Some(board) = state
            .boards
            .iter_mut()
            .find(|b| b.device_id == device_id.as_str())
        else {
            return Ok(false);
        };

        let now = Utc::now();
        board.is_online = true;
        board.last_heartbeat = Some(now);
        board.updated_at = now;
        drop(state);
        self.mutated();
        Ok(true)
    }

    async fn mark_board_offline(&self, device_id: &DeviceId) -> StorageResult<bool> {
        let mut state = self.state()?;
        let Some(board) = state
            .boards
            .iter_mut()
            .find(|b| b.device_id == device_id.as_str())
        else {
            return Ok(false);
        };

        board.is_online = false;
        board.updated_at = Utc::now();
        drop(state);
        self.mutated();
        Ok(true)
    }

    async fn record_operation(&self, operation: &NewOperation) -> StorageResult<i64> {
        let channels = operation.channels_json()?;
        let mut state = self.state()?;

        let id = state.next_id();
        state.operations.push(Operation {
            id,
            board_id: operation.board_id,
            operation_type: operation.operation_type.as_str().to_string(),
            channels,
            order_number: operation.order_number.as_str().to_string(),
            success: operation.success,
            error_message: operation.error_message.clone(),
            created_at: Utc::now(),
        });

        drop(state);
        self.mutated();
        Ok(id)
    }

    async fn recent_operations(&self, board_id: i64, limit: u32) -> StorageResult<Vec<Operation>> {
        let state = self.state()?;
        Ok(state
            .operations
            .iter()
            .rev()
            .filter(|op| op.board_id == board_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voung_core::OperationType;

    fn registration(id: &str, address: u8) -> BoardRegistration {
        BoardRegistration::new(DeviceId::new(id).unwrap(), address)
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let store = InMemoryBoardStore::new();

        let first = store
            .upsert_board(&registration("BOARD001", 1))
            .await
            .unwrap();
        assert!(first.created);
        assert!(first.board.is_online);

        let second = store
            .upsert_board(&registration("BOARD001", 4).ccid("8986"))
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.board.id, first.board.id);
        assert_eq!(second.board.board_address, 4);
        assert_eq!(second.board.ccid, "8986");
        assert_eq!(store.boards().len(), 1);
    }

    #[tokio::test]
    async fn test_channels_created_once() {
        let store = InMemoryBoardStore::new();
        let board = store
            .upsert_board(&registration("BOARD001", 1).total_channels(4))
            .await
            .unwrap()
            .board;

        assert_eq!(store.create_channels_for_board(board.id, 4).await.unwrap(), 4);
        assert_eq!(store.create_channels_for_board(board.id, 4).await.unwrap(), 0);

        let locks = store.list_channels(board.id).await.unwrap();
        assert_eq!(locks.len(), 4);
        assert!(locks.iter().all(|l| l.status == 1));
        assert_eq!(locks[3].name, "Lock 4");
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_without_mutation() {
        let store = InMemoryBoardStore::new();
        store.set_unavailable(true);

        let result = store.upsert_board(&registration("BOARD001", 1)).await;
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
        assert_eq!(store.mutation_count(), 0);

        store.set_unavailable(false);
        assert!(store.upsert_board(&registration("BOARD001", 1)).await.is_ok());
        assert_eq!(store.mutation_count(), 1);
    }

    #[tokio::test]
    async fn test_heartbeat_unknown_device_is_not_a_mutation() {
        let store = InMemoryBoardStore::new();
        let id = DeviceId::new("GHOST").unwrap();

        assert!(!store.record_heartbeat(&id).await.unwrap());
        assert!(!store.mark_board_offline(&id).await.unwrap());
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_recent_operations_newest_first() {
        let store = InMemoryBoardStore::new();
        for channel in 1..=3u8 {
            let op = NewOperation::new(1, OperationType::KeepOpen, vec![channel]).succeeded();
            store.record_operation(&op).await.unwrap();
        }
        store
            .record_operation(&NewOperation::new(2, OperationType::OpenAll, vec![]))
            .await
            .unwrap();

        let ops = store.recent_operations(1, 2).await.unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].channels().unwrap(), vec![3]);
        assert_eq!(ops[1].channels().unwrap(), vec![2]);
    }
}
