use std::future::Future;

use voung_core::{DeviceId, LockStatus};

use crate::error::StorageResult;
use crate::models::{Board, BoardRegistration, BoardUpsert, Lock, NewOperation, Operation};

/// Persistence interface consumed by the connection layer.
///
/// Methods return `Send` futures so implementations can be driven from
/// spawned per-connection tasks. Implementations must be safe to share
/// between sessions behind an `Arc`.
pub trait BoardStore: Send + Sync + 'static {
    /// Find a board by the device identifier it registers with
    fn find_board_by_device_id(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = StorageResult<Option<Board>>> + Send;

    /// Find a board by its frame-header address.
    ///
    /// When several boards share an address the most recently updated one
    /// is returned.
    fn find_board_by_address(
        &self,
        board_address: u8,
    ) -> impl Future<Output = StorageResult<Option<Board>>> + Send;

    /// Create or refresh a board from a registration and mark it online
    fn upsert_board(
        &self,
        registration: &BoardRegistration,
    ) -> impl Future<Output = StorageResult<BoardUpsert>> + Send;

    /// Create closed channels `1..=total` that do not exist yet.
    ///
    /// Returns the number of channels created.
    fn create_channels_for_board(
        &self,
        board_id: i64,
        total: u8,
    ) -> impl Future<Output = StorageResult<u64>> + Send;

    fn find_channel(
        &self,
        board_id: i64,
        channel: u8,
    ) -> impl Future<Output = StorageResult<Option<Lock>>> + Send;

    /// All channels of a board ordered by channel number
    fn list_channels(&self, board_id: i64) -> impl Future<Output = StorageResult<Vec<Lock>>> + Send;

    /// Set a channel's status and change timestamp.
    ///
    /// Returns `false` when the channel does not exist.
    fn update_channel_status(
        &self,
        board_id: i64,
        channel: u8,
        status: LockStatus,
    ) -> impl Future<Output = StorageResult<bool>> + Send;

    /// Mark a board online and refresh its heartbeat.
    ///
    /// Returns `false` when no board has this device identifier.
    fn record_heartbeat(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = StorageResult<bool>> + Send;

    /// Returns `false` when no board has this device identifier.
    fn mark_board_offline(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = StorageResult<bool>> + Send;

    /// Append an operation record, returning its id
    fn record_operation(
        &self,
        operation: &NewOperation,
    ) -> impl Future<Output = StorageResult<i64>> + Send;

    /// Newest operations first
    fn recent_operations(
        &self,
        board_id: i64,
        limit: u32,
    ) -> impl Future<Output = StorageResult<Vec<Operation>>> + Send;
}
