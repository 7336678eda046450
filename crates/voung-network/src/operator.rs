//! Operator actions on stored boards.
//!
//! [`LockOperator`] is the entry point the HTTP layer calls. Each action
//! resolves the board, validates channels against its channel count, sends
//! through the [`CommandGateway`] and logs the attempt in the operation
//! history. Status reads are sent but not logged.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use voung_core::{DeviceId, OperationType, OrderNumber, validate_channel};
use voung_protocol::OutboundCommand;
use voung_storage::{Board, BoardStore, Lock, NewOperation, Operation, StorageError};

use crate::gateway::{CommandGateway, SendOutcome};

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("Board not found: {0}")]
    BoardNotFound(DeviceId),

    #[error("Invalid channel {channel} (board has {total} channels)")]
    InvalidChannel { channel: u8, total: u8 },

    #[error("No channels given")]
    NoChannels,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type OperatorResult<T> = Result<T, OperatorError>;

/// What happened to one operator action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationReport {
    pub operation: OperationType,
    pub outcome: SendOutcome,
    pub channels: Vec<u8>,
}

/// Result of a status read: the send outcome plus the stored rows.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub report: OperationReport,
    pub locks: Vec<Lock>,
}

pub struct LockOperator<S> {
    store: Arc<S>,
    gateway: CommandGateway,
    timeout: Duration,
}

impl<S> Clone for LockOperator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
            timeout: self.timeout,
        }
    }
}

impl<S: BoardStore> LockOperator<S> {
    pub fn new(store: Arc<S>, gateway: CommandGateway, timeout: Duration) -> Self {
        Self {
            store,
            gateway,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn open_single(
        &self,
        device_id: &DeviceId,
        channel: u8,
        order_number: &str,
    ) -> OperatorResult<OperationReport> {
        let board = self.board(device_id).await?;
        check_channel(&board, channel)?;

        let order_number = OrderNumber::new(order_number);
        let command = OutboundCommand::OpenSingle {
            channel,
            order_number: order_number.clone(),
        };
        Ok(self
            .execute(&board, device_id, &command, vec![channel], order_number)
            .await)
    }

    pub async fn open_all(&self, device_id: &DeviceId) -> OperatorResult<OperationReport> {
        let board = self.board(device_id).await?;
        let channels = (1..=board.channel_count()).collect();
        Ok(self
            .execute(
                &board,
                device_id,
                &OutboundCommand::OpenAll,
                channels,
                OrderNumber::default(),
            )
            .await)
    }

    pub async fn open_multiple(
        &self,
        device_id: &DeviceId,
        channels: &[u8],
    ) -> OperatorResult<OperationReport> {
        if channels.is_empty() {
            return Err(OperatorError::NoChannels);
        }
        let board = self.board(device_id).await?;
        for &channel in channels {
            check_channel(&board, channel)?;
        }

        let command = OutboundCommand::OpenMultiple(channels.to_vec());
        Ok(self
            .execute(
                &board,
                device_id,
                &command,
                channels.to_vec(),
                OrderNumber::default(),
            )
            .await)
    }

    pub async fn keep_open(
        &self,
        device_id: &DeviceId,
        channel: u8,
    ) -> OperatorResult<OperationReport> {
        let board = self.board(device_id).await?;
        check_channel(&board, channel)?;
        Ok(self
            .execute(
                &board,
                device_id,
                &OutboundCommand::KeepOpen(channel),
                vec![channel],
                OrderNumber::default(),
            )
            .await)
    }

    pub async fn close_channel(
        &self,
        device_id: &DeviceId,
        channel: u8,
    ) -> OperatorResult<OperationReport> {
        let board = self.board(device_id).await?;
        check_channel(&board, channel)?;
        Ok(self
            .execute(
                &board,
                device_id,
                &OutboundCommand::CloseChannel(channel),
                vec![channel],
                OrderNumber::default(),
            )
            .await)
    }

    /// Ask the board for one channel's status and return the stored row.
    ///
    /// The board answers asynchronously; the stored row reflects the last
    /// STATUS_CHANGE received.
    pub async fn read_status(
        &self,
        device_id: &DeviceId,
        channel: u8,
    ) -> OperatorResult<StatusReport> {
        let board = self.board(device_id).await?;
        check_channel(&board, channel)?;

        let command = OutboundCommand::ReadStatus(channel);
        let outcome = self.gateway.send(device_id, &command, self.timeout).await;
        let locks = self
            .store
            .find_channel(board.id, channel)
            .await?
            .into_iter()
            .collect();

        Ok(StatusReport {
            report: OperationReport {
                operation: command.operation_type(),
                outcome,
                channels: vec![channel],
            },
            locks,
        })
    }

    pub async fn read_all_status(&self, device_id: &DeviceId) -> OperatorResult<StatusReport> {
        let board = self.board(device_id).await?;

        let command = OutboundCommand::ReadAllStatus;
        let outcome = self.gateway.send(device_id, &command, self.timeout).await;
        let locks = self.store.list_channels(board.id).await?;

        Ok(StatusReport {
            report: OperationReport {
                operation: command.operation_type(),
                outcome,
                channels: (1..=board.channel_count()).collect(),
            },
            locks,
        })
    }

    /// Operation history for a board, newest first.
    pub async fn recent_operations(
        &self,
        device_id: &DeviceId,
        limit: u32,
    ) -> OperatorResult<Vec<Operation>> {
        let board = self.board(device_id).await?;
        Ok(self.store.recent_operations(board.id, limit).await?)
    }

    async fn board(&self, device_id: &DeviceId) -> OperatorResult<Board> {
        self.store
            .find_board_by_device_id(device_id)
            .await?
            .ok_or_else(|| OperatorError::BoardNotFound(device_id.clone()))
    }

    async fn execute(
        &self,
        board: &Board,
        device_id: &DeviceId,
        command: &OutboundCommand,
        channels: Vec<u8>,
        order_number: OrderNumber,
    ) -> OperationReport {
        let outcome = self.gateway.send(device_id, command, self.timeout).await;
        let operation = command.operation_type();

        let record = NewOperation::new(board.id, operation, channels.clone())
            .order_number(order_number);
        let record = if outcome.is_delivered() {
            record.succeeded()
        } else {
            record.failed(outcome.to_string())
        };

        if let Err(e) = self.store.record_operation(&record).await {
            warn!(device_id = %device_id, operation = %operation, error = %e, "Failed to record operation");
        }

        info!(
            device_id = %device_id,
            operation = %operation,
            channels = ?channels,
            outcome = %outcome,
            "Operator command"
        );

        OperationReport {
            operation,
            outcome,
            channels,
        }
    }
}

fn check_channel(board: &Board, channel: u8) -> OperatorResult<u8> {
    let total = board.channel_count();
    validate_channel(channel, total).map_err(|_| OperatorError::InvalidChannel { channel, total })
}
