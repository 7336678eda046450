use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use voung_core::{OperationType, OrderNumber};

use crate::error::StorageResult;

/// Append-only record of an operator action sent to a board.
///
/// `channels` holds a JSON array of channel numbers, e.g. `[1,4,9]`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Operation {
    pub id: i64,
    pub board_id: i64,
    pub operation_type: String,
    pub channels: String,
    pub order_number: String,
    pub success: bool,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Operation {
    pub fn operation_type(&self) -> StorageResult<OperationType> {
        Ok(self.operation_type.parse()?)
    }

    pub fn channels(&self) -> StorageResult<Vec<u8>> {
        Ok(serde_json::from_str(&self.channels)?)
    }
}

/// An operation about to be recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOperation {
    pub board_id: i64,
    pub operation_type: OperationType,
    pub channels: Vec<u8>,
    pub order_number: OrderNumber,
    pub success: bool,
    pub error_message: Option<String>,
}

impl NewOperation {
    pub fn new(board_id: i64, operation_type: OperationType, channels: Vec<u8>) -> Self {
        Self {
            board_id,
            operation_type,
            channels,
            order_number: OrderNumber::default(),
            success: false,
            error_message: None,
        }
    }

    pub fn order_number(mut self, order_number: OrderNumber) -> Self {
        self.order_number = order_number;
        self
    }

    pub fn succeeded(mut self) -> Self {
        self.success = true;
        self.error_message = None;
        self
    }

    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(message.into());
        self
    }

    pub fn channels_json(&self) -> StorageResult<String> {
        Ok(serde_json::to_string(&self.channels)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageError;

    #[test]
    fn test_new_operation_builder() {
        let op = NewOperation::new(7, OperationType::OpenMultiple, vec![1, 4, 9])
            .order_number(OrderNumber::new("A-1"))
            .failed("not connected");

        assert!(!op.success);
        assert_eq!(op.error_message.as_deref(), Some("not connected"));
        assert_eq!(op.channels_json().unwrap(), "[1,4,9]");

        let op = op.succeeded();
        assert!(op.success);
        assert!(op.error_message.is_none());
    }

    #[test]
    fn test_operation_decoding() {
        let mut op = Operation {
            id: 1,
            board_id: 1,
            operation_type: "keep_open".to_string(),
            channels: "[3]".to_string(),
            order_number: String::new(),
            success: true,
            error_message: None,
            created_at: Utc::now(),
        };
        assert_eq!(op.operation_type().unwrap(), OperationType::KeepOpen);
        assert_eq!(op.channels().unwrap(), vec![3]);

        op.channels = "not json".to_string();
        assert!(matches!(op.channels(), Err(StorageError::Serialization(_))));

        op.operation_type = "explode".to_string();
        assert!(matches!(
            op.operation_type(),
            Err(StorageError::InvalidData(_))
        ));
    }
}
