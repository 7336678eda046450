use chrono::Utc;
use sqlx::SqlitePool;
use voung_core::{DeviceId, LockStatus};

use crate::error::StorageResult;
use crate::models::{Board, BoardRegistration, BoardUpsert, Lock, NewOperation, Operation};
use crate::store::BoardStore;

const BOARD_COLUMNS: &str = r#"
    id, device_id, device_type, ccid, board_address, total_channels,
    is_online, last_heartbeat, ip_address, created_at, updated_at
"#;

const LOCK_COLUMNS: &str = "id, board_id, channel, name, status, last_status_change";

const OPERATION_COLUMNS: &str = r#"
    id, board_id, operation_type, channels, order_number,
    success, error_message, created_at
"#;

/// SQLite implementation of [`BoardStore`]
#[derive(Debug, Clone)]
pub struct SqliteBoardStore {
    pool: SqlitePool,
}

impl SqliteBoardStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl BoardStore for SqliteBoardStore {
    async fn find_board_by_device_id(&self, device_id: &DeviceId) -> StorageResult<Option<Board>> {
        let board = sqlx::query_as::<_, Board>(&format!(
            "SELECT {BOARD_COLUMNS} FROM boards WHERE device_id = ?"
        ))
        .bind(device_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(board)
    }

    async fn find_board_by_address(&self, board_address: u8) -> StorageResult<Option<Board>> {
        let board = sqlx::query_as::<_, Board>(&format!(
            r#"
            SELECT {BOARD_COLUMNS}
            FROM boards
            WHERE board_address = ?
            ORDER BY updated_at DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(i64::from(board_address))
        .fetch_optional(&self.pool)
        .await?;

        Ok(board)
    }

    async fn upsert_board(&self, registration: &BoardRegistration) -> StorageResult<BoardUpsert> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM boards WHERE device_id = ?")
            .bind(registration.device_id.as_str())
            .fetch_optional(&mut *tx)
            .await?;

        let (id, created) = match existing {
            Some(id) => {
                sqlx::query(
                    r#"
                    UPDATE boards
                    SET device_type = ?, ccid = ?, board_address = ?, is_online = 1,
                        last_heartbeat = ?, ip_address = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&registration.device_type)
                .bind(&registration.ccid)
                .bind(i64::from(registration.board_address))
                .bind(now)
                .bind(&registration.ip_address)
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;

                (id, false)
            }
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO boards (
                        device_id, device_type, ccid, board_address, total_channels,
                        is_online, last_heartbeat, ip_address, created_at, updated_at
                    )
                    VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?, ?)
                    "#,
                )
                .bind(registration.device_id.as_str())
                .bind(&registration.device_type)
                .bind(&registration.ccid)
                .bind(i64::from(registration.board_address))
                .bind(i64::from(registration.total_channels))
                .bind(now)
                .bind(&registration.ip_address)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;

                (result.last_insert_rowid(), true)
            }
        };

        let board = sqlx::query_as::<_, Board>(&format!(
            "SELECT {BOARD_COLUMNS} FROM boards WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(BoardUpsert { board, created })
    }

    async fn create_channels_for_board(&self, board_id: i64, total: u8) -> StorageResult<u64> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut created = 0;

        for channel in 1..=total {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO locks (board_id, channel, name, status, last_status_change)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(board_id)
            .bind(i64::from(channel))
            .bind(Lock::default_name(channel))
            .bind(i64::from(LockStatus::Closed.to_u8()))
            .bind(now)
            .execute(&mut *tx)
            .await?;

            created += result.rows_affected();
        }

        tx.commit().await?;

        Ok(created)
    }

    async fn find_channel(&self, board_id: i64, channel: u8) -> StorageResult<Option<Lock>> {
        let lock = sqlx::query_as::<_, Lock>(&format!(
            "SELECT {LOCK_COLUMNS} FROM locks WHERE board_id = ? AND channel = ?"
        ))
        .bind(board_id)
        .bind(i64::from(channel))
        .fetch_optional(&self.pool)
        .await?;

        Ok(lock)
    }

    async fn list_channels(&self, board_id: i64) -> StorageResult<Vec<Lock>> {
        let locks = sqlx::query_as::<_, Lock>(&format!(
            "SELECT {LOCK_COLUMNS} FROM locks WHERE board_id = ? ORDER BY channel"
        ))
        .bind(board_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(locks)
    }

    async fn update_channel_status(
        &self,
        board_id: i64,
        channel: u8,
        status: LockStatus,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE locks
            SET status = ?, last_status_change = ?
            WHERE board_id = ? AND channel = ?
            "#,
        )
        .bind(i64::from(status.to_u8()))
        .bind(Utc::now())
        .bind(board_id)
        .bind(i64::from(channel))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_heartbeat(&self, device_id: &DeviceId) -> StorageResult<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE boards
            SET is_online = 1, last_heartbeat = ?, updated_at = ?
            WHERE device_id = ?
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(device_id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_board_offline(&self, device_id: &DeviceId) -> StorageResult<bool> {
        let result =
            sqlx::query("UPDATE boards SET is_online = 0, updated_at = ? WHERE device_id = ?")
                .bind(Utc::now())
                .bind(device_id.as_str())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_operation(&self, operation: &NewOperation) -> StorageResult<i64> {
        let channels = operation.channels_json()?;

        let result = sqlx::query(
            r#"
            INSERT INTO operations (
                board_id, operation_type, channels, order_number,
                success, error_message, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(operation.board_id)
        .bind(operation.operation_type.as_str())
        .bind(channels)
        .bind(operation.order_number.as_str())
        .bind(operation.success)
        .bind(&operation.error_message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn recent_operations(&self, board_id: i64, limit: u32) -> StorageResult<Vec<Operation>> {
        let operations = sqlx::query_as::<_, Operation>(&format!(
            r#"
            SELECT {OPERATION_COLUMNS}
            FROM operations
            WHERE board_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#
        ))
        .bind(board_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(operations)
    }
}
