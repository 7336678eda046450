//! Storage layer for the Voung lock server.
//!
//! This crate persists boards, their lock channels and the operator action
//! log. The connection layer only sees the [`BoardStore`] trait; two
//! implementations are provided:
//!
//! - [`SqliteBoardStore`] - SQLite through an `sqlx` pool with embedded migrations
//! - [`InMemoryBoardStore`] - process-local state for tests
//!
//! # Example
//!
//! ```no_run
//! use voung_core::DeviceId;
//! use voung_storage::{BoardRegistration, BoardStore, Database, DatabaseConfig, SqliteBoardStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("voung.db")).await?;
//! let store = SqliteBoardStore::new(db.pool().clone());
//!
//! let registration = BoardRegistration::new(DeviceId::new("BOARD001")?, 1);
//! let upsert = store.upsert_board(&registration).await?;
//! if upsert.created {
//!     store
//!         .create_channels_for_board(upsert.board.id, upsert.board.channel_count())
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;
pub mod store;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use models::{Board, BoardRegistration, BoardUpsert, Lock, NewOperation, Operation};
pub use repositories::{InMemoryBoardStore, SqliteBoardStore};
pub use store::BoardStore;
