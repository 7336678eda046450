pub mod board;
pub mod lock;
pub mod operation;

pub use board::{Board, BoardRegistration, BoardUpsert};
pub use lock::Lock;
pub use operation::{NewOperation, Operation};
