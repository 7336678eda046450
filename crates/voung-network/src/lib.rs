//! Connection layer of the Voung lock server.
//!
//! - [`LockServer`] accepts board sockets and spawns one session each
//! - [`ConnectionSession`] reassembles frames and routes them through the
//!   [`CommandDispatcher`]
//! - [`DeviceRegistry`] maps device identifiers to live sessions
//! - [`CommandGateway`] and [`LockOperator`] push commands to boards

pub mod dispatcher;
pub mod gateway;
pub mod operator;
pub mod registry;
pub mod server;
pub mod session;

pub use dispatcher::CommandDispatcher;
pub use gateway::{CommandGateway, DEFAULT_SEND_TIMEOUT, SendOutcome};
pub use operator::{LockOperator, OperationReport, OperatorError, OperatorResult, StatusReport};
pub use registry::{ConnectionInfo, DeviceRegistry};
pub use server::{LockServer, ServerConfig, ServerError};
pub use session::{ConnectionSession, SessionError, SessionHandle, SessionState};
