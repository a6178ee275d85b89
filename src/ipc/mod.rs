//! IPC module for querygate.
//!
//! Local socket (Unix domain socket or Windows named pipe) transport with
//! length-prefixed JSON frames. There is no HTTP listener.

mod client;
mod connections;
mod handler;
mod health_handler;
mod protocol;
pub mod server;

pub use client::{ClientError, IpcClient};
pub use connections::{ConnectionConfig, ConnectionGuard, ConnectionPool, OwnedConnectionGuard};
pub use handler::{HandlerError, IpcHandler};
pub use health_handler::HealthHandler;
pub use protocol::{
    decode_message, encode_message, encode_response, HealthCheckResponse, HealthCheckType,
    IpcMessage, ProtocolError, MAX_MESSAGE_SIZE,
};
pub use server::{IpcServerConfig, ServerError};
