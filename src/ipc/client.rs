//! Minimal IPC client used by the CLI.

use interprocess::local_socket::tokio::{prelude::*, Stream};
use interprocess::local_socket::{GenericFilePath, ToFsName};
use thiserror::Error;

use super::protocol::{decode_message, encode_message, IpcMessage, ProtocolError, MAX_MESSAGE_SIZE};
use super::server::{read_frame, write_frame, ServerError};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to connect to {path}: {source}")]
    Connect {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] ServerError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Server closed the connection without replying")]
    NoResponse,
}

/// One-shot request/response client.
#[derive(Debug, Clone)]
pub struct IpcClient {
    socket_path: String,
}

impl IpcClient {
    pub fn new(socket_path: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    /// Connect, send `message`, and wait for the reply.
    pub async fn request(&self, message: &IpcMessage) -> Result<IpcMessage, ClientError> {
        let connect_err = |source| ClientError::Connect {
            path: self.socket_path.clone(),
            source,
        };
        let name = self
            .socket_path
            .as_str()
            .to_fs_name::<GenericFilePath>()
            .map_err(connect_err)?;
        let mut stream = Stream::connect(name).await.map_err(connect_err)?;

        write_frame(&mut stream, &encode_message(message)?).await?;
        let reply = read_frame(&mut stream, MAX_MESSAGE_SIZE)
            .await?
            .ok_or(ClientError::NoResponse)?;
        Ok(decode_message(&reply)?)
    }
}
