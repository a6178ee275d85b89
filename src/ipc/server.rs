//! IPC server loop.
//!
//! Frames are a u32 little-endian length followed by a JSON payload. The
//! length is checked against the configured limit before any allocation.
//! Each accepted connection holds a pool slot for its lifetime and is
//! served on its own task.

use std::io;
use std::sync::Arc;

use interprocess::local_socket::tokio::prelude::*;
use interprocess::local_socket::{GenericFilePath, ListenerOptions, ToFsName};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

use super::connections::ConnectionPool;
use super::handler::IpcHandler;
use super::protocol::{encode_message, IpcMessage};
use crate::security_log;
use crate::telemetry::SecurityEvent;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IPC I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

/// Server-side limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcServerConfig {
    pub max_frame_size: usize,
}

impl Default for IpcServerConfig {
    fn default() -> Self {
        Self {
            max_frame_size: 1024 * 1024, // 1 MiB
        }
    }
}

/// Read one frame. `Ok(None)` on a clean close before the length prefix.
pub async fn read_frame<R>(reader: &mut R, max: usize) -> Result<Option<Vec<u8>>, ServerError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let size = u32::from_le_bytes(len_buf) as usize;
    if size > max {
        return Err(ServerError::FrameTooLarge { size, max });
    }

    let mut buf = vec![0u8; size];
    reader.read_exact(&mut buf).await?;
    Ok(Some(buf))
}

/// Write one length-prefixed frame and flush.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len()).map_err(|_| ServerError::FrameTooLarge {
        size: payload.len(),
        max: u32::MAX as usize,
    })?;
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Serve request/response frames on one stream until the peer closes it.
///
/// An oversized frame is answered with a 413 error and ends the connection,
/// since the rest of the stream can no longer be trusted to be aligned.
pub async fn serve_connection<S>(
    mut stream: S,
    handler: &IpcHandler,
    config: &IpcServerConfig,
) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let request = match read_frame(&mut stream, config.max_frame_size).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(()),
            Err(ServerError::FrameTooLarge { size, max }) => {
                security_log!(
                    SecurityEvent::InvalidFrame,
                    "Oversized frame rejected",
                    "size" => size.to_string().as_str(),
                    "max" => max.to_string().as_str()
                );
                let reply = IpcMessage::error(413, format!("Frame too large: {} bytes", size));
                if let Ok(bytes) = encode_message(&reply) {
                    let _ = write_frame(&mut stream, &bytes).await;
                }
                return Err(ServerError::FrameTooLarge { size, max });
            }
            Err(e) => return Err(e),
        };

        let response = match handler.process(&request).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let reply = IpcMessage::error(e.status_code(), e.to_string());
                encode_message(&reply).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
            }
        };
        write_frame(&mut stream, &response).await?;
    }
}

/// Accept connections on `socket_path` until `shutdown` flips to true.
pub async fn run_server(
    socket_path: String,
    handler: Arc<IpcHandler>,
    connections: Arc<ConnectionPool>,
    mut shutdown: watch::Receiver<bool>,
    config: IpcServerConfig,
) -> Result<(), ServerError> {
    #[cfg(unix)]
    remove_stale_socket(&socket_path);

    let name = socket_path.as_str().to_fs_name::<GenericFilePath>()?;
    let listener = ListenerOptions::new().name(name).create_tokio()?;
    tracing::info!(socket = %socket_path, "IPC server listening");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => {
                let stream = match accepted {
                    Ok(stream) => stream,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                };

                let Some(guard) = connections.try_acquire_owned() else {
                    security_log!(
                        SecurityEvent::ConnectionRejected,
                        "Connection limit reached",
                        "max" => connections.max_connections().to_string().as_str()
                    );
                    drop(stream);
                    continue;
                };

                let handler = Arc::clone(&handler);
                let config = config.clone();
                tokio::spawn(async move {
                    let _guard = guard;
                    if let Err(e) = serve_connection(stream, &handler, &config).await {
                        tracing::debug!(error = %e, "connection closed with error");
                    }
                });
            }
        }
    }

    tracing::info!("IPC server stopped accepting connections");
    Ok(())
}

#[cfg(unix)]
fn remove_stale_socket(path: &str) {
    use std::os::unix::fs::FileTypeExt;

    if let Ok(meta) = std::fs::symlink_metadata(path) {
        if meta.file_type().is_socket() {
            let _ = std::fs::remove_file(path);
        }
    }
}
