//! Wire format and schema validation for IPC messages.
//!
//! # Security
//! - Message size limits prevent memory exhaustion attacks
//! - Response size limits prevent resource exhaustion

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::AnalyticsSnapshot;
use crate::gateway::{QueryRequest, QueryResponse, SecureOutcome, SecureRequest};
use crate::health::HealthReport;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

/// Health check request types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthCheckType {
    Liveness,
    Readiness,
    Full,
}

/// Health check response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub check_type: HealthCheckType,
    pub ok: bool,
    pub report: Option<HealthReport>,
}

/// All possible IPC message types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IpcMessage {
    #[serde(rename = "query_request")]
    QueryRequest(QueryRequest),

    #[serde(rename = "query_response")]
    QueryResponse(QueryResponse),

    #[serde(rename = "secure_request")]
    SecureRequest(SecureRequest),

    #[serde(rename = "secure_response")]
    SecureResponse(SecureOutcome),

    #[serde(rename = "analytics_request")]
    AnalyticsRequest,

    #[serde(rename = "analytics_response")]
    AnalyticsResponse(AnalyticsSnapshot),

    #[serde(rename = "health_check")]
    HealthCheck { check_type: HealthCheckType },

    #[serde(rename = "health_response")]
    HealthResponse(HealthCheckResponse),

    #[serde(rename = "error")]
    Error { code: u32, message: String },
}

impl IpcMessage {
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self::Error {
            code: u32::from(code),
            message: message.into(),
        }
    }

    /// Wire tag, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::QueryRequest(_) => "query_request",
            Self::QueryResponse(_) => "query_response",
            Self::SecureRequest(_) => "secure_request",
            Self::SecureResponse(_) => "secure_response",
            Self::AnalyticsRequest => "analytics_request",
            Self::AnalyticsResponse(_) => "analytics_response",
            Self::HealthCheck { .. } => "health_check",
            Self::HealthResponse(_) => "health_response",
            Self::Error { .. } => "error",
        }
    }
}

pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024; // 16 MB
/// Maximum response size to prevent memory exhaustion
const MAX_RESPONSE_SIZE: usize = 16 * 1024 * 1024; // 16 MB

/// Encode message to JSON bytes with size limit enforcement.
pub fn encode_message(message: &IpcMessage) -> Result<Vec<u8>, ProtocolError> {
    let bytes = serde_json::to_vec(message)?;
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(bytes)
}

/// Encode response message; an oversized response becomes a 413 error.
pub fn encode_response(message: &IpcMessage) -> Result<Vec<u8>, ProtocolError> {
    let bytes = serde_json::to_vec(message)?;
    if bytes.len() > MAX_RESPONSE_SIZE {
        let error_response = IpcMessage::error(
            413,
            format!(
                "Response too large: {} bytes (max {})",
                bytes.len(),
                MAX_RESPONSE_SIZE
            ),
        );
        return encode_message(&error_response);
    }
    Ok(bytes)
}

/// Decode message from JSON bytes.
///
/// Size is checked before parsing.
pub fn decode_message(bytes: &[u8]) -> Result<IpcMessage, ProtocolError> {
    if bytes.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: bytes.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(serde_json::from_slice(bytes)?)
}
