// Copyright 2024-2026 querygate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Client subcommands: query, secure, analytics.
//!
//! Each connects to a running server, sends one request and prints the
//! JSON reply. Exit codes: 0 accepted, 1 rejected, 3 server unreachable.

use serde::Serialize;

use crate::cli::report_unreachable;
use crate::gateway::{QueryRequest, SecureRequest};
use crate::ipc::{IpcClient, IpcMessage};

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to render reply: {}", e),
    }
}

/// Print a reply and map it to an exit code.
fn report(reply: IpcMessage) -> i32 {
    match reply {
        IpcMessage::QueryResponse(response) => {
            print_json(&response);
            0
        }
        IpcMessage::AnalyticsResponse(snapshot) => {
            print_json(&snapshot);
            0
        }
        IpcMessage::SecureResponse(outcome) => {
            print_json(&outcome.verdict);
            if outcome.status == 200 {
                0
            } else {
                eprintln!("Rejected with status {}", outcome.status);
                1
            }
        }
        IpcMessage::Error { code, message } => {
            eprintln!("Error {}: {}", code, message);
            1
        }
        other => {
            eprintln!("Unexpected reply: {}", other.kind());
            1
        }
    }
}

async fn send(socket_path: &str, message: IpcMessage) -> i32 {
    match IpcClient::new(socket_path).request(&message).await {
        Ok(reply) => report(reply),
        Err(e) => report_unreachable(&e),
    }
}

/// `query <text> [--user <id>]`
pub async fn run_query(socket_path: &str, text: &str, user_id: Option<&str>) -> i32 {
    let mut request = QueryRequest::new(text);
    if let Some(user_id) = user_id {
        request = request.with_user(user_id);
    }
    send(socket_path, IpcMessage::QueryRequest(request)).await
}

/// `secure <user> <input>`
pub async fn run_secure(socket_path: &str, user_id: &str, input: &str) -> i32 {
    send(
        socket_path,
        IpcMessage::SecureRequest(SecureRequest::new(user_id, input)),
    )
    .await
}

pub async fn run_analytics(socket_path: &str) -> i32 {
    send(socket_path, IpcMessage::AnalyticsRequest).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::AnalyticsSnapshot;
    use crate::gateway::SecureOutcome;
    use crate::security::AdmissionVerdict;

    #[test]
    fn test_report_exit_codes() {
        assert_eq!(report(IpcMessage::AnalyticsResponse(AnalyticsSnapshot::from_counts(2, 1, 1))), 0);
        assert_eq!(report(IpcMessage::error(429, "slow down")), 1);
        let allowed = SecureOutcome {
            status: 200,
            verdict: AdmissionVerdict::allowed("ok".to_string()),
        };
        assert_eq!(report(IpcMessage::SecureResponse(allowed)), 0);
        assert_eq!(report(IpcMessage::AnalyticsRequest), 1);
    }

    #[tokio::test]
    async fn test_query_against_missing_server_returns_3() {
        let code = run_query("/nonexistent/querygate-test.sock", "hi", None).await;
        assert_eq!(code, 3);
    }
}
