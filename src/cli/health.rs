// Copyright 2024-2026 querygate Contributors
// SPDX-License-Identifier: Apache-2.0

//! Health probe subcommands for process supervisors.
//!
//! Exit codes: 0 healthy, 1 unhealthy, 3 server unreachable.

use crate::cli::report_unreachable;
use crate::ipc::{HealthCheckType, IpcClient, IpcMessage};

async fn probe(socket_path: &str, check_type: HealthCheckType) -> i32 {
    let client = IpcClient::new(socket_path);
    match client.request(&IpcMessage::HealthCheck { check_type }).await {
        Ok(IpcMessage::HealthResponse(response)) => {
            if let Some(report) = &response.report {
                match serde_json::to_string_pretty(report) {
                    Ok(text) => println!("{}", text),
                    Err(e) => eprintln!("Failed to render report: {}", e),
                }
            } else {
                println!("{}", if response.ok { "ok" } else { "not ok" });
            }
            if response.ok {
                0
            } else {
                1
            }
        }
        Ok(other) => {
            eprintln!("Unexpected reply: {}", other.kind());
            1
        }
        Err(e) => report_unreachable(&e),
    }
}

/// Full health check with report.
pub async fn run_health(socket_path: &str) -> i32 {
    probe(socket_path, HealthCheckType::Full).await
}

pub async fn run_liveness(socket_path: &str) -> i32 {
    probe(socket_path, HealthCheckType::Liveness).await
}

pub async fn run_readiness(socket_path: &str) -> i32 {
    probe(socket_path, HealthCheckType::Readiness).await
}
