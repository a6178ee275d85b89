// Copyright 2024-2026 querygate Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI module for querygate commands.
//!
//! Client commands talk to a running server over IPC; `config` commands
//! read the environment directly.
//!
//! ## Usage
//!
//! ```bash
//! querygate query "What is Rust?"    # Cached query
//! querygate secure alice "Hello"     # Admission-gated request
//! querygate analytics                # Hit/miss analytics
//! querygate health                   # Full health check, exits 0 on healthy
//! ```

pub mod config_cmd;
pub mod health;
pub mod query_cmd;

pub use health::{run_health, run_liveness, run_readiness};
pub use query_cmd::{run_analytics, run_query, run_secure};

pub use crate::config::DEFAULT_SOCKET_PATH;

/// Exit code when the server cannot be reached.
pub const EXIT_UNREACHABLE: i32 = 3;

/// Get socket path from environment or use default.
pub fn get_socket_path() -> String {
    crate::config::socket_path()
}

/// Report a transport failure the same way from every client command.
pub(crate) fn report_unreachable(err: &crate::ipc::ClientError) -> i32 {
    eprintln!("Error connecting to querygate server: {}", err);
    eprintln!("Is the server running? Check QUERYGATE_SOCKET_PATH.");
    EXIT_UNREACHABLE
}
