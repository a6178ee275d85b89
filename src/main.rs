//! querygate entry point.
//!
//! Bootstraps the caching gateway with:
//! - Configuration loading from `QUERYGATE_*` environment variables
//! - Structured logging
//! - IPC listener setup and the background expiry sweep
//! - Signal handling for graceful shutdown
//!
//! ## CLI Subcommands
//!
//! - `querygate` or `querygate serve` - Run IPC server (default)
//! - `querygate query <text>` - Send a cached query
//! - `querygate secure <user> <input>` - Send an admission-gated request
//! - `querygate analytics` - Show hit/miss analytics
//! - `querygate health|live|ready` - Health probes (exit 0/1)
//! - `querygate config show|defaults|validate` - Inspect configuration

use std::process::ExitCode;

use querygate::cli::{
    config_cmd, get_socket_path, run_analytics, run_health, run_liveness, run_query,
    run_readiness, run_secure,
};
use querygate::config::{self as qg_config, EnvConfig};
use querygate::ipc::server;
use querygate::shutdown::ShutdownResult;
use querygate::telemetry::init_logging;
use querygate::{spawn_maintenance, Runtime};

/// Exit code for configuration errors.
const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("serve");

    match command {
        "serve" | "" => {
            let env = qg_config::load();
            if let Err(e) = init_logging(&env.log) {
                eprintln!("Failed to initialize logging: {}", e);
                return ExitCode::from(EXIT_CONFIG);
            }
            match run_ipc_server(env).await {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("Server error: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        "query" => {
            let Some(text) = args.get(2) else {
                eprintln!("Missing query text");
                print_command_help("query");
                return ExitCode::FAILURE;
            };
            let user = flag_value(&args[3..], "--user");
            let code = run_query(&get_socket_path(), text, user).await;
            ExitCode::from(code as u8)
        }
        "secure" => {
            let (Some(user), Some(input)) = (args.get(2), args.get(3)) else {
                eprintln!("Usage: querygate secure <user> <input>");
                return ExitCode::FAILURE;
            };
            let code = run_secure(&get_socket_path(), user, input).await;
            ExitCode::from(code as u8)
        }
        "analytics" | "stats" => {
            let code = run_analytics(&get_socket_path()).await;
            ExitCode::from(code as u8)
        }
        "health" => {
            let code = run_health(&get_socket_path()).await;
            ExitCode::from(code as u8)
        }
        "live" | "liveness" => {
            let code = run_liveness(&get_socket_path()).await;
            ExitCode::from(code as u8)
        }
        "ready" | "readiness" => {
            let code = run_readiness(&get_socket_path()).await;
            ExitCode::from(code as u8)
        }
        "config" => {
            let subcommand = args.get(2).map(|s| s.as_str()).unwrap_or("show");
            match subcommand {
                "show" => {
                    config_cmd::run_show();
                    ExitCode::SUCCESS
                }
                "defaults" => {
                    config_cmd::run_defaults();
                    ExitCode::SUCCESS
                }
                "validate" => {
                    let code = config_cmd::run_validate();
                    ExitCode::from(code as u8)
                }
                _ => {
                    eprintln!("Unknown config subcommand: {}", subcommand);
                    print_command_help("config");
                    ExitCode::FAILURE
                }
            }
        }
        "help" | "--help" | "-h" => {
            if let Some(subcommand) = args.get(2) {
                print_command_help(subcommand);
            } else {
                print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("querygate {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            ExitCode::FAILURE
        }
    }
}

/// Value following `flag` in `args`, if present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

async fn run_ipc_server(env: EnvConfig) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = match env.runtime_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            eprintln!("Configuration error: {}", e);
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };
    let runtime = match Runtime::new(config) {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to compile rule table");
            eprintln!("Configuration error: {}", e);
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };

    let Runtime {
        config,
        gateway,
        connections,
        shutdown,
        ipc_handler,
    } = runtime;
    let handler = std::sync::Arc::new(ipc_handler);

    let maintenance_cancel = tokio_util::sync::CancellationToken::new();
    let maintenance_handle = spawn_maintenance(
        gateway,
        config.maintenance_interval,
        maintenance_cancel.clone(),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let server_handle = tokio::spawn(server::run_server(
        env.socket_path.clone(),
        handler,
        connections,
        shutdown_rx,
        config.ipc_server.clone(),
    ));

    // Wait for Ctrl+C, then initiate graceful shutdown
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, draining");

    // Signal the server loop to stop accepting
    let _ = shutdown_tx.send(true);

    match shutdown.initiate(config.shutdown_timeout).await {
        ShutdownResult::Complete => tracing::info!("shutdown complete"),
        ShutdownResult::Timeout { remaining } => {
            tracing::warn!(remaining, "shutdown timeout, requests still in flight");
        }
    }

    maintenance_cancel.cancel();
    let _ = maintenance_handle.await;

    if let Err(e) = server_handle.await? {
        tracing::error!(error = %e, "server error");
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "querygate - caching query gateway v{}

USAGE:
    querygate [COMMAND] [OPTIONS]

COMMANDS:
    serve        Run the IPC server (default when no command given)
    query        Send a query; repeated queries are answered from cache
    secure       Send input through the admission gate
    analytics    Show cache hit/miss analytics
    health       Full health check (exit 0 if healthy, 1 if unhealthy)
    live         Liveness probe (exit 0 if alive)
    ready        Readiness probe (exit 0 if ready)
    config       Inspect configuration (show, defaults, validate)
    version      Show version information
    help         Show this help message

EXAMPLES:
    querygate                              # Run IPC server (default)
    querygate query \"What is Rust?\"        # Cached query
    querygate query \"Hi\" --user alice      # Query through the admission gate
    querygate secure alice \"Hello there\"   # Admission-gated request
    querygate analytics                    # Hit rate and savings
    querygate config validate              # Check env and rule table

ENVIRONMENT:
    QUERYGATE_SOCKET_PATH  IPC socket path (default: {})
    QUERYGATE_RULES_PATH   TOML rule table (default: built-in rules)
    QUERYGATE_LOG_LEVEL    Log filter (default: info)
    See `querygate config defaults` for the full list.

EXIT CODES:
    0  Success / Healthy / Admitted
    1  Failure / Unhealthy / Rejected
    2  Configuration error
    3  Connection error
",
        version,
        qg_config::DEFAULT_SOCKET_PATH
    );
}

/// Print detailed help for a specific command.
fn print_command_help(command: &str) {
    match command {
        "serve" => eprintln!(
            "querygate serve - Run the IPC server

USAGE:
    querygate serve

DESCRIPTION:
    Listens on QUERYGATE_SOCKET_PATH for length-prefixed JSON frames.
    Expired answers and idle rate windows are swept every
    QUERYGATE_MAINTENANCE_INTERVAL seconds. Ctrl+C drains in-flight
    requests for up to QUERYGATE_SHUTDOWN_TIMEOUT seconds.
"
        ),
        "query" => eprintln!(
            "querygate query - Send a cached query

USAGE:
    querygate query <TEXT> [--user ID]

DESCRIPTION:
    Prints {{answer, cached, latency, cacheKey}}. With --user the query is
    rate limited and screened before the cache is consulted.
"
        ),
        "secure" => eprintln!(
            "querygate secure - Admission-gated request

USAGE:
    querygate secure <USER> <INPUT>

EXIT CODES:
    0  Admitted
    1  Rejected (malformed, rate limited or blocked)
    3  Connection error
"
        ),
        "health" | "live" | "liveness" | "ready" | "readiness" => eprintln!(
            "querygate health|live|ready - Health probes

DESCRIPTION:
    live   succeeds while the process answers IPC requests
    ready  succeeds while accepting work below the connection limit
    health prints the full report (cache size, callers, uptime)

EXIT CODES:
    0  Healthy
    1  Unhealthy
    3  Connection error
"
        ),
        "config" => eprintln!(
            "querygate config - Inspect configuration

USAGE:
    querygate config show       Effective values after env overrides
    querygate config defaults   Built-in defaults
    querygate config validate   Check env values and compile the rule table
"
        ),
        _ => {
            eprintln!("No detailed help for '{}'.", command);
            print_usage();
        }
    }
}
