//! # Node Logging
//!
//! One `tracing` subscriber per process, with a filter chosen by subcommand.
//! `run` logs requests and rejected signed delegations (per-checkpoint detail
//! needs `RUST_LOG`). `replay` and `keygen` keep the ledger quiet and print
//! their results to stdout.
//!
//! Logs always go to stderr. `replay` output is a JSON report meant to be
//! piped into `jq` or diffed in CI, and `keygen` prints a secret, so neither
//! may be interleaved with log lines.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter for `run` when `RUST_LOG` is unset. Ledger commits log at debug,
/// so this shows requests and warnings but not per-checkpoint detail.
pub const DEFAULT_FILTER: &str = "mgov_node=info,mgov_contracts=info,mgov_protocol=info,tower_http=info";

/// Filter for `replay`: step failures surface through the report, so the
/// ledger only speaks up for warnings.
pub const REPLAY_FILTER: &str = "mgov_node=info,mgov_contracts=warn";

/// Filter for `keygen`.
pub const KEYGEN_FILTER: &str = "mgov_node=info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, colored output. Suitable for local development.
    Pretty,
    /// Machine-parseable JSON lines.
    Json,
}

impl LogFormat {
    /// Parse a format string. Accepts "json" or "pretty" (case-insensitive).
    /// Returns `Pretty` for any unrecognized value.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Installs the global subscriber writing to stderr.
///
/// Call once, before the chain is built: `GovToken` logs from its first
/// commit. A second call panics.
///
/// `RUST_LOG` replaces `default_filter` entirely when set, e.g. to trace
/// checkpoint writes while replaying a scenario:
///
/// ```text
/// RUST_LOG=mgov_contracts=trace mgov-node replay scenarios/delegation_suite.json
/// ```
pub fn init_logging(default_filter: &str, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
                .init();
        }
    }

    tracing::debug!("logging initialized (format={:?})", format);
}
