//! # CLI Interface
//!
//! Defines the command-line argument structure for `mgov-node` using
//! `clap` derive. Supports four subcommands: `run`, `replay`, `keygen`,
//! and `version`.

use clap::{Parser, Subcommand};
use mgov_protocol::Address;
use std::path::PathBuf;

/// First dev account of the default local network; owns the token unless
/// `--owner` says otherwise.
pub const DEFAULT_OWNER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

/// MGov voting-power ledger dev node.
///
/// Hosts a single governance token on a local block producer and serves a
/// JSON-RPC + REST API for submitting transactions and querying voting
/// history.
#[derive(Parser, Debug)]
#[command(
    name = "mgov-node",
    about = "MGov voting-power ledger dev node",
    version,
    propagate_version = true
)]
pub struct MgovNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node and serve the API.
    Run(RunArgs),
    /// Execute a scenario file against a fresh chain and check its expectations.
    Replay(ReplayArgs),
    /// Generate a secp256k1 keypair for signing delegations.
    Keygen(KeygenArgs),
    /// Print version information and exit.
    Version,
}

/// Options shared by every subcommand that builds a chain.
#[derive(Parser, Debug, Clone)]
pub struct ChainArgs {
    /// Path to a ledger configuration file (JSON).
    ///
    /// Missing fields fall back to their defaults.
    #[arg(long, short = 'c', env = "MGOV_CONFIG")]
    pub config: Option<PathBuf>,

    /// Overrides the chain id bound into the signing domain.
    #[arg(long, env = "MGOV_CHAIN_ID")]
    pub chain_id: Option<u64>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "MGOV_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub chain: ChainArgs,

    /// Address that owns the token (may mint and burn).
    #[arg(long, env = "MGOV_OWNER", default_value = DEFAULT_OWNER)]
    pub owner: Address,

    /// Port for the JSON-RPC and REST API.
    #[arg(long, env = "MGOV_RPC_PORT", default_value_t = 8545)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "MGOV_METRICS_PORT", default_value_t = 9615)]
    pub metrics_port: u16,

    /// Start with automine disabled; transactions wait for `mgov_mine`.
    #[arg(long)]
    pub no_automine: bool,

    /// Also mine a block every this many milliseconds.
    #[arg(long, env = "MGOV_INTERVAL_MINING_MS")]
    pub interval_mining_ms: Option<u64>,
}

/// Arguments for the `replay` subcommand.
#[derive(Parser, Debug)]
pub struct ReplayArgs {
    /// Scenario file (JSON).
    pub scenario: PathBuf,

    #[command(flatten)]
    pub chain: ChainArgs,
}

/// Arguments for the `keygen` subcommand.
#[derive(Parser, Debug)]
pub struct KeygenArgs {
    /// Write the hex secret key to this file instead of stdout.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        MgovNodeCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = MgovNodeCli::try_parse_from(["mgov-node", "run"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.owner, DEFAULT_OWNER.parse::<Address>().unwrap());
                assert_eq!(args.rpc_port, 8545);
                assert!(!args.no_automine);
                assert_eq!(args.chain.log_format, "pretty");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn replay_takes_a_path() {
        let cli =
            MgovNodeCli::try_parse_from(["mgov-node", "replay", "s.json", "--chain-id", "5"])
                .unwrap();
        match cli.command {
            Commands::Replay(args) => {
                assert_eq!(args.scenario, PathBuf::from("s.json"));
                assert_eq!(args.chain.chain_id, Some(5));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_owner() {
        assert!(MgovNodeCli::try_parse_from(["mgov-node", "run", "--owner", "0x12"]).is_err());
    }
}
