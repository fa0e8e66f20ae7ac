//! # Ledger Configuration & Constants
//!
//! Every magic number of the voting-power ledger lives here: token metadata,
//! the EIP-712 type strings that make up the signed-delegation digest, and the
//! revert messages callers branch on.
//!
//! [`LedgerConfig`] carries the values that differ between deployments (chain
//! id, contract address, block cadence of the development chain) and is loaded
//! from JSON by the node.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::types::Address;

// ---------------------------------------------------------------------------
// Token Metadata
// ---------------------------------------------------------------------------

/// Token name. Also the `name` field of the EIP-712 signing domain, so
/// changing it invalidates every outstanding signed delegation.
pub const TOKEN_NAME: &str = "MockGovToken";

/// Ticker symbol, and the prefix of every ledger revert message.
pub const TOKEN_SYMBOL: &str = "MGToken";

/// Decimal places. One whole token is `10^18` base units.
pub const TOKEN_DECIMALS: u8 = 18;

/// One whole token in base units.
pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

// ---------------------------------------------------------------------------
// Chain Parameters
// ---------------------------------------------------------------------------

/// Chain id of the local development network.
pub const DEFAULT_CHAIN_ID: u64 = 31_337;

/// Address the ledger is "deployed" at on the development chain; the
/// `verifyingContract` of the signing domain.
pub const DEFAULT_VERIFYING_CONTRACT: Address = Address::new([
    0x5f, 0xbd, 0xb2, 0x31, 0x56, 0x78, 0xaf, 0xec, 0xb3, 0x67, 0xf0, 0x32, 0xd9, 0x3f, 0x64, 0x2f,
    0x64, 0x18, 0x0a, 0xa3,
]);

/// Timestamp of block 0 on the development chain (2026-01-01T00:00:00Z).
pub const DEFAULT_GENESIS_TIMESTAMP: u64 = 1_767_225_600;

/// Seconds between consecutive development-chain blocks.
pub const DEFAULT_BLOCK_INTERVAL_SECS: u64 = 1;

// ---------------------------------------------------------------------------
// EIP-712
// ---------------------------------------------------------------------------

/// Type string of the signing domain. Note: no `version` field.
pub const DOMAIN_TYPE: &str = "EIP712Domain(string name,uint256 chainId,address verifyingContract)";

/// Type string of the signed delegation payload.
pub const DELEGATION_TYPE: &str = "Delegation(address delegatee,uint256 nonce,uint256 expiry)";

// ---------------------------------------------------------------------------
// Revert Messages
// ---------------------------------------------------------------------------

pub const ERR_PRIOR_VOTES_NOT_DETERMINED: &str = "MGToken::getPriorVotes: not yet determined";
pub const ERR_INVALID_SIGNATURE: &str = "MGToken::delegateBySig: invalid signature";
pub const ERR_INVALID_NONCE: &str = "MGToken::delegateBySig: invalid nonce";
pub const ERR_SIGNATURE_EXPIRED: &str = "MGToken::delegateBySig: signature expired";
pub const ERR_NOT_OWNER: &str = "Ownable: caller is not the owner";

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating a [`LedgerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Deployment parameters of a ledger instance.
///
/// Every field has a default, so a config file only needs to name what it
/// overrides:
///
/// ```json
/// { "chain_id": 1337, "block_interval_secs": 12 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Token name; part of the signing domain.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Decimal places reported to clients.
    pub decimals: u8,
    /// Chain id bound into the signing domain.
    pub chain_id: u64,
    /// Contract address bound into the signing domain.
    pub verifying_contract: Address,
    /// Timestamp of the genesis block.
    pub genesis_timestamp: u64,
    /// Seconds added to the timestamp for every mined block.
    pub block_interval_secs: u64,
    /// Whether re-delegating to the already-current delegatee still emits a
    /// `DelegateChanged` event. Votes are unaffected either way.
    pub emit_redundant_delegate_events: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            name: TOKEN_NAME.to_string(),
            symbol: TOKEN_SYMBOL.to_string(),
            decimals: TOKEN_DECIMALS,
            chain_id: DEFAULT_CHAIN_ID,
            verifying_contract: DEFAULT_VERIFYING_CONTRACT,
            genesis_timestamp: DEFAULT_GENESIS_TIMESTAMP,
            block_interval_secs: DEFAULT_BLOCK_INTERVAL_SECS,
            emit_redundant_delegate_events: true,
        }
    }
}

impl LedgerConfig {
    /// Loads a config from a JSON file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: LedgerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::debug!(
            path = %path.as_ref().display(),
            chain_id = config.chain_id,
            "ledger config loaded"
        );
        Ok(config)
    }

    /// Rejects configurations the ledger cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Invalid("name must not be empty".into()));
        }
        if self.symbol.is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".into()));
        }
        if self.chain_id == 0 {
            return Err(ConfigError::Invalid("chain_id must be non-zero".into()));
        }
        if self.verifying_contract.is_zero() {
            return Err(ConfigError::Invalid(
                "verifying_contract must not be the zero address".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = LedgerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.name, "MockGovToken");
        assert_eq!(config.chain_id, 31_337);
        assert!(config.emit_redundant_delegate_events);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: LedgerConfig =
            serde_json::from_str(r#"{ "chain_id": 1337, "block_interval_secs": 12 }"#).unwrap();
        assert_eq!(config.chain_id, 1337);
        assert_eq!(config.block_interval_secs, 12);
        assert_eq!(config.symbol, TOKEN_SYMBOL);
    }

    #[test]
    fn zero_chain_id_rejected() {
        let config = LedgerConfig {
            chain_id: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "name": "Other", "emit_redundant_delegate_events": false }}"#).unwrap();
        let config = LedgerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.name, "Other");
        assert!(!config.emit_redundant_delegate_events);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = LedgerConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn one_token_matches_decimals() {
        assert_eq!(ONE_TOKEN, 10u128.pow(TOKEN_DECIMALS as u32));
    }
}
