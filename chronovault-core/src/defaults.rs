//! Deployment constants and per-environment defaults.

use alloy_primitives::{address, Address};

use crate::{session::ChainId, Environment};

/// On-chain address of the vault ledger contract.
pub static VAULT_LEDGER_ADDRESS: Address =
    address!("0x551Df3762c81604EAfFb4A82A7d0ff9F71CFF5bF");

/// Manifest reference recorded at registration time. The manifest body is
/// never stored on-chain; the record carries this placeholder until a
/// content-addressed manifest reference exists.
pub const PENDING_MANIFEST_REF: &str = "PENDING_MANIFEST_CID";

/// Placeholder written to the ledger's original-hash field when the
/// reconstruction service supplied no hash.
pub const MISSING_ORIGINAL_HASH: &str = "N/A";

impl Environment {
    /// Chain the vault ledger lives on in this environment.
    #[must_use]
    pub const fn chain_id(self) -> ChainId {
        match self {
            Self::Staging => ChainId::SEPOLIA,
            Self::Production => ChainId::MAINNET,
        }
    }

    /// Base URL of the reconstruction service for this environment.
    #[must_use]
    pub const fn reconstruction_host(self) -> &'static str {
        match self {
            Self::Staging => "http://127.0.0.1:8080",
            Self::Production => "https://reconstruct.chronovault.app",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults() {
        assert_eq!(Environment::Staging.chain_id(), ChainId::SEPOLIA);
        assert_eq!(Environment::Production.chain_id(), ChainId::MAINNET);
        assert!(Environment::Staging
            .reconstruction_host()
            .starts_with("http://127.0.0.1"));
    }

    #[test]
    fn test_environment_from_string() {
        assert_eq!("staging".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
    }
}
