//! Wallet session management.
//!
//! The session manager owns the process-wide view of the connected identity
//! and selected chain. It is the only component that talks to the identity
//! wallet, through the [`WalletProvider`] seam, and every component that
//! needs identity or chain information receives the same shared session
//! instance rather than reading ambient global state. Observers follow
//! changes through a watch channel; the wallet's own account/chain change
//! events are fed back in through the `handle_*` entry points.

use std::{fmt, sync::Arc};

use alloy_primitives::Address;
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::VaultError;

/// The user's wallet-derived account, used to own vault records and sign
/// ledger transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity(Address);

impl Identity {
    /// Wraps a raw account address.
    #[must_use]
    pub const fn new(address: Address) -> Self {
        Self(address)
    }

    /// Parses an identity from its `0x`-prefixed hex form.
    ///
    /// # Errors
    /// Returns [`VaultError::InvalidInput`] if the string is not a valid
    /// account address.
    pub fn parse(value: &str) -> Result<Self, VaultError> {
        value
            .trim()
            .parse::<Address>()
            .map(Self)
            .map_err(|err| VaultError::InvalidInput {
                attribute: "identity".to_string(),
                reason: err.to_string(),
            })
    }

    /// The underlying account address.
    #[must_use]
    pub const fn address(self) -> Address {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a ledger network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl ChainId {
    /// The Sepolia test network.
    pub const SEPOLIA: Self = Self(11_155_111);
    /// Ethereum mainnet.
    pub const MAINNET: Self = Self(1);

    /// The `0x…` form used in wallet switch-chain requests.
    #[must_use]
    pub fn to_hex_string(self) -> String {
        format!("{:#x}", self.0)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of the wallet session: who is connected, on which chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Connected identity, if any.
    pub identity: Option<Identity>,
    /// Chain the wallet is currently on, if known.
    pub chain_id: Option<ChainId>,
}

/// Interface to the user's identity wallet (typically a browser extension).
///
/// Key storage and signing stay inside the wallet; the client only ever sees
/// account addresses and approval outcomes. Implementations map the wallet's
/// own failure modes onto the crate's error taxonomy: a declined prompt is
/// [`VaultError::UserRejected`], a declined or failed chain switch is
/// [`VaultError::NetworkSwitchFailed`].
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Requests account access, prompting the user if necessary.
    async fn request_accounts(&self) -> Result<Vec<Identity>, VaultError>;

    /// Non-interactive probe of already-authorized accounts. Never prompts.
    async fn accounts(&self) -> Result<Vec<Identity>, VaultError>;

    /// Asks the wallet to switch to `chain`.
    async fn switch_chain(&self, chain: ChainId) -> Result<(), VaultError>;
}

/// Owns wallet-connection and chain-selection state.
pub struct SessionManager {
    wallet: Option<Arc<dyn WalletProvider>>,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    /// Creates a session around the given wallet. `None` models a missing
    /// wallet extension: the session still works, but every interactive
    /// operation reports [`VaultError::NoWalletExtension`].
    #[must_use]
    pub fn new(wallet: Option<Arc<dyn WalletProvider>>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self { wallet, state }
    }

    fn wallet(&self) -> Result<&Arc<dyn WalletProvider>, VaultError> {
        self.wallet.as_ref().ok_or(VaultError::NoWalletExtension)
    }

    /// Requests account access from the wallet and records the connected
    /// identity.
    ///
    /// # Errors
    /// [`VaultError::NoWalletExtension`] if no wallet is present,
    /// [`VaultError::UserRejected`] if the user declines or the wallet
    /// grants no accounts.
    pub async fn connect(&self) -> Result<Identity, VaultError> {
        let wallet = self.wallet()?;
        let accounts = wallet.request_accounts().await?;
        let identity = accounts
            .first()
            .copied()
            .ok_or(VaultError::UserRejected)?;
        self.state.send_modify(|state| state.identity = Some(identity));
        info!(%identity, "wallet connected");
        Ok(identity)
    }

    /// Restores a previously granted connection without prompting. Returns
    /// `None` when no wallet is installed or nothing was granted.
    ///
    /// # Errors
    /// Propagates wallet probe failures.
    pub async fn restore(&self) -> Result<Option<Identity>, VaultError> {
        let Some(wallet) = self.wallet.as_ref() else {
            return Ok(None);
        };
        let identity = wallet.accounts().await?.first().copied();
        self.state.send_modify(|state| state.identity = identity);
        Ok(identity)
    }

    /// The currently connected identity, if any. Non-interactive.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.state.borrow().identity
    }

    /// The chain the wallet is known to be on, if any.
    #[must_use]
    pub fn chain_id(&self) -> Option<ChainId> {
        self.state.borrow().chain_id
    }

    /// Makes sure the wallet is on `chain`, asking it to switch if needed.
    /// A no-op when the session already knows it is on the right chain.
    ///
    /// # Errors
    /// [`VaultError::NoWalletExtension`] if no wallet is present,
    /// [`VaultError::NetworkSwitchFailed`] if the user declines or the
    /// wallet errors.
    pub async fn ensure_network(&self, chain: ChainId) -> Result<(), VaultError> {
        if self.chain_id() == Some(chain) {
            return Ok(());
        }
        let wallet = self.wallet()?;
        wallet.switch_chain(chain).await?;
        self.state.send_modify(|state| state.chain_id = Some(chain));
        debug!(%chain, "network switched");
        Ok(())
    }

    /// Synchronous gate used before ledger writes: the session must already
    /// be on `chain`, i.e. [`Self::ensure_network`] must have succeeded.
    ///
    /// # Errors
    /// [`VaultError::NetworkSwitchFailed`] naming the expected and actual
    /// chains.
    pub fn require_network(&self, chain: ChainId) -> Result<(), VaultError> {
        if self.chain_id() == Some(chain) {
            Ok(())
        } else {
            let connected = self
                .chain_id()
                .map_or_else(|| "no chain".to_string(), |id| id.to_string());
            Err(VaultError::NetworkSwitchFailed {
                reason: format!("ledger writes require chain {chain}, session is on {connected}"),
            })
        }
    }

    /// Entry point for the wallet's accounts-changed event. An empty list
    /// means the user disconnected.
    pub fn handle_accounts_changed(&self, accounts: &[Identity]) {
        let identity = accounts.first().copied();
        self.state.send_modify(|state| state.identity = identity);
        debug!(connected = identity.is_some(), "accounts changed");
    }

    /// Entry point for the wallet's chain-changed event.
    pub fn handle_chain_changed(&self, chain: ChainId) {
        self.state.send_modify(|state| state.chain_id = Some(chain));
        debug!(%chain, "chain changed");
    }

    /// Subscribes to session-state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}
