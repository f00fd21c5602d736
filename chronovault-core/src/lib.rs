#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

//! Client core for the `ChronoVault` protocol.
//!
//! `ChronoVault` splits file protection into two independently verifiable
//! halves: an off-chain reconstruction service that encrypts and
//! content-addresses files, and an on-chain vault ledger that records
//! immutable metadata proving ownership and history. This crate implements
//! the client-side coordination protocol between the two: assembling and
//! disassembling the three-part artifact bundle (root hash, manifest,
//! encryption key), driving the upload → register and fetch → reconstruct
//! state machines, and keeping the local view of vault records consistent
//! with the soft-delete/share-capable ledger contract.
//!
//! The cryptographic engine, the ledger's execution semantics and the
//! wallet's key handling are external collaborators reached through the
//! [`ReconstructionClient`], [`LedgerContract`] and [`WalletProvider`]
//! seams.
//!
//! ```rust
//! use chronovault_core::SessionManager;
//!
//! # tokio_test::block_on(async {
//! // A session can exist without a wallet extension; connecting then
//! // reports `no_wallet_extension` instead of panicking.
//! let session = SessionManager::new(None);
//! assert!(session.connect().await.is_err());
//! # });
//! ```

use strum::EnumString;

/// Deployment environment a client instance is bound to. Selects the ledger
/// chain and the reconstruction-service host (see the defaults module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Development/staging deployment: Sepolia ledger, local service.
    Staging,
    /// Production deployment.
    Production,
}

mod bundle;
pub use bundle::*;

mod defaults;
pub use defaults::*;

mod error;
pub use error::*;

mod ledger;
pub use ledger::*;

mod reconstruction;
pub use reconstruction::*;

mod registry;
pub use registry::*;

mod retrieval;
pub use retrieval::*;

mod session;
pub use session::*;

mod upload;
pub use upload::*;

// private modules
mod http_request;
