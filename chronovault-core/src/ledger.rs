//! Collaborator seam for the on-chain vault ledger contract.
//!
//! The contract's execution semantics are out of scope; this module pins
//! down its call/return contract only. Reads return the raw record shape in
//! creation order, including soft-deleted entries — filtering and ordering
//! are the registry client's responsibility. Every write is split into two
//! confirmation phases: submission (the wallet has broadcast the signed
//! transaction) and finality (the network has confirmed it). The split is
//! part of the trait surface so callers cannot collapse the phases.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use crate::error::VaultError;

/// A vault record exactly as the ledger contract returns it, prior to
/// normalization into [`crate::VaultRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVaultRecord {
    /// Record id assigned by the contract.
    pub id: U256,
    /// Owning account.
    pub owner: Address,
    /// Name of the protected file.
    pub file_name: String,
    /// User-chosen category label.
    pub category: String,
    /// Hash of the original plaintext, or the missing-hash placeholder.
    pub original_hash: String,
    /// Merkle root of the encrypted chunk set.
    pub root_hash: String,
    /// Reference to the chunk manifest.
    pub manifest_ref: String,
    /// Registration time, unix seconds.
    pub timestamp: U256,
    /// Soft-delete flag; `false` once the record has been deleted.
    pub is_active: bool,
}

/// Fields recorded on the ledger when registering a new vault entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    /// Name of the protected file.
    pub file_name: String,
    /// User-chosen category label.
    pub category: String,
    /// Hash of the original plaintext, or the missing-hash placeholder.
    pub original_hash: String,
    /// Merkle root of the encrypted chunk set.
    pub root_hash: String,
    /// Reference to the chunk manifest.
    pub manifest_ref: String,
}

/// A ledger write whose transaction the wallet has broadcast but the
/// network has not yet finalized.
#[async_trait]
pub trait PendingWrite: Send {
    /// Resolves once the network has finalized the transaction.
    ///
    /// # Errors
    /// Fails if the transaction is dropped or reverts.
    async fn confirmed(self: Box<Self>) -> Result<(), VaultError>;
}

/// Call/return contract of the vault ledger.
///
/// Write submissions drive the wallet's signing prompt; implementations map
/// a declined signature to [`VaultError::UserRejected`] and other
/// submission failures to [`VaultError::RegistrationFailed`].
#[async_trait]
pub trait LedgerContract: Send + Sync {
    /// Returns every record owned by (or shared with) `owner`, in creation
    /// order, regardless of the active flag.
    async fn query_owned_records(
        &self,
        owner: Address,
    ) -> Result<Vec<RawVaultRecord>, VaultError>;

    /// Broadcasts a register-record transaction.
    async fn submit_register(
        &self,
        request: RegisterRequest,
    ) -> Result<Box<dyn PendingWrite>, VaultError>;

    /// Broadcasts a soft-delete transaction for the record `id`. The record
    /// keeps its historical trace; only the active flag flips.
    async fn submit_soft_delete(&self, id: U256) -> Result<Box<dyn PendingWrite>, VaultError>;

    /// Broadcasts a share transaction granting `recipient` read access to
    /// the record `id`. Neither the owner nor the active flag changes.
    async fn submit_share(
        &self,
        id: U256,
        recipient: Address,
    ) -> Result<Box<dyn PendingWrite>, VaultError>;
}
