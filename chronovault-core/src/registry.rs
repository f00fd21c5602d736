//! Ledger registry client.
//!
//! Wraps the vault ledger contract behind the crate's typed entities. Raw
//! records are normalized the moment they cross the boundary; downstream
//! code never sees the contract's own shapes. Reads rebuild the local view
//! from scratch on every fetch. Writes go through the two-phase
//! [`SubmittedWrite`] handle and nothing is ever reflected locally before
//! the ledger has confirmed it — a delete is observed only through the
//! re-fetch that follows confirmation.

use std::{fmt, sync::Arc};

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    defaults::MISSING_ORIGINAL_HASH,
    error::VaultError,
    ledger::{LedgerContract, PendingWrite, RawVaultRecord, RegisterRequest},
    session::{ChainId, Identity, SessionManager},
};

/// Identifier of a vault record, assigned by the ledger contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(U256);

impl RecordId {
    /// Wraps a raw contract-assigned id.
    #[must_use]
    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    /// The raw id value.
    #[must_use]
    pub const fn value(self) -> U256 {
        self.0
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An on-ledger metadata entry describing a registered artifact.
///
/// Local copies are owned by the registry client's cache and rebuilt on
/// every fetch; they are never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultRecord {
    /// Record id.
    pub id: RecordId,
    /// Owning identity.
    pub owner: Identity,
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
    /// Registration time.
    pub timestamp: DateTime<Utc>,
    /// Soft-delete flag.
    pub is_active: bool,
}

impl VaultRecord {
    /// Normalizes a raw contract record into the typed entity.
    #[must_use]
    pub fn from_raw(raw: RawVaultRecord) -> Self {
        Self {
            id: RecordId::new(raw.id),
            owner: Identity::new(raw.owner),
            file_name: raw.file_name,
            category: raw.category,
            original_hash: raw.original_hash,
            root_hash: raw.root_hash,
            manifest_ref: raw.manifest_ref,
            timestamp: timestamp_from_seconds(raw.timestamp),
            is_active: raw.is_active,
        }
    }

    /// The expected original hash for integrity comparison, if one was
    /// actually recorded. The missing-hash placeholder counts as absent.
    #[must_use]
    pub fn expected_hash(&self) -> Option<&str> {
        match self.original_hash.as_str() {
            "" | MISSING_ORIGINAL_HASH => None,
            other => Some(other),
        }
    }
}

fn timestamp_from_seconds(value: U256) -> DateTime<Utc> {
    let seconds = u64::try_from(value)
        .ok()
        .and_then(|secs| i64::try_from(secs).ok())
        .unwrap_or(i64::MAX);
    DateTime::from_timestamp(seconds, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// A ledger write after phase 1 (the wallet has broadcast the signed
/// transaction). Phase 2 is [`Self::confirmed`]; user-visible success must
/// wait for it.
#[must_use = "a submitted write is not final until `confirmed` resolves"]
pub struct SubmittedWrite {
    pending: Box<dyn PendingWrite>,
}

impl std::fmt::Debug for SubmittedWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmittedWrite").finish_non_exhaustive()
    }
}

impl SubmittedWrite {
    fn new(pending: Box<dyn PendingWrite>) -> Self {
        Self { pending }
    }

    /// Waits for the ledger network to finalize the write.
    ///
    /// # Errors
    /// [`VaultError::RegistrationFailed`] if the transaction is dropped or
    /// reverts.
    pub async fn confirmed(self) -> Result<(), VaultError> {
        self.pending.confirmed().await.map_err(write_failure)?;
        debug!("ledger write confirmed");
        Ok(())
    }
}

/// Collapses write-path failures into the registration-failure class while
/// preserving the originating cause text.
fn write_failure(err: VaultError) -> VaultError {
    match err {
        err @ VaultError::RegistrationFailed { .. } => err,
        other => VaultError::RegistrationFailed {
            reason: other.to_string(),
        },
    }
}

/// Client for the vault ledger, bound to one target chain.
pub struct RegistryClient {
    contract: Arc<dyn LedgerContract>,
    session: Arc<SessionManager>,
    chain: ChainId,
    cache: Mutex<Vec<VaultRecord>>,
}

impl RegistryClient {
    /// Creates a registry client over `contract`, gated on `session` being
    /// connected to `chain` for writes.
    #[must_use]
    pub fn new(
        contract: Arc<dyn LedgerContract>,
        session: Arc<SessionManager>,
        chain: ChainId,
    ) -> Self {
        Self {
            contract,
            session,
            chain,
            cache: Mutex::new(Vec::new()),
        }
    }

    /// The chain this client writes to.
    #[must_use]
    pub const fn chain(&self) -> ChainId {
        self.chain
    }

    /// Fetches the active records owned by `owner`, most recent first.
    ///
    /// The contract returns records in creation order including
    /// soft-deleted ones; this applies the active filter, reverses the
    /// order and replaces the cached view.
    ///
    /// # Errors
    /// Propagates contract read failures.
    pub async fn list_owned_records(
        &self,
        owner: Identity,
    ) -> Result<Vec<VaultRecord>, VaultError> {
        let raw = self.contract.query_owned_records(owner.address()).await?;
        let total = raw.len();

        let mut records: Vec<VaultRecord> = raw
            .into_iter()
            .map(VaultRecord::from_raw)
            .filter(|record| record.is_active)
            .collect();
        records.reverse();

        debug!(%owner, total, active = records.len(), "fetched vault records");
        *self.cache.lock().await = records.clone();
        Ok(records)
    }

    /// The records returned by the most recent successful fetch.
    pub async fn cached_records(&self) -> Vec<VaultRecord> {
        self.cache.lock().await.clone()
    }

    /// Submits a register-record write. Phase 1 of 2; await
    /// [`SubmittedWrite::confirmed`] before reporting success.
    ///
    /// # Errors
    /// [`VaultError::NetworkSwitchFailed`] if the session is not on the
    /// target chain, [`VaultError::RegistrationFailed`] if the wallet
    /// rejects signing or the submission errors.
    pub async fn register_record(
        &self,
        request: RegisterRequest,
    ) -> Result<SubmittedWrite, VaultError> {
        self.session.require_network(self.chain)?;
        info!(file_name = %request.file_name, category = %request.category, "registering vault record");
        let pending = self
            .contract
            .submit_register(request)
            .await
            .map_err(write_failure)?;
        Ok(SubmittedWrite::new(pending))
    }

    /// Submits a soft-delete write for `id`. The local view is not touched;
    /// callers re-fetch after confirmation.
    ///
    /// # Errors
    /// Same failure classes as [`Self::register_record`].
    pub async fn soft_delete_record(&self, id: RecordId) -> Result<SubmittedWrite, VaultError> {
        self.session.require_network(self.chain)?;
        info!(%id, "soft-deleting vault record");
        let pending = self
            .contract
            .submit_soft_delete(id.value())
            .await
            .map_err(write_failure)?;
        Ok(SubmittedWrite::new(pending))
    }

    /// Submits a share write granting `recipient` access to `id`. Does not
    /// change the record's owner or active flag.
    ///
    /// # Errors
    /// Same failure classes as [`Self::register_record`].
    pub async fn share_record(
        &self,
        id: RecordId,
        recipient: Identity,
    ) -> Result<SubmittedWrite, VaultError> {
        self.session.require_network(self.chain)?;
        info!(%id, %recipient, "sharing vault record");
        let pending = self
            .contract
            .submit_share(id.value(), recipient.address())
            .await
            .map_err(write_failure)?;
        Ok(SubmittedWrite::new(pending))
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, Address};
    use async_trait::async_trait;

    use super::*;

    const OWNER: Address = address!("0x551Df3762c81604EAfFb4A82A7d0ff9F71CFF5bF");

    fn raw_record(id: u64, file_name: &str, is_active: bool) -> RawVaultRecord {
        RawVaultRecord {
            id: U256::from(id),
            owner: OWNER,
            file_name: file_name.to_string(),
            category: "Personal".to_string(),
            original_hash: "a1b2c3".to_string(),
            root_hash: "deadbeef".to_string(),
            manifest_ref: "PENDING_MANIFEST_CID".to_string(),
            timestamp: U256::from(1_700_000_000u64 + id),
            is_active,
        }
    }

    struct NoopPending;

    #[async_trait]
    impl PendingWrite for NoopPending {
        async fn confirmed(self: Box<Self>) -> Result<(), VaultError> {
            Ok(())
        }
    }

    struct FakeContract {
        records: Vec<RawVaultRecord>,
        reject_writes: bool,
    }

    #[async_trait]
    impl LedgerContract for FakeContract {
        async fn query_owned_records(
            &self,
            _owner: Address,
        ) -> Result<Vec<RawVaultRecord>, VaultError> {
            Ok(self.records.clone())
        }

        async fn submit_register(
            &self,
            _request: RegisterRequest,
        ) -> Result<Box<dyn PendingWrite>, VaultError> {
            if self.reject_writes {
                return Err(VaultError::UserRejected);
            }
            Ok(Box::new(NoopPending))
        }

        async fn submit_soft_delete(
            &self,
            _id: U256,
        ) -> Result<Box<dyn PendingWrite>, VaultError> {
            if self.reject_writes {
                return Err(VaultError::UserRejected);
            }
            Ok(Box::new(NoopPending))
        }

        async fn submit_share(
            &self,
            _id: U256,
            _recipient: Address,
        ) -> Result<Box<dyn PendingWrite>, VaultError> {
            if self.reject_writes {
                return Err(VaultError::UserRejected);
            }
            Ok(Box::new(NoopPending))
        }
    }

    fn client_with(records: Vec<RawVaultRecord>, reject_writes: bool) -> RegistryClient {
        let session = Arc::new(SessionManager::new(None));
        session.handle_chain_changed(ChainId::SEPOLIA);
        RegistryClient::new(
            Arc::new(FakeContract {
                records,
                reject_writes,
            }),
            session,
            ChainId::SEPOLIA,
        )
    }

    #[tokio::test]
    async fn test_list_filters_inactive_and_reverses() {
        let client = client_with(
            vec![
                raw_record(1, "first.txt", true),
                raw_record(2, "second.txt", false),
                raw_record(3, "third.txt", true),
            ],
            false,
        );

        let records = client
            .list_owned_records(Identity::new(OWNER))
            .await
            .unwrap();

        let names: Vec<&str> = records.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["third.txt", "first.txt"]);
        assert!(records.iter().all(|r| r.is_active));
        assert_eq!(client.cached_records().await, records);
    }

    #[tokio::test]
    async fn test_writes_require_target_network() {
        let session = Arc::new(SessionManager::new(None));
        let client = RegistryClient::new(
            Arc::new(FakeContract {
                records: vec![],
                reject_writes: false,
            }),
            session,
            ChainId::SEPOLIA,
        );

        let err = client
            .soft_delete_record(RecordId::from(1))
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::NetworkSwitchFailed { .. }));
    }

    #[tokio::test]
    async fn test_rejected_signature_maps_to_registration_failed() {
        let client = client_with(vec![raw_record(1, "first.txt", true)], true);

        let err = client
            .share_record(RecordId::from(1), Identity::new(OWNER))
            .await
            .unwrap_err();

        match err {
            VaultError::RegistrationFailed { reason } => {
                assert!(reason.contains("user_rejected"));
            }
            other => panic!("expected RegistrationFailed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_write_confirms_through_both_phases() {
        let client = client_with(vec![], false);

        let submitted = client
            .register_record(RegisterRequest {
                file_name: "notes.txt".to_string(),
                category: "Personal".to_string(),
                original_hash: "a1b2c3".to_string(),
                root_hash: "deadbeef".to_string(),
                manifest_ref: "PENDING_MANIFEST_CID".to_string(),
            })
            .await
            .unwrap();

        submitted.confirmed().await.unwrap();
    }

    #[test]
    fn test_expected_hash_filters_placeholder() {
        let mut record = VaultRecord::from_raw(raw_record(1, "first.txt", true));
        assert_eq!(record.expected_hash(), Some("a1b2c3"));

        record.original_hash = MISSING_ORIGINAL_HASH.to_string();
        assert_eq!(record.expected_hash(), None);

        record.original_hash = String::new();
        assert_eq!(record.expected_hash(), None);
    }

    #[test]
    fn test_record_id_display_is_decimal() {
        assert_eq!(RecordId::from(42).to_string(), "42");
    }

    #[test]
    fn test_timestamp_normalization() {
        let record = VaultRecord::from_raw(raw_record(1, "first.txt", true));
        assert_eq!(record.timestamp.timestamp(), 1_700_000_001);
    }
}
