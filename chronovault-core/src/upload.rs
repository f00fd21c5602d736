//! Upload orchestration.
//!
//! Drives the submit-file → register-on-ledger sequence: the file goes to
//! the reconstruction service, and if an identity is connected the
//! resulting artifact metadata is registered on the vault ledger, network
//! switch strictly before signature, signature strictly before the
//! confirmation wait. A missing identity is a soft condition: the upload
//! still succeeds, locally only, with a warning. A ledger failure after the
//! service produced a bundle never discards the bundle — it stays available
//! for manual export.
//!
//! Each `run` call owns its bundle-in-progress; concurrent uploads use
//! separate orchestrator instances.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::{
    bundle::ArtifactBundle,
    defaults::{MISSING_ORIGINAL_HASH, PENDING_MANIFEST_REF},
    error::VaultError,
    ledger::RegisterRequest,
    reconstruction::ReconstructionClient,
    registry::RegistryClient,
    session::SessionManager,
};

/// Warning attached to an upload that succeeded without a connected
/// identity.
pub const NOT_REGISTERED_WARNING: &str =
    "no identity connected; artifacts were generated locally but not secured on-chain";

/// Observable step of an upload operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    /// No operation started yet.
    Idle,
    /// The file is at the reconstruction service.
    Encrypting,
    /// Waiting for the wallet to switch to the ledger chain.
    AwaitingNetworkSwitch,
    /// Waiting for the user to approve the registration transaction.
    AwaitingSignature,
    /// Transaction broadcast; waiting for ledger finality.
    AwaitingConfirmation,
    /// The operation finished.
    Success,
    /// The operation failed; the error is carried by the `run` result.
    Failed,
}

/// Successful outcome of an upload operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The artifact metadata was registered on the ledger and confirmed.
    Registered {
        /// The bundle produced by the reconstruction service.
        bundle: ArtifactBundle,
    },
    /// No identity was connected; nothing was written on-chain.
    LocalOnly {
        /// The bundle produced by the reconstruction service.
        bundle: ArtifactBundle,
    },
}

impl UploadOutcome {
    /// The bundle produced by the operation.
    #[must_use]
    pub const fn bundle(&self) -> &ArtifactBundle {
        match self {
            Self::Registered { bundle } | Self::LocalOnly { bundle } => bundle,
        }
    }

    /// A user-facing warning, present when the artifact was not secured
    /// on-chain.
    #[must_use]
    pub const fn warning(&self) -> Option<&'static str> {
        match self {
            Self::Registered { .. } => None,
            Self::LocalOnly { .. } => Some(NOT_REGISTERED_WARNING),
        }
    }
}

/// A failed upload operation. When the reconstruction service had already
/// produced a bundle, it is preserved here for manual export.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct UploadFailure {
    /// The originating error.
    #[source]
    pub error: VaultError,
    /// Bundle produced before the failure, if any.
    pub bundle: Option<ArtifactBundle>,
}

/// Sequences one upload operation end to end.
pub struct UploadOrchestrator {
    reconstruction: Arc<ReconstructionClient>,
    registry: Arc<RegistryClient>,
    session: Arc<SessionManager>,
    phase: watch::Sender<UploadPhase>,
}

impl UploadOrchestrator {
    /// Creates an orchestrator over the shared clients and session.
    #[must_use]
    pub fn new(
        reconstruction: Arc<ReconstructionClient>,
        registry: Arc<RegistryClient>,
        session: Arc<SessionManager>,
    ) -> Self {
        let (phase, _) = watch::channel(UploadPhase::Idle);
        Self {
            reconstruction,
            registry,
            session,
            phase,
        }
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> UploadPhase {
        *self.phase.borrow()
    }

    /// Subscribes to phase changes; this is the operation's in-flight flag.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<UploadPhase> {
        self.phase.subscribe()
    }

    /// Runs the upload protocol for one file.
    ///
    /// # Errors
    /// Returns an [`UploadFailure`] preserving the originating error and,
    /// when the reconstruction service had already answered, the produced
    /// bundle.
    pub async fn run(
        &self,
        file_name: &str,
        category: &str,
        data: Vec<u8>,
    ) -> Result<UploadOutcome, UploadFailure> {
        self.phase.send_replace(UploadPhase::Encrypting);

        let bundle = match self.reconstruction.upload(file_name, data).await {
            Ok(bundle) => bundle,
            Err(error) => return Err(self.fail(error, None)),
        };

        if self.session.current_identity().is_none() {
            // On-chain registration is optional; surface the gap, keep the
            // artifacts.
            warn!(file_name, "{NOT_REGISTERED_WARNING}");
            self.phase.send_replace(UploadPhase::Success);
            return Ok(UploadOutcome::LocalOnly { bundle });
        }

        self.phase.send_replace(UploadPhase::AwaitingNetworkSwitch);
        if let Err(error) = self.session.ensure_network(self.registry.chain()).await {
            return Err(self.fail(error, Some(bundle)));
        }

        self.phase.send_replace(UploadPhase::AwaitingSignature);
        let request = RegisterRequest {
            file_name: file_name.to_string(),
            category: category.to_string(),
            original_hash: bundle
                .original_hash
                .clone()
                .unwrap_or_else(|| MISSING_ORIGINAL_HASH.to_string()),
            root_hash: bundle.root_hash.clone(),
            manifest_ref: PENDING_MANIFEST_REF.to_string(),
        };
        let submitted = match self.registry.register_record(request).await {
            Ok(submitted) => submitted,
            Err(error) => return Err(self.fail(error, Some(bundle))),
        };

        self.phase.send_replace(UploadPhase::AwaitingConfirmation);
        if let Err(error) = submitted.confirmed().await {
            return Err(self.fail(error, Some(bundle)));
        }

        info!(file_name, "vault secured on ledger");
        self.phase.send_replace(UploadPhase::Success);
        Ok(UploadOutcome::Registered { bundle })
    }

    fn fail(&self, error: VaultError, bundle: Option<ArtifactBundle>) -> UploadFailure {
        warn!(%error, "upload protocol failed");
        self.phase.send_replace(UploadPhase::Failed);
        UploadFailure { error, bundle }
    }
}
