//! Retrieval orchestration.
//!
//! Collects reconstruction input through one of two mutually exclusive
//! paths — a fast-track bundle JSON, or three manually supplied files — and
//! submits it to the reconstruction service once complete. A vault record
//! selected from the ledger pre-fills the root hash and expected hash, but
//! the manifest and key are never stored on-chain and must still be
//! supplied by the user. Failures keep the already-entered input so the
//! user can correct and retry.

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    bundle::{ArtifactBundle, ArtifactPayloads, Payload, ROOT_HASH_FILE_NAME},
    error::VaultError,
    reconstruction::{ReconstructionClient, ReconstructionRequest, RetrievalResult},
    registry::VaultRecord,
};

/// Which of the three manual artifact files a supplied file stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    /// The root-hash file.
    RootHash,
    /// The manifest file.
    Manifest,
    /// The encryption-key file.
    Key,
}

impl FileRole {
    /// Human-readable label used in incomplete-input messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RootHash => "root hash file",
            Self::Manifest => "manifest file",
            Self::Key => "key file",
        }
    }
}

/// A file handed to the client, independent of the originating gesture
/// (drag-and-drop, file picker, or synthesized from a vault record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppliedFile {
    /// Original file name.
    pub name: String,
    /// Raw content.
    pub data: Vec<u8>,
}

impl From<SuppliedFile> for Payload {
    fn from(file: SuppliedFile) -> Self {
        Self {
            file_name: file.name,
            bytes: file.data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    FastTrack(ArtifactBundle),
    Manual {
        root: Option<SuppliedFile>,
        manifest: Option<SuppliedFile>,
        key: Option<SuppliedFile>,
    },
}

impl InputSource {
    const fn empty_manual() -> Self {
        Self::Manual {
            root: None,
            manifest: None,
            key: None,
        }
    }
}

/// Collected reconstruction input. Exactly one path is active at a time:
/// loading a fast-track bundle clears any manual files, and supplying a
/// manual file clears a loaded bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievalInput {
    source: Option<InputSource>,
    expected_hash: Option<String>,
}

impl RetrievalInput {
    /// Loads a fast-track bundle from its JSON form, replacing any manual
    /// files. The bundle's own original hash becomes the expected hash.
    ///
    /// # Errors
    /// [`VaultError::MalformedBundle`] when the JSON is invalid; a
    /// previously loaded bundle is cleared, manual files are kept.
    pub fn load_fast_track(&mut self, json_text: &str) -> Result<(), VaultError> {
        match ArtifactBundle::decode(json_text) {
            Ok(bundle) => {
                self.use_bundle(bundle);
                Ok(())
            }
            Err(err) => {
                if matches!(self.source, Some(InputSource::FastTrack(_))) {
                    self.source = None;
                }
                Err(err)
            }
        }
    }

    /// Adopts an already-decoded bundle as the fast-track input.
    pub fn use_bundle(&mut self, bundle: ArtifactBundle) {
        if let Some(hash) = bundle.original_hash.clone() {
            self.expected_hash = Some(hash);
        }
        self.source = Some(InputSource::FastTrack(bundle));
    }

    /// Supplies one manual artifact file, clearing any fast-track bundle.
    pub fn provide_file(&mut self, role: FileRole, file: SuppliedFile) {
        if !matches!(self.source, Some(InputSource::Manual { .. })) {
            self.source = Some(InputSource::empty_manual());
        }
        if let Some(InputSource::Manual {
            root,
            manifest,
            key,
        }) = &mut self.source
        {
            match role {
                FileRole::RootHash => *root = Some(file),
                FileRole::Manifest => *manifest = Some(file),
                FileRole::Key => *key = Some(file),
            }
        }
    }

    /// Starts a ledger-record retrieval: the record's root hash becomes the
    /// root payload and its original hash (when actually recorded) the
    /// expected hash. The manifest and key files are never stored on-chain
    /// and must still be provided.
    pub fn prefill_from_record(&mut self, record: &VaultRecord) {
        self.source = Some(InputSource::empty_manual());
        self.provide_file(
            FileRole::RootHash,
            SuppliedFile {
                name: ROOT_HASH_FILE_NAME.to_string(),
                data: record.root_hash.clone().into_bytes(),
            },
        );
        self.expected_hash = record.expected_hash().map(ToString::to_string);
    }

    /// Sets or clears the explicit expected-hash override. Whitespace is
    /// trimmed; an empty value clears the override.
    pub fn set_expected_hash(&mut self, value: &str) {
        let trimmed = value.trim();
        self.expected_hash = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }

    /// The expected hash that would accompany a submission.
    #[must_use]
    pub fn expected_hash(&self) -> Option<&str> {
        self.expected_hash.as_deref()
    }

    /// The loaded fast-track bundle, if that path is active.
    #[must_use]
    pub const fn fast_track(&self) -> Option<&ArtifactBundle> {
        match &self.source {
            Some(InputSource::FastTrack(bundle)) => Some(bundle),
            _ => None,
        }
    }

    /// The manual file supplied for `role`, if the manual path is active.
    #[must_use]
    pub const fn manual_file(&self, role: FileRole) -> Option<&SuppliedFile> {
        match &self.source {
            Some(InputSource::Manual {
                root,
                manifest,
                key,
            }) => match role {
                FileRole::RootHash => root.as_ref(),
                FileRole::Manifest => manifest.as_ref(),
                FileRole::Key => key.as_ref(),
            },
            _ => None,
        }
    }

    /// Whether the input satisfies the completeness rule.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.to_request().is_ok()
    }

    /// Discards everything.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Validates completeness and assembles the reconstruction request.
    ///
    /// # Errors
    /// [`VaultError::IncompleteInput`] naming what is missing.
    pub fn to_request(&self) -> Result<ReconstructionRequest, VaultError> {
        let payloads = match &self.source {
            Some(InputSource::FastTrack(bundle)) => bundle.to_payloads(),
            Some(InputSource::Manual {
                root,
                manifest,
                key,
            }) => match (root, manifest, key) {
                (Some(root), Some(manifest), Some(key)) => ArtifactPayloads {
                    root: root.clone().into(),
                    manifest: manifest.clone().into(),
                    key: key.clone().into(),
                },
                (root, manifest, key) => {
                    let missing: Vec<&str> = [
                        (FileRole::RootHash, root.is_none()),
                        (FileRole::Manifest, manifest.is_none()),
                        (FileRole::Key, key.is_none()),
                    ]
                    .iter()
                    .filter(|(_, absent)| *absent)
                    .map(|(role, _)| role.label())
                    .collect();
                    return Err(VaultError::IncompleteInput {
                        missing: missing.join(", "),
                    });
                }
            },
            None => {
                return Err(VaultError::IncompleteInput {
                    missing: "an artifact bundle or all three artifact files".to_string(),
                })
            }
        };

        Ok(ReconstructionRequest {
            payloads,
            expected_hash: self.expected_hash.clone(),
        })
    }
}

/// Observable step of a retrieval operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalPhase {
    /// Waiting for input; the completeness gate is not yet satisfied or
    /// nothing has been submitted.
    CollectingInput,
    /// A reconstruction request is in flight.
    Submitting,
    /// The last submission succeeded.
    Success,
    /// The last submission failed; input is retained for retry and any
    /// interaction returns the machine to `CollectingInput`.
    Failed,
}

/// Sequences retrieval: collect input, validate completeness, call the
/// reconstruction service, expose the result.
pub struct RetrievalOrchestrator {
    client: ReconstructionClient,
    input: RetrievalInput,
    phase: watch::Sender<RetrievalPhase>,
    last_error: Option<String>,
}

impl RetrievalOrchestrator {
    /// Creates an orchestrator over a reconstruction client.
    #[must_use]
    pub fn new(client: ReconstructionClient) -> Self {
        let (phase, _) = watch::channel(RetrievalPhase::CollectingInput);
        Self {
            client,
            input: RetrievalInput::default(),
            phase,
            last_error: None,
        }
    }

    /// The current phase.
    #[must_use]
    pub fn phase(&self) -> RetrievalPhase {
        *self.phase.borrow()
    }

    /// Subscribes to phase changes; this is the operation's in-flight flag.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RetrievalPhase> {
        self.phase.subscribe()
    }

    /// Display text of the most recent failure, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Read access to the collected input.
    #[must_use]
    pub const fn input(&self) -> &RetrievalInput {
        &self.input
    }

    /// Loads a fast-track bundle JSON. See [`RetrievalInput::load_fast_track`].
    ///
    /// # Errors
    /// [`VaultError::MalformedBundle`] on invalid JSON.
    pub fn load_fast_track(&mut self, json_text: &str) -> Result<(), VaultError> {
        self.collecting();
        let result = self.input.load_fast_track(json_text);
        if let Err(err) = &result {
            self.last_error = Some(err.to_string());
        }
        result
    }

    /// Supplies one manual artifact file.
    pub fn provide_file(&mut self, role: FileRole, file: SuppliedFile) {
        self.collecting();
        self.input.provide_file(role, file);
    }

    /// Starts a ledger-record retrieval from a selected vault record.
    pub fn prefill_from_record(&mut self, record: &VaultRecord) {
        self.collecting();
        self.input.prefill_from_record(record);
        debug!(id = %record.id, "retrieval pre-filled from vault record");
    }

    /// Sets or clears the explicit expected-hash override.
    pub fn set_expected_hash(&mut self, value: &str) {
        self.collecting();
        self.input.set_expected_hash(value);
    }

    /// Discards all input and starts a new operation.
    pub fn reset(&mut self) {
        self.input.clear();
        self.last_error = None;
        self.phase.send_replace(RetrievalPhase::CollectingInput);
    }

    /// Validates the collected input and submits it to the reconstruction
    /// service.
    ///
    /// # Errors
    /// [`VaultError::IncompleteInput`] when the completeness gate blocks
    /// submission (no remote call is made); otherwise the reconstruction
    /// failure. Either way the collected input is retained.
    pub async fn submit(&mut self) -> Result<RetrievalResult, VaultError> {
        self.collecting();
        let request = match self.input.to_request() {
            Ok(request) => request,
            Err(err) => {
                self.last_error = Some(err.to_string());
                return Err(err);
            }
        };

        self.phase.send_replace(RetrievalPhase::Submitting);
        self.last_error = None;

        match self.client.reconstruct(request).await {
            Ok(result) => {
                self.phase.send_replace(RetrievalPhase::Success);
                Ok(result)
            }
            Err(err) => {
                warn!(%err, "reconstruction failed; input retained");
                self.last_error = Some(err.to_string());
                self.phase.send_replace(RetrievalPhase::Failed);
                Err(err)
            }
        }
    }

    /// Any interaction after a failure or success returns the machine to
    /// input collection.
    fn collecting(&mut self) {
        if *self.phase.borrow() != RetrievalPhase::CollectingInput {
            self.phase.send_replace(RetrievalPhase::CollectingInput);
        }
    }
}
