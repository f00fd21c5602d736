//! The artifact bundle codec.
//!
//! An artifact bundle is the three-part secret set needed to reconstruct a
//! protected file: the Merkle root hash, the chunk manifest and the
//! encryption key, plus an optional hash of the original plaintext used for
//! integrity comparison. The codec converts between the single
//! self-describing JSON form the user downloads, the three discrete byte
//! payloads the reconstruction service consumes, and the per-file export
//! texts. Nothing downstream of [`ArtifactBundle::decode`] ever touches the
//! raw untyped JSON.

use serde::{Deserialize, Serialize};

use crate::error::VaultError;

/// File name used for the synthesized root-hash payload.
pub const ROOT_HASH_FILE_NAME: &str = "roothash.txt";
/// File name used for the synthesized manifest payload.
pub const MANIFEST_FILE_NAME: &str = "manifest.txt";
/// File name used for the synthesized encryption-key payload.
pub const KEY_FILE_NAME: &str = "secret.key";

/// The three-part secret set needed to reconstruct a protected file.
///
/// Produced either by the reconstruction service's upload response or
/// synthesized client-side from three independently supplied files.
/// Immutable once built; a new operation starts from a fresh bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    /// Hash of the original plaintext, if the service computed one. Used
    /// only for the integrity comparison during retrieval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_hash: Option<String>,
    /// Merkle root of the encrypted chunk set.
    pub root_hash: String,
    /// Encryption key, in the service's textual form.
    pub encryption_key: String,
    /// Chunk manifest body.
    pub manifest_content: String,
}

/// A named byte payload destined for one multipart field of a
/// reconstruction request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// File name presented to the service.
    pub file_name: String,
    /// Raw content.
    pub bytes: Vec<u8>,
}

/// The deterministic three-payload form of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPayloads {
    /// Root-hash payload (`roothash.txt`).
    pub root: Payload,
    /// Manifest payload (`manifest.txt`).
    pub manifest: Payload,
    /// Encryption-key payload (`secret.key`).
    pub key: Payload,
}

/// Per-file export packaging of a bundle, for user download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportableBundle {
    /// Manifest body as text.
    pub manifest_text: String,
    /// Root hash as text.
    pub root_hash_text: String,
    /// Encryption key as text.
    pub key_text: String,
    /// Pretty-printed JSON of the full bundle. Round-trips through
    /// [`ArtifactBundle::decode`].
    pub json_text: String,
}

impl ArtifactBundle {
    /// Decodes a bundle from its JSON fast-track form.
    ///
    /// `root_hash`, `encryption_key` and `manifest_content` must all be
    /// present, strings and non-empty. An empty `original_hash` is
    /// normalized to absent.
    ///
    /// # Errors
    /// Returns [`VaultError::MalformedBundle`] describing the first problem
    /// found.
    pub fn decode(json_text: &str) -> Result<Self, VaultError> {
        let mut bundle: Self = serde_json::from_str(json_text).map_err(|err| {
            VaultError::MalformedBundle {
                reason: err.to_string(),
            }
        })?;

        for (field, value) in [
            ("root_hash", &bundle.root_hash),
            ("encryption_key", &bundle.encryption_key),
            ("manifest_content", &bundle.manifest_content),
        ] {
            if value.is_empty() {
                return Err(VaultError::MalformedBundle {
                    reason: format!("`{field}` is empty"),
                });
            }
        }

        if bundle.original_hash.as_deref() == Some("") {
            bundle.original_hash = None;
        }

        Ok(bundle)
    }

    /// Maps the bundle to the three named byte payloads of a reconstruction
    /// request. Pure; the file names are fixed.
    #[must_use]
    pub fn to_payloads(&self) -> ArtifactPayloads {
        ArtifactPayloads {
            root: Payload {
                file_name: ROOT_HASH_FILE_NAME.to_string(),
                bytes: self.root_hash.clone().into_bytes(),
            },
            manifest: Payload {
                file_name: MANIFEST_FILE_NAME.to_string(),
                bytes: self.manifest_content.clone().into_bytes(),
            },
            key: Payload {
                file_name: KEY_FILE_NAME.to_string(),
                bytes: self.encryption_key.clone().into_bytes(),
            },
        }
    }

    /// Packages the bundle for user download.
    ///
    /// # Errors
    /// Returns [`VaultError::SerializationError`] if JSON serialization
    /// fails, which would indicate a bug rather than bad input.
    pub fn to_exportable(&self) -> Result<ExportableBundle, VaultError> {
        let json_text = serde_json::to_string_pretty(self)
            .map_err(|err| VaultError::SerializationError(err.to_string()))?;

        Ok(ExportableBundle {
            manifest_text: self.manifest_content.clone(),
            root_hash_text: self.root_hash.clone(),
            key_text: self.encryption_key.clone(),
            json_text,
        })
    }
}
