//! Client for the external reconstruction service.
//!
//! The service owns encryption, hashing and content addressing; this client
//! only moves payloads. `POST /upload` takes a raw file and answers with an
//! artifact bundle; `POST /retrieve` takes the three bundle payloads (plus
//! an optional expected hash) and answers with the rebuilt file, a suggested
//! file name and a tri-state integrity verdict. Non-success responses carry
//! an opaque human-readable cause in the body, which is surfaced verbatim.
//! No call is ever retried automatically.

use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use crate::{
    bundle::{ArtifactBundle, ArtifactPayloads, Payload},
    error::VaultError,
    http_request::Request,
    Environment,
};

/// Response header carrying the service's integrity comparison outcome.
const INTEGRITY_HEADER: &str = "X-Integrity-Verified";

/// File name used when the service supplies none, or one that cannot be
/// parsed out of the `Content-Disposition` header.
pub const RESTORED_FILE_NAME: &str = "restored_file";

/// Outcome of comparing the reconstructed file's hash against an expected
/// hash. Tri-state because the service may not have been given anything to
/// compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityVerdict {
    /// The service computed the hash and it matched.
    Verified,
    /// The service computed the hash and it did not match.
    Mismatched,
    /// No comparison was performed.
    Unavailable,
}

impl IntegrityVerdict {
    /// Maps the integrity header to a verdict. The mapping is exact: only
    /// the literal strings `"true"` and `"false"` are meaningful; any other
    /// value, and an absent header, mean no comparison happened.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some("true") => Self::Verified,
            Some("false") => Self::Mismatched,
            _ => Self::Unavailable,
        }
    }
}

/// A reconstructed file, as delivered by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalResult {
    /// The rebuilt file content.
    pub data: Vec<u8>,
    /// File name suggested by the service, or [`RESTORED_FILE_NAME`].
    pub file_name: String,
    /// Integrity comparison outcome.
    pub verdict: IntegrityVerdict,
}

/// Inputs for a reconstruction call: the three bundle payloads plus the
/// optional expected hash of the original plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructionRequest {
    /// The three named payloads.
    pub payloads: ArtifactPayloads,
    /// Hash to compare the rebuilt file against, if any.
    pub expected_hash: Option<String>,
}

/// HTTP client for the reconstruction service.
pub struct ReconstructionClient {
    base_url: String,
    request: Request,
}

impl ReconstructionClient {
    /// Creates a client for a service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            request: Request::new(),
        }
    }

    /// Creates a client for the given environment's default service host.
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        Self::new(environment.reconstruction_host())
    }

    /// Submits a raw file for encryption and content addressing.
    ///
    /// # Errors
    /// [`VaultError::UploadFailed`] with the service's response body on a
    /// non-success status; [`VaultError::NetworkError`] on transport
    /// failure; [`VaultError::SerializationError`] if a success response
    /// cannot be parsed as a bundle.
    pub async fn upload(
        &self,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<ArtifactBundle, VaultError> {
        let url = format!("{}/upload", self.base_url);
        debug!(%url, file_name, size = data.len(), "uploading file");

        let form = Form::new().part("file", Part::bytes(data).file_name(file_name.to_owned()));
        let response = self
            .request
            .handle(self.request.post(&url).multipart(form))
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(VaultError::UploadFailed {
                message: error_message(&body, status),
            });
        }

        let bundle = ArtifactBundle::decode(&body).map_err(|err| {
            // Truncate the echoed body so nothing sensitive lands in logs or
            // error reports.
            VaultError::SerializationError(format!(
                "failed to parse upload response from {url}: {err}, received: {}",
                body.chars().take(20).collect::<String>()
            ))
        })?;

        info!(root_hash = %bundle.root_hash, "upload complete");
        Ok(bundle)
    }

    /// Asks the service to rebuild a file from its artifact payloads.
    ///
    /// # Errors
    /// [`VaultError::ReconstructionFailed`] with the service's response body
    /// on a non-success status; [`VaultError::NetworkError`] on transport
    /// failure.
    pub async fn reconstruct(
        &self,
        request: ReconstructionRequest,
    ) -> Result<RetrievalResult, VaultError> {
        let url = format!("{}/retrieve", self.base_url);
        debug!(%url, expected_hash = request.expected_hash.is_some(), "requesting reconstruction");

        let ReconstructionRequest {
            payloads,
            expected_hash,
        } = request;
        let mut form = Form::new()
            .part("roothash_file", file_part(payloads.root))
            .part("manifest_file", file_part(payloads.manifest))
            .part("key_file", file_part(payloads.key));
        if let Some(hash) = expected_hash {
            form = form.text("original_hash", hash);
        }

        let response = self
            .request
            .handle(self.request.post(&url).multipart(form))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VaultError::ReconstructionFailed {
                message: error_message(&body, status),
            });
        }

        let file_name = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(content_disposition_file_name)
            .unwrap_or_else(|| RESTORED_FILE_NAME.to_string());
        let verdict = IntegrityVerdict::from_header(
            response
                .headers()
                .get(INTEGRITY_HEADER)
                .and_then(|value| value.to_str().ok()),
        );
        let data = response.bytes().await?.to_vec();

        info!(%file_name, ?verdict, size = data.len(), "reconstruction complete");
        Ok(RetrievalResult {
            data,
            file_name,
            verdict,
        })
    }
}

fn file_part(payload: Payload) -> Part {
    Part::bytes(payload.bytes).file_name(payload.file_name)
}

/// The service's error bodies are opaque text; surface them as-is, falling
/// back to the status line when the body is empty.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("service returned status {status}")
    } else {
        trimmed.to_string()
    }
}

/// Extracts the file name from a `Content-Disposition` value, tolerating
/// both quoted and bare forms.
fn content_disposition_file_name(value: &str) -> Option<String> {
    let lower = value.to_ascii_lowercase();
    let start = lower.find("filename=")? + "filename=".len();
    let rest = &value[start..];
    let rest = rest.strip_prefix('"').unwrap_or(rest);
    let end = rest.find(['"', ';']).unwrap_or(rest.len());
    let name = rest[..end].trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn sample_request() -> ReconstructionRequest {
        let bundle = ArtifactBundle {
            original_hash: None,
            root_hash: "deadbeef".to_string(),
            encryption_key: "0f1e2d3c".to_string(),
            manifest_content: "QmFoo\nQmBar".to_string(),
        };
        ReconstructionRequest {
            payloads: bundle.to_payloads(),
            expected_hash: Some("a1b2c3".to_string()),
        }
    }

    #[test_case(Some("true"), IntegrityVerdict::Verified; "literal true")]
    #[test_case(Some("false"), IntegrityVerdict::Mismatched; "literal false")]
    #[test_case(Some("unavailable"), IntegrityVerdict::Unavailable; "service unavailable marker")]
    #[test_case(Some("TRUE"), IntegrityVerdict::Unavailable; "wrong case is not a verdict")]
    #[test_case(Some(""), IntegrityVerdict::Unavailable; "empty value")]
    #[test_case(None, IntegrityVerdict::Unavailable; "absent header")]
    fn test_integrity_header_mapping(value: Option<&str>, expected: IntegrityVerdict) {
        assert_eq!(IntegrityVerdict::from_header(value), expected);
    }

    #[test_case(r#"attachment; filename="notes.txt""#, Some("notes.txt"); "quoted")]
    #[test_case("attachment; filename=notes.txt", Some("notes.txt"); "bare")]
    #[test_case(r#"attachment; FILENAME="notes.txt""#, Some("notes.txt"); "case insensitive")]
    #[test_case("attachment; filename=notes.txt; size=42", Some("notes.txt"); "trailing parameter")]
    #[test_case("attachment", None; "no filename")]
    #[test_case(r#"attachment; filename="""#, None; "empty filename")]
    fn test_content_disposition_parsing(value: &str, expected: Option<&str>) {
        assert_eq!(
            content_disposition_file_name(value).as_deref(),
            expected
        );
    }

    #[tokio::test]
    async fn test_upload_parses_bundle_response() {
        let mut mock_server = mockito::Server::new_async().await;
        mock_server
            .mock("POST", "/upload")
            .with_status(200)
            .with_body(
                r#"{"original_hash":"a1b2c3","root_hash":"deadbeef","encryption_key":"0f1e2d3c","manifest_content":"QmFoo"}"#,
            )
            .create_async()
            .await;

        let client = ReconstructionClient::new(mock_server.url());
        let bundle = client
            .upload("notes.txt", b"hello world".to_vec())
            .await
            .unwrap();

        assert_eq!(bundle.root_hash, "deadbeef");
        assert_eq!(bundle.original_hash.as_deref(), Some("a1b2c3"));
    }

    #[tokio::test]
    async fn test_upload_surfaces_service_error_body() {
        let mut mock_server = mockito::Server::new_async().await;
        mock_server
            .mock("POST", "/upload")
            .with_status(500)
            .with_body("Error uploading to IPFS")
            .create_async()
            .await;

        let client = ReconstructionClient::new(mock_server.url());
        let err = client.upload("notes.txt", vec![1, 2, 3]).await.unwrap_err();

        match err {
            VaultError::UploadFailed { message } => {
                assert_eq!(message, "Error uploading to IPFS");
            }
            other => panic!("expected UploadFailed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload_rejects_unparsable_success_body() {
        let mut mock_server = mockito::Server::new_async().await;
        mock_server
            .mock("POST", "/upload")
            .with_status(200)
            .with_body("<html>gateway timeout</html>")
            .create_async()
            .await;

        let client = ReconstructionClient::new(mock_server.url());
        let err = client.upload("notes.txt", vec![0]).await.unwrap_err();
        assert!(matches!(err, VaultError::SerializationError(_)));
    }

    #[tokio::test]
    async fn test_reconstruct_verified_with_file_name() {
        let mut mock_server = mockito::Server::new_async().await;
        mock_server
            .mock("POST", "/retrieve")
            .match_body(mockito::Matcher::Regex(
                "name=\"original_hash\"".to_string(),
            ))
            .with_status(200)
            .with_header("Content-Disposition", "attachment; filename=\"notes.txt\"")
            .with_header("X-Integrity-Verified", "true")
            .with_body([1u8, 2, 3, 4])
            .create_async()
            .await;

        let client = ReconstructionClient::new(mock_server.url());
        let result = client.reconstruct(sample_request()).await.unwrap();

        assert_eq!(result.file_name, "notes.txt");
        assert_eq!(result.verdict, IntegrityVerdict::Verified);
        assert_eq!(result.data, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_reconstruct_defaults_file_name_and_verdict() {
        let mut mock_server = mockito::Server::new_async().await;
        mock_server
            .mock("POST", "/retrieve")
            .with_status(200)
            .with_body([9u8])
            .create_async()
            .await;

        let client = ReconstructionClient::new(mock_server.url());
        let mut request = sample_request();
        request.expected_hash = None;
        let result = client.reconstruct(request).await.unwrap();

        assert_eq!(result.file_name, RESTORED_FILE_NAME);
        assert_eq!(result.verdict, IntegrityVerdict::Unavailable);
    }

    #[tokio::test]
    async fn test_reconstruct_mismatch_header() {
        let mut mock_server = mockito::Server::new_async().await;
        mock_server
            .mock("POST", "/retrieve")
            .with_status(200)
            .with_header("X-Integrity-Verified", "false")
            .with_body([0u8])
            .create_async()
            .await;

        let client = ReconstructionClient::new(mock_server.url());
        let result = client.reconstruct(sample_request()).await.unwrap();
        assert_eq!(result.verdict, IntegrityVerdict::Mismatched);
    }

    #[tokio::test]
    async fn test_reconstruct_surfaces_service_error_body() {
        let mut mock_server = mockito::Server::new_async().await;
        mock_server
            .mock("POST", "/retrieve")
            .with_status(403)
            .with_body("Decryption Failed (Wrong Key?)")
            .create_async()
            .await;

        let client = ReconstructionClient::new(mock_server.url());
        let err = client.reconstruct(sample_request()).await.unwrap_err();

        match err {
            VaultError::ReconstructionFailed { message } => {
                assert_eq!(message, "Decryption Failed (Wrong Key?)");
            }
            other => panic!("expected ReconstructionFailed, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_propagates_immediately() {
        // Nothing is listening on this port; the client must fail with a
        // network error instead of hanging or retrying.
        let client = ReconstructionClient::new("http://127.0.0.1:1");
        let err = client.reconstruct(sample_request()).await.unwrap_err();
        assert!(matches!(err, VaultError::NetworkError { .. }));
    }
}
