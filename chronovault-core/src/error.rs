use thiserror::Error;

/// Error outputs from the `ChronoVault` client core.
///
/// Every failure is terminal for the current attempt: nothing in this crate
/// retries silently, because a retried write re-triggers a wallet prompt or a
/// paid ledger transaction. The originating cause text is preserved so it can
/// be surfaced to the user verbatim.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The fast-track artifact JSON is missing a required field, or a field
    /// has the wrong type. Recoverable; the user re-supplies input.
    #[error("malformed_bundle: {reason}")]
    MalformedBundle {
        /// What was wrong with the supplied JSON.
        reason: String,
    },
    /// The reconstruction service rejected an upload.
    #[error("upload_failed: {message}")]
    UploadFailed {
        /// Response body returned by the service.
        message: String,
    },
    /// The reconstruction service could not rebuild the file.
    #[error("reconstruction_failed: {message}")]
    ReconstructionFailed {
        /// Response body returned by the service.
        message: String,
    },
    /// No identity wallet extension is available.
    #[error("no_wallet_extension")]
    NoWalletExtension,
    /// The user declined a wallet prompt.
    #[error("user_rejected")]
    UserRejected,
    /// The wallet could not be switched to the required network.
    #[error("network_switch_failed: {reason}")]
    NetworkSwitchFailed {
        /// Cause reported by the wallet, or a description of the gate that
        /// blocked the operation.
        reason: String,
    },
    /// A ledger write was rejected at signing time or failed on the network.
    #[error("registration_failed: {reason}")]
    RegistrationFailed {
        /// Originating cause.
        reason: String,
    },
    /// Required input is missing; the operation was blocked before any
    /// remote call was made.
    #[error("incomplete_input: {missing}")]
    IncompleteInput {
        /// Description of the missing pieces.
        missing: String,
    },
    /// The presented input is not valid for the requested operation.
    #[error("invalid_input: {attribute}: {reason}")]
    InvalidInput {
        /// Name of the offending attribute.
        attribute: String,
        /// Description of the issue.
        reason: String,
    },
    /// Unexpected error serializing information.
    #[error("serialization_error: {0}")]
    SerializationError(String),
    /// Network connection error with details.
    #[error("network_error: {url}: {error}")]
    NetworkError {
        /// The URL the request was addressed to.
        url: String,
        /// Transport-level cause.
        error: String,
    },
    /// HTTP request failure.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}
