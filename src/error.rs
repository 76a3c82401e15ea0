use thiserror::Error;

/// Failures raised while sending through Gmail.
///
/// The first three are resolution-time faults: they stop a whole send.
/// `TransportRejected` belongs to a single recipient and never stops the others.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GmailError {
    #[error("The Google client provider is required")]
    DependencyMissing,

    #[error("Unable to get Google client from the client provider")]
    CredentialUnavailable,

    #[error("Unable to get Gmail service: {0}")]
    HandleConstructionFailed(String),

    #[error("{0}")]
    TransportRejected(String),
}
