use thiserror::Error;

/// Failure taxonomy shared by every backend variant.
///
/// `Authentication` and `Protocol` can only surface while constructing the
/// SSH transport and are fatal; everything else is a per-call condition
/// handled (logged, retried at the next natural poll or command) by the
/// layers above.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The transport cannot be reached (socket down, TCP refused, daemon
    /// not responding).
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Operation addressed a name the backend does not know.
    #[error("container not found: {0}")]
    NotFound(String),

    /// Shell-based listing produced output that cannot be parsed into
    /// name/state pairs.
    #[error("malformed status output: {0}")]
    MalformedOutput(String),

    /// Name contains characters that are illegal in a topic segment or in
    /// the listing format (`/`, `:`, whitespace).
    #[error("invalid container name: {0:?}")]
    InvalidName(String),

    /// SSH credentials were rejected.
    #[error("ssh authentication failed: {0}")]
    Authentication(String),

    /// SSH handshake or protocol-level failure.
    #[error("ssh protocol error: {0}")]
    Protocol(String),
}

impl BackendError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }
}
