use thiserror::Error;

/// Failures produced while talking to an external API.
///
/// `Auth` and `Dispatch` display their message verbatim: that text is what
/// ends up in an adapter's error log and, through the runner, in the
/// caller-facing error map.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Credentials rejected or the auth response lacked a token.
    /// Carries the raw response body.
    #[error("{0}")]
    Auth(String),

    /// Missing host, unknown endpoint key, or a transport failure.
    #[error("{0}")]
    Dispatch(String),

    /// No adapter is registered for the requested project.
    #[error("No adapter registered for project '{0}'")]
    UnknownAdapter(String),

    /// Nothing to send.
    #[error("Empty payload")]
    EmptyPayload,

    /// The settings store could not be read or written.
    #[error("Settings store error: {0:#}")]
    Settings(#[from] anyhow::Error),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
