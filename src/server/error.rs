//! Server lifecycle error taxonomy.

use thiserror::Error;

/// Errors surfaced by the server lifecycle manager.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A required collaborator was missing or a config field was
    /// unusable at construction. No server is created.
    #[error("invalid configuration: {0}")]
    Configuration(&'static str),

    /// Binding the listening socket failed. The instance stays in the
    /// created state and the attempt may be retried.
    #[error("failed to bind TCP listener on port {port}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The startup hook failed after the listener was bound. The
    /// instance is started; the caller decides whether to stop it.
    #[error("startup hook failed")]
    StartupHook(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The bound port was queried while the server is not started.
    #[error("server is not bound")]
    NotBound,
}
