//! Errors surfaced by the engine and its adapters.

use thiserror::Error;

/// Errors that can occur while dispatching or consuming a methods engine.
///
/// Unknown action types are not errors; the reducer ignores them.
#[derive(Debug, Error)]
pub enum MethodsError {
    /// A shared-context consumer ran outside of a matching provider.
    #[error("useMethodsContext must be used inside a MethodsProvider.")]
    OutsideProvider,

    /// A pending computation returned by a method or action failed.
    #[error("`{action}` was rejected: {source}")]
    Rejected {
        action: String,
        source: anyhow::Error,
    },

    /// The task driving a pending computation panicked.
    #[error("`{action}` was aborted before it settled: {reason}")]
    Aborted { action: String, reason: String },

    /// A pending computation was produced outside of a tokio runtime.
    #[error("no tokio runtime available to drive `{action}`")]
    NoRuntime { action: String },

    /// The payload has fewer arguments than requested.
    #[error("payload argument {index} is missing")]
    MissingArgument { index: usize },

    /// A payload argument could not be deserialized into the requested type.
    #[error("payload argument {index} has an unexpected shape: {source}")]
    InvalidArgument {
        index: usize,
        source: serde_json::Error,
    },
}
