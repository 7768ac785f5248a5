use crate::model::ModelError;

/// Errors surfaced by the core task machinery.
///
/// Tracer persistence failures are deliberately absent: tracing is
/// best-effort observability and never aborts the task it records.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller error: a tracer was requested with an empty task id.
    #[error("task id must not be empty")]
    EmptyTaskId,

    /// Caller error: the requested agent is not registered.
    #[error("agent '{0}' not found")]
    UnknownAgent(String),

    /// Terminal agent failure: the retry budget was exhausted.
    #[error("[{agent}] failed to get response after {attempts} attempts")]
    RetriesExhausted {
        agent: String,
        attempts: u32,
        #[source]
        source: ModelError,
    },

    /// A single model invocation failed outside any retry wrapper.
    #[error(transparent)]
    Model(#[from] ModelError),
}
