use thiserror::Error;

/// Construction-time failures.
///
/// These are raised synchronously while a task is being constructed, before
/// anything is queued, cached, or executed. A task that fails construction
/// never reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("provider '{0}' is not registered")]
    ProviderMissing(&'static str),
}

/// Failures reported by the storage port.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("storage backend: {0}")]
    Backend(String),

    #[error("stored value could not be decoded: {0}")]
    Codec(String),
}

/// Failure reported by a non-storage collaborator (wallet, protocol client,
/// notifier, ...). Carries the provider name so workflow logs can tell the
/// seams apart.
#[derive(Debug, Clone, Error)]
#[error("{provider}: {message}")]
pub struct ProviderError {
    pub provider: &'static str,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: &'static str, message: impl Into<String>) -> Self {
        Self {
            provider,
            message: message.into(),
        }
    }
}

/// Failures while reviving a persisted queue record.
///
/// Fatal to that one drain iteration only; the record is still deleted so the
/// drain makes forward progress.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    #[error("unknown task name '{0}'")]
    UnknownTaskName(String),

    #[error("malformed arguments for task '{name}': {message}")]
    MalformedArgs { name: String, message: String },
}

/// Execution-time failures.
///
/// `Clone` because one settled failure fans out to every caller that joined
/// the in-flight execution.
#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error(transparent)]
    Construct(#[from] EngineError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("result codec: {0}")]
    Codec(String),

    #[error("relays not connected after {attempts} attempts")]
    RelaysUnavailable { attempts: u32 },

    #[error("in-flight execution abandoned before settling (key {0})")]
    Abandoned(String),

    #[error("{0}")]
    Other(String),
}
