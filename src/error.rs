use thiserror::Error;

/// Errors surfaced by the external execution engine. `Timeout` is expected
/// control flow during batched sampling and is mapped to a failed attempt by
/// the callers. Everything else aborts the whole query.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("statement timed out")]
    Timeout,
    #[error("execution failed: {0}")]
    Execution(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
