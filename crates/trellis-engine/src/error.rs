use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// The underlying data source failed during fetch. Propagated unmodified;
    /// retries, if any, belong to the source.
    Source(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Source(e) => write!(f, "data source error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Source(e) => Some(e.as_ref()),
        }
    }
}
