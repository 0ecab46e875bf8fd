use std::error::Error;
use std::fmt::{Display, Formatter};

/// A custom error message for the analysis engine
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Error in the analysis configuration, detected before any fixpoint starts
    ConfigError(String),
    /// Malformed program or control-flow graph handed over by the front-end
    InvalidProgram(String),
    /// A semantic query failed for one program point (recoverable at run level)
    QueryFailure(String),
    /// Invariant violation
    InvariantViolation(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigError(msg) => {
                write!(f, "[lyra::config] {}", msg)
            }
            Self::InvalidProgram(msg) => {
                write!(f, "[lyra::program] {}", msg)
            }
            Self::QueryFailure(msg) => {
                write!(f, "[lyra::query] {}", msg)
            }
            Self::InvariantViolation(msg) => {
                write!(f, "[lyra::invariant] {}", msg)
            }
        }
    }
}

impl Error for EngineError {}
