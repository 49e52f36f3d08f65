use std::fmt;

/// Errors from the pure engine operations.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    InvalidArgument(String),
    InvalidDate(String),
    InvalidConfig(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            EngineError::InvalidDate(s) => write!(f, "invalid date (expected YYYY-MM-DD): {s}"),
            EngineError::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Errors from acting on a triage session. All are recoverable: the caller
/// re-fetches the queue or retries the action.
#[derive(Debug, Clone, PartialEq)]
pub enum TriageError {
    /// No card for this contact in the current session.
    NotFound(String),
    /// The card exists but was already watered, snoozed, or is in flight.
    InvalidState { contact_id: String, status: &'static str },
    /// The host failed to record the interaction; optimistic state was reverted.
    HostFailure { contact_id: String, reason: String },
}

impl fmt::Display for TriageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriageError::NotFound(id) => write!(f, "no pending card for contact {id}"),
            TriageError::InvalidState { contact_id, status } => {
                write!(f, "card for contact {contact_id} is already {status}")
            }
            TriageError::HostFailure { contact_id, reason } => {
                write!(f, "failed to record interaction for {contact_id}: {reason}")
            }
        }
    }
}

impl std::error::Error for TriageError {}

pub type Result<T> = std::result::Result<T, EngineError>;
