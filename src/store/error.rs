use std::fmt;

/// Failure reported by a store client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A transactional write was cancelled because the precondition of the
    /// operation at `index` did not hold. Nothing was applied.
    ConditionFailed { index: usize },
    /// The request was rejected before reaching storage.
    Validation(String),
    /// Network, timeout or storage failure.
    Transport(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ConditionFailed { index } => {
                write!(f, "condition failed for operation {}", index)
            }
            StoreError::Validation(message) => write!(f, "invalid request: {}", message),
            StoreError::Transport(message) => write!(f, "transport error: {}", message),
        }
    }
}

impl std::error::Error for StoreError {}
