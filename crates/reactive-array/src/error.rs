use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArrayError>;

/// Errors reported by the checked (`try_*`) side of the array API.
///
/// The panicking API (`insert`, `replace`, `remove_at_index`, `get`, `set`)
/// raises the same condition as a panic carrying this error's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArrayError {
    #[error("{operation}: index {index} out of bounds (length {len})")]
    IndexOutOfBounds {
        /// Name of the rejected call (`"insert"`, `"replace"`, `"remove_element"`, `"get"`).
        operation: &'static str,
        index: usize,
        len: usize,
    },
}

impl ArrayError {
    #[must_use]
    pub fn out_of_bounds(operation: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfBounds {
            operation,
            index,
            len,
        }
    }

    /// The offending index.
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            Self::IndexOutOfBounds { index, .. } => *index,
        }
    }
}
