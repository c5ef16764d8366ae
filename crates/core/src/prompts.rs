use serde::{Deserialize, Serialize};

/// How many candidate starting topics a session offers.
pub const PROMPT_COUNT: usize = 3;

/// The three candidate starting topics, in stable display order.
///
/// A `PromptSet` is created once per session and consumed once: exactly one
/// entry is selected, after which the set stays immutable for the rest of the
/// session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptSet {
    pub prompt1: String,
    pub prompt2: String,
    pub prompt3: String,
}

/// A prompt selection that cannot be resolved to one of the three entries.
///
/// Selection errors are fatal to the current attempt; there is no clamping
/// and no default choice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("selection must be a number between 1 and {PROMPT_COUNT}, got '{0}'")]
    NotANumber(String),
    #[error("selection {0} is out of range 1..={PROMPT_COUNT}")]
    OutOfRange(usize),
}

impl PromptSet {
    /// The entries in display order.
    pub fn entries(&self) -> [&str; PROMPT_COUNT] {
        [&self.prompt1, &self.prompt2, &self.prompt3]
    }

    /// Resolves a 1-based selection index to its prompt.
    pub fn select(&self, index: usize) -> Result<&str, SelectionError> {
        match index {
            1 => Ok(&self.prompt1),
            2 => Ok(&self.prompt2),
            3 => Ok(&self.prompt3),
            other => Err(SelectionError::OutOfRange(other)),
        }
    }
}
