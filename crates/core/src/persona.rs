use serde::{Deserialize, Serialize};
use std::fmt;

/// A generated character profile driving one agent's conversational style.
///
/// Personas are created once per session by the provisioning step and are
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub skillset: String,
    pub personality: String,
    pub description: String,
}

impl Persona {
    /// A persona must carry a non-empty name so every transcript line can be
    /// attributed to a speaker.
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Labels for the two agents in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Llm1,
    Llm2,
}

impl Speaker {
    pub fn counterpart(self) -> Self {
        match self {
            Speaker::Llm1 => Speaker::Llm2,
            Speaker::Llm2 => Speaker::Llm1,
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::Llm1 => write!(f, "llm1"),
            Speaker::Llm2 => write!(f, "llm2"),
        }
    }
}

/// The two personas of a session, keyed the way the persisted log names them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaPair {
    pub llm1: Persona,
    pub llm2: Persona,
}

impl PersonaPair {
    pub fn speaker(&self, speaker: Speaker) -> &Persona {
        match speaker {
            Speaker::Llm1 => &self.llm1,
            Speaker::Llm2 => &self.llm2,
        }
    }
}
