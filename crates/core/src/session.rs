//! Session Log
//!
//! The in-memory record of one session and its persisted JSON form: personas
//! and starter prompts as nested key-value objects, the selected prompt, and
//! the conversation as an ordered sequence of single-key objects alternating
//! `{"llm1": text}` / `{"llm2": text}`. Persistence is all-or-nothing at
//! session end; there are no incremental writes.

use crate::persona::{PersonaPair, Speaker};
use crate::prompts::PromptSet;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// One attributed, display-formatted reply. Two are produced per round.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    /// The reply as shown to the reader, prefixed with the speaker's name.
    pub text: String,
}

/// Persisted form of a turn: an externally tagged enum, which serde writes
/// as exactly the single-key object the log format calls for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TurnRecord {
    #[serde(rename = "llm1")]
    Llm1(String),
    #[serde(rename = "llm2")]
    Llm2(String),
}

impl From<ConversationTurn> for TurnRecord {
    fn from(turn: ConversationTurn) -> Self {
        match turn.speaker {
            Speaker::Llm1 => TurnRecord::Llm1(turn.text),
            Speaker::Llm2 => TurnRecord::Llm2(turn.text),
        }
    }
}

impl TurnRecord {
    pub fn speaker(&self) -> Speaker {
        match self {
            TurnRecord::Llm1(_) => Speaker::Llm1,
            TurnRecord::Llm2(_) => Speaker::Llm2,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            TurnRecord::Llm1(text) | TurnRecord::Llm2(text) => text,
        }
    }
}

/// Everything a session produced, built incrementally as rounds complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub personalities: PersonaPair,
    pub starter_prompts: PromptSet,
    pub selected_prompt: String,
    pub conversation: Vec<TurnRecord>,
}

impl SessionLog {
    pub fn new(
        personalities: PersonaPair,
        starter_prompts: PromptSet,
        selected_prompt: String,
    ) -> Self {
        Self {
            personalities,
            starter_prompts,
            selected_prompt,
            conversation: Vec::new(),
        }
    }

    /// Appends both turns of a completed round, preserving speaker order.
    pub fn push_round(&mut self, first: ConversationTurn, second: ConversationTurn) {
        self.conversation.push(first.into());
        self.conversation.push(second.into());
    }

    pub fn rounds(&self) -> usize {
        self.conversation.len() / 2
    }

    /// Writes the whole log as one pretty-printed JSON document.
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_string_pretty(self).context("serializing session log")?;
        fs::write(path, body)
            .with_context(|| format!("writing session log to {}", path.display()))?;
        info!(path = %path.display(), rounds = self.rounds(), "session log saved");
        Ok(())
    }
}
