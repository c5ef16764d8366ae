//! Conversation Engine
//!
//! The turn-taking core: one round is agent one replying, then agent two
//! replying to it. The engine owns the message history, builds each agent's
//! system-plus-context payload under the active [`ContextPolicy`], and commits
//! a round to the history only after both calls succeed, so a failed round
//! never leaves a half-written state behind.

use crate::llm_client::{ChatMessage, CompletionClient, CompletionError};
use crate::persona::{Persona, PersonaPair, Speaker};
use crate::session::ConversationTurn;
use std::str::FromStr;
use tracing::{debug, info};

/// Sampling temperature for in-conversation turns.
pub const TURN_TEMPERATURE: f32 = 0.9;
/// Advisory token ceiling for a single reply.
pub const TURN_MAX_TOKENS: u32 = 400;

/// The rule deciding what prior conversation an agent sees on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextPolicy {
    /// Every turn sees the full history so far.
    Shared,
    /// Each agent sees only the immediately preceding reply.
    #[default]
    Latest,
}

impl FromStr for ContextPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shared" => Ok(ContextPolicy::Shared),
            "latest" => Ok(ContextPolicy::Latest),
            other => Err(format!(
                "'{other}' is not a context policy (expected 'shared' or 'latest')"
            )),
        }
    }
}

/// Where a history entry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOrigin {
    /// The operator-selected starting topic.
    Seed,
    /// A committed raw reply from one of the agents.
    Reply(Speaker),
}

/// One role-tagged content unit of the conversational context. The text is
/// always the raw, unprefixed reply; name prefixes exist only in the
/// presentation layer and the session log.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub origin: HistoryOrigin,
    pub text: String,
}

/// The ordered conversational context. Grows monotonically, and only when a
/// round commits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageHistory {
    entries: Vec<HistoryEntry>,
}

impl MessageHistory {
    fn seeded(topic: String) -> Self {
        Self {
            entries: vec![HistoryEntry {
                origin: HistoryOrigin::Seed,
                text: topic,
            }],
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    fn push_reply(&mut self, speaker: Speaker, text: String) {
        self.entries.push(HistoryEntry {
            origin: HistoryOrigin::Reply(speaker),
            text,
        });
    }
}

/// A single round's completion call failed. The round is aborted as a whole
/// and may be replayed against unchanged history.
#[derive(Debug, thiserror::Error)]
#[error("turn for {speaker} failed: {source}")]
pub struct TurnError {
    pub speaker: Speaker,
    #[source]
    pub source: CompletionError,
}

struct StagedTurn {
    turn: ConversationTurn,
    raw: String,
}

/// Drives the alternating two-agent exchange.
pub struct ConversationEngine {
    personas: PersonaPair,
    policy: ContextPolicy,
    history: MessageHistory,
}

impl ConversationEngine {
    /// Creates an engine seeded with the selected starting topic.
    pub fn new(personas: PersonaPair, policy: ContextPolicy, opening_topic: String) -> Self {
        Self {
            personas,
            policy,
            history: MessageHistory::seeded(opening_topic),
        }
    }

    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    /// Executes one full round: agent one replies, then agent two replies to
    /// it. Both raw replies are committed to the history only after both
    /// calls succeed; on any failure the history is exactly as it was before
    /// the round, so a retry replays the identical round.
    pub async fn run_round(
        &mut self,
        client: &dyn CompletionClient,
    ) -> Result<(ConversationTurn, ConversationTurn), TurnError> {
        let first = self.take_turn(client, Speaker::Llm1, None).await?;
        let second = self
            .take_turn(client, Speaker::Llm2, Some(&first.raw))
            .await?;

        self.history.push_reply(Speaker::Llm1, first.raw);
        self.history.push_reply(Speaker::Llm2, second.raw);
        info!(history = self.history.len(), "round committed");

        Ok((first.turn, second.turn))
    }

    /// Builds one agent's payload, invokes the completion capability, and
    /// stages (but does not commit) the result. `staged` carries the first
    /// agent's not-yet-committed reply while the second agent takes its turn.
    async fn take_turn(
        &self,
        client: &dyn CompletionClient,
        speaker: Speaker,
        staged: Option<&str>,
    ) -> Result<StagedTurn, TurnError> {
        let persona = self.personas.speaker(speaker);
        let mut messages = vec![ChatMessage::system(embodiment_instruction(persona))];

        match self.policy {
            ContextPolicy::Shared => {
                messages.extend(
                    self.history
                        .entries()
                        .iter()
                        .map(|entry| ChatMessage::user(entry.text.clone())),
                );
                if let Some(text) = staged {
                    messages.push(ChatMessage::user(text));
                }
            }
            ContextPolicy::Latest => {
                let current = staged.or_else(|| self.history.latest().map(|e| e.text.as_str()));
                if let Some(text) = current {
                    messages.push(ChatMessage::user(text));
                }
            }
        }

        debug!(%speaker, payload = messages.len(), "requesting turn");
        let raw = client
            .complete(messages, TURN_TEMPERATURE, TURN_MAX_TOKENS)
            .await
            .map_err(|source| TurnError { speaker, source })?;

        let text = prefix_with_name(&persona.name, &raw);
        Ok(StagedTurn {
            turn: ConversationTurn { speaker, text },
            raw,
        })
    }
}

/// The fixed instruction template every turn starts from, with the persona's
/// full record interpolated as JSON.
fn embodiment_instruction(persona: &Persona) -> String {
    let record = serde_json::to_string(persona).unwrap_or_else(|_| persona.name.clone());
    format!(
        "Your task is to embody the following personality: {record}. Respond to the \
         latest message with an informative and engaging answer. Play your role, keep \
         the conversation going and be creative. Limit your response to no more than \
         80 words. Never say 'as an AI model', 'as a virtual assistant', 'as a \
         chatbot' or anything like that."
    )
}

/// Prefixes the reply with the speaker's name, unless the model already did.
fn prefix_with_name(name: &str, raw: &str) -> String {
    let trimmed = raw.trim_start();
    if trimmed.starts_with(name) {
        trimmed.to_string()
    } else {
        format!("{name}: {raw}")
    }
}
