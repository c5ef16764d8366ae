//! Persona and Prompt Provisioning
//!
//! One-time setup calls made before the conversation loop starts: one
//! completion request inventing the two personas, one more producing the
//! three candidate starting topics. Both calls share the same two-stage
//! failure handling: the remote call itself can fail, or it can succeed with
//! a body that does not parse into the expected shape. Either way the whole
//! operation fails; there are no partial personas and no short prompt sets.

use crate::llm_client::{ChatMessage, CompletionClient, CompletionError};
use crate::persona::{Persona, PersonaPair};
use crate::prompts::PromptSet;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Sampling temperature for provisioning calls; high, to favor variety.
pub const PROVISION_TEMPERATURE: f32 = 0.9;
/// Advisory token ceiling for provisioning replies.
pub const PROVISION_MAX_TOKENS: u32 = 400;

/// A failed provisioning operation. Always fatal to session setup.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("unparseable provisioning response: {0}")]
    Malformed(String),
}

/// Defines the contract for any service that can invent two agent personas.
#[async_trait]
pub trait PersonaProvisioner: Send + Sync {
    /// Generates two distinct personas. The `seed` is an opaque uniqueness
    /// token threaded into the request content so repeated calls within a
    /// process are less likely to return cached or duplicate results.
    async fn generate_personas(&self, seed: u32) -> Result<PersonaPair, ProvisionError>;
}

/// Defines the contract for any service that can propose starting topics.
#[async_trait]
pub trait PromptProvisioner: Send + Sync {
    /// Generates exactly three candidate starting topics. Fewer than three
    /// recoverable entries is a total failure.
    async fn generate_prompts(&self, seed: u32) -> Result<PromptSet, ProvisionError>;
}

/// LLM-backed implementation of both provisioning contracts.
pub struct LlmProvisioner {
    client: Arc<dyn CompletionClient>,
}

impl LlmProvisioner {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }
}

/// Wire shape of the persona provisioning reply.
#[derive(Deserialize)]
struct PersonaReply {
    #[serde(rename = "LLM1")]
    llm1: Persona,
    #[serde(rename = "LLM2")]
    llm2: Persona,
}

#[async_trait]
impl PersonaProvisioner for LlmProvisioner {
    async fn generate_personas(&self, seed: u32) -> Result<PersonaPair, ProvisionError> {
        let instruction = format!(
            "Generate two distinct personalities with technical or historical skillsets \
             for two conversational agents. Respond with JSON containing two objects, \
             LLM1 and LLM2, each with the fields name, skillset, personality and \
             description. Uniqueness token: {seed}."
        );

        let body = self
            .client
            .complete(
                vec![ChatMessage::system(instruction)],
                PROVISION_TEMPERATURE,
                PROVISION_MAX_TOKENS,
            )
            .await?;

        let reply: PersonaReply = serde_json::from_str(strip_code_fences(&body))
            .map_err(|e| ProvisionError::Malformed(format!("expected two persona records: {e}")))?;

        let pair = PersonaPair {
            llm1: reply.llm1,
            llm2: reply.llm2,
        };
        if !pair.llm1.has_name() || !pair.llm2.has_name() {
            return Err(ProvisionError::Malformed(
                "persona record with an empty name".to_string(),
            ));
        }

        info!(llm1 = %pair.llm1.name, llm2 = %pair.llm2.name, "personas provisioned");
        Ok(pair)
    }
}

#[async_trait]
impl PromptProvisioner for LlmProvisioner {
    async fn generate_prompts(&self, seed: u32) -> Result<PromptSet, ProvisionError> {
        let instruction = format!(
            "Generate three distinct starting prompts for a conversation and return \
             them as a JSON object with the keys prompt1, prompt2 and prompt3. Each \
             prompt ought to present a real problem that needs solving. Uniqueness \
             token: {seed}."
        );

        let body = self
            .client
            .complete(
                vec![ChatMessage::system(instruction)],
                PROVISION_TEMPERATURE,
                PROVISION_MAX_TOKENS,
            )
            .await?;

        let prompts: PromptSet = serde_json::from_str(strip_code_fences(&body))
            .map_err(|e| ProvisionError::Malformed(format!("expected three prompts: {e}")))?;

        if prompts.entries().iter().any(|p| p.trim().is_empty()) {
            return Err(ProvisionError::Malformed(
                "prompt set contains an empty entry".to_string(),
            ));
        }

        info!("starting prompts provisioned");
        Ok(prompts)
    }
}

/// Models routinely wrap JSON bodies in a markdown code fence; tolerate that.
fn strip_code_fences(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
