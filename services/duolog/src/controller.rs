//! Session Controller
//!
//! Drives the interactive lifecycle: provision personas, provision prompts,
//! resolve the operator's topic selection, then loop rounds through the
//! conversation engine with retry/continue decisions, finishing with the
//! optional session-log persistence.

use anyhow::{Context, Result};
use duolog_core::engine::{ContextPolicy, ConversationEngine};
use duolog_core::llm_client::CompletionClient;
use duolog_core::provision::{PersonaProvisioner, PromptProvisioner};
use duolog_core::session::SessionLog;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::console::{self, Operator};

pub struct SessionController {
    client: Arc<dyn CompletionClient>,
    personas: Arc<dyn PersonaProvisioner>,
    prompts: Arc<dyn PromptProvisioner>,
    operator: Box<dyn Operator>,
    policy: ContextPolicy,
    log_path: PathBuf,
}

impl SessionController {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        personas: Arc<dyn PersonaProvisioner>,
        prompts: Arc<dyn PromptProvisioner>,
        operator: Box<dyn Operator>,
        policy: ContextPolicy,
        log_path: PathBuf,
    ) -> Self {
        Self {
            client,
            personas,
            prompts,
            operator,
            policy,
            log_path,
        }
    }

    /// Runs one full session and returns its log, whether or not it was
    /// persisted. Provisioning failures abort before any conversation state
    /// exists; prompts are never requested if personas failed.
    pub async fn run(&self) -> Result<SessionLog> {
        let personas = match self.personas.generate_personas(rand::random()).await {
            Ok(pair) => pair,
            Err(e) => {
                console::print_error("Failed to provision personas", &e);
                return Err(e).context("session setup aborted");
            }
        };
        console::print_personas(&personas);

        let prompts = match self.prompts.generate_prompts(rand::random()).await {
            Ok(set) => set,
            Err(e) => {
                console::print_error("Failed to provision starting prompts", &e);
                return Err(e).context("session setup aborted");
            }
        };
        console::print_prompts(&prompts);

        let index = self.operator.select_prompt().inspect_err(|e| {
            console::print_error("Invalid prompt selection", e);
        })?;
        let selected = match prompts.select(index) {
            Ok(prompt) => prompt.to_string(),
            Err(e) => {
                console::print_error("Invalid prompt selection", &e);
                return Err(e).context("session setup aborted");
            }
        };
        info!(index, prompt = %selected, "starting topic selected");

        let mut log = SessionLog::new(personas.clone(), prompts, selected.clone());
        let mut engine = ConversationEngine::new(personas, self.policy, selected);

        loop {
            match engine.run_round(self.client.as_ref()).await {
                Ok((first, second)) => {
                    console::print_turn(&first);
                    console::print_turn(&second);
                    log.push_round(first, second);

                    if self.operator.confirm("Do you want to continue the chat?")? {
                        continue;
                    }
                    if self.operator.confirm("Do you want to save the chat logs?")? {
                        log.save(&self.log_path)?;
                        println!("Session log written to {}", self.log_path.display());
                    }
                    break;
                }
                Err(e) => {
                    warn!(speaker = %e.speaker, "round aborted");
                    console::print_error("The round failed", &e);
                    if self
                        .operator
                        .confirm("There was an error processing the round. Retry?")?
                    {
                        // History is unchanged, so this replays the same round.
                        continue;
                    }
                    break;
                }
            }
        }

        info!(rounds = log.rounds(), "session ended");
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::MockOperator;
    use async_trait::async_trait;
    use duolog_core::llm_client::{ChatMessage, CompletionError};
    use duolog_core::persona::{Persona, PersonaPair};
    use duolog_core::prompts::PromptSet;
    use duolog_core::provision::ProvisionError;
    use mockall::mock;
    use std::sync::Mutex;

    mock! {
        Client {}

        #[async_trait]
        impl CompletionClient for Client {
            async fn complete(
                &self,
                messages: Vec<ChatMessage>,
                temperature: f32,
                max_tokens: u32,
            ) -> Result<String, CompletionError>;
        }
    }

    mock! {
        Personas {}

        #[async_trait]
        impl PersonaProvisioner for Personas {
            async fn generate_personas(&self, seed: u32) -> Result<PersonaPair, ProvisionError>;
        }
    }

    mock! {
        Prompts {}

        #[async_trait]
        impl PromptProvisioner for Prompts {
            async fn generate_prompts(&self, seed: u32) -> Result<PromptSet, ProvisionError>;
        }
    }

    fn persona(name: &str) -> Persona {
        Persona {
            name: name.to_string(),
            skillset: "s".to_string(),
            personality: "p".to_string(),
            description: "d".to_string(),
        }
    }

    fn ada_and_max() -> PersonaPair {
        PersonaPair {
            llm1: persona("Ada"),
            llm2: persona("Max"),
        }
    }

    fn three_prompts() -> PromptSet {
        PromptSet {
            prompt1: "p1".to_string(),
            prompt2: "p2".to_string(),
            prompt3: "p3".to_string(),
        }
    }

    fn working_provisioners() -> (MockPersonas, MockPrompts) {
        let mut personas = MockPersonas::new();
        personas
            .expect_generate_personas()
            .returning(|_| Ok(ada_and_max()));
        let mut prompts = MockPrompts::new();
        prompts
            .expect_generate_prompts()
            .returning(|_| Ok(three_prompts()));
        (personas, prompts)
    }

    fn scripted_client(replies: Vec<Result<String, CompletionError>>) -> MockClient {
        let replies = Mutex::new(replies.into_iter());
        let mut client = MockClient::new();
        client
            .expect_complete()
            .returning(move |_, _, _| replies.lock().unwrap().next().expect("unscripted call"));
        client
    }

    fn controller(
        client: MockClient,
        personas: MockPersonas,
        prompts: MockPrompts,
        operator: MockOperator,
        log_path: PathBuf,
    ) -> SessionController {
        SessionController::new(
            Arc::new(client),
            Arc::new(personas),
            Arc::new(prompts),
            Box::new(operator),
            ContextPolicy::Latest,
            log_path,
        )
    }

    #[tokio::test]
    async fn one_round_session_without_saving() {
        let (personas, prompts) = working_provisioners();
        let client = scripted_client(vec![
            Ok("an opening thought".to_string()),
            Ok("a considered response".to_string()),
        ]);

        let mut operator = MockOperator::new();
        operator.expect_select_prompt().returning(|| Ok(2));
        operator
            .expect_confirm()
            .withf(|q| q.contains("continue"))
            .returning(|_| Ok(false));
        operator
            .expect_confirm()
            .withf(|q| q.contains("save"))
            .returning(|_| Ok(false));

        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("chat_logs.json");
        let controller = controller(client, personas, prompts, operator, log_path.clone());

        let log = controller.run().await.unwrap();

        assert_eq!(log.selected_prompt, "p2");
        assert_eq!(log.conversation.len(), 2);
        assert!(log.conversation[0].text().starts_with("Ada:"));
        assert!(log.conversation[1].text().starts_with("Max:"));
        // Declined to save: nothing on disk.
        assert!(!log_path.exists());
    }

    #[tokio::test]
    async fn saving_persists_the_full_log() {
        let (personas, prompts) = working_provisioners();
        let client = scripted_client(vec![
            Ok("first".to_string()),
            Ok("second".to_string()),
        ]);

        let mut operator = MockOperator::new();
        operator.expect_select_prompt().returning(|| Ok(1));
        operator
            .expect_confirm()
            .withf(|q| q.contains("continue"))
            .returning(|_| Ok(false));
        operator
            .expect_confirm()
            .withf(|q| q.contains("save"))
            .returning(|_| Ok(true));

        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("chat_logs.json");
        let controller = controller(client, personas, prompts, operator, log_path.clone());

        let log = controller.run().await.unwrap();
        assert_eq!(log.rounds(), 1);

        let written: SessionLog =
            serde_json::from_str(&std::fs::read_to_string(&log_path).unwrap()).unwrap();
        assert_eq!(written, log);
    }

    #[tokio::test]
    async fn persona_failure_aborts_before_prompts_are_requested() {
        let mut personas = MockPersonas::new();
        personas.expect_generate_personas().returning(|_| {
            Err(ProvisionError::Completion(CompletionError::Service(
                "down".into(),
            )))
        });
        let mut prompts = MockPrompts::new();
        prompts.expect_generate_prompts().times(0);

        let mut client = MockClient::new();
        client.expect_complete().times(0);
        let mut operator = MockOperator::new();
        operator.expect_select_prompt().times(0);
        operator.expect_confirm().times(0);

        let dir = tempfile::tempdir().unwrap();
        let controller = controller(
            client,
            personas,
            prompts,
            operator,
            dir.path().join("chat_logs.json"),
        );

        assert!(controller.run().await.is_err());
    }

    #[tokio::test]
    async fn out_of_range_selection_is_fatal() {
        let (personas, prompts) = working_provisioners();
        let mut client = MockClient::new();
        client.expect_complete().times(0);

        let mut operator = MockOperator::new();
        operator.expect_select_prompt().returning(|| Ok(4));
        operator.expect_confirm().times(0);

        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("chat_logs.json");
        let controller = controller(client, personas, prompts, operator, log_path.clone());

        assert!(controller.run().await.is_err());
        assert!(!log_path.exists());
    }

    #[tokio::test]
    async fn declined_retry_ends_the_session_without_a_save_offer() {
        let (personas, prompts) = working_provisioners();
        let client = scripted_client(vec![Err(CompletionError::Timeout)]);

        let mut operator = MockOperator::new();
        operator.expect_select_prompt().returning(|| Ok(1));
        operator
            .expect_confirm()
            .withf(|q| q.contains("Retry"))
            .returning(|_| Ok(false));
        operator
            .expect_confirm()
            .withf(|q| q.contains("save"))
            .times(0);

        let dir = tempfile::tempdir().unwrap();
        let controller = controller(
            client,
            personas,
            prompts,
            operator,
            dir.path().join("chat_logs.json"),
        );

        let log = controller.run().await.unwrap();
        // The failed round contributed nothing.
        assert_eq!(log.conversation.len(), 0);
    }

    #[tokio::test]
    async fn retry_replays_the_round_and_recovers() {
        let (personas, prompts) = working_provisioners();
        let client = scripted_client(vec![
            Err(CompletionError::Service("503".into())),
            Ok("recovered first".to_string()),
            Ok("recovered second".to_string()),
        ]);

        let mut operator = MockOperator::new();
        operator.expect_select_prompt().returning(|| Ok(3));
        operator
            .expect_confirm()
            .withf(|q| q.contains("Retry"))
            .returning(|_| Ok(true));
        operator
            .expect_confirm()
            .withf(|q| q.contains("continue"))
            .returning(|_| Ok(false));
        operator
            .expect_confirm()
            .withf(|q| q.contains("save"))
            .returning(|_| Ok(false));

        let dir = tempfile::tempdir().unwrap();
        let controller = controller(
            client,
            personas,
            prompts,
            operator,
            dir.path().join("chat_logs.json"),
        );

        let log = controller.run().await.unwrap();
        assert_eq!(log.rounds(), 1);
        assert!(log.conversation[0].text().starts_with("Ada: recovered"));
    }
}
