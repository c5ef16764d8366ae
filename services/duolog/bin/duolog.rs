//! Main Entrypoint for duolog
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and CLI overrides.
//! 2. Initializing logging.
//! 3. Constructing the completion client, provisioners and console operator.
//! 4. Running the interactive session controller.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use clap::Parser;
use duolog_core::engine::ContextPolicy;
use duolog_core::llm_client::{CompletionClient, OpenAICompatibleClient};
use duolog_core::provision::LlmProvisioner;
use duolog_service::{config::Config, console::ConsoleOperator, controller::SessionController};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Two personified agents talking it out over a chat-completion API.
#[derive(Parser, Debug)]
#[command(name = "duolog", version)]
struct Args {
    /// Context policy override: 'shared' or 'latest'.
    #[arg(long)]
    policy: Option<ContextPolicy>,

    /// Chat model override.
    #[arg(long)]
    model: Option<String>,

    /// Session log path override.
    #[arg(long)]
    log_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // --- 1. Load Configuration ---
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(policy) = args.policy {
        config.context_policy = policy;
    }
    if let Some(model) = args.model {
        config.chat_model = model;
    }
    if let Some(path) = args.log_path {
        config.log_path = path;
    }

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!(
        model = %config.chat_model,
        policy = ?config.context_policy,
        "Configuration loaded"
    );

    // --- 3. Initialize Shared Services ---
    let openai_config = OpenAIConfig::new()
        .with_api_key(&config.openai_api_key)
        .with_api_base(&config.api_base);
    let client: Arc<dyn CompletionClient> = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
    ));
    let provisioner = Arc::new(LlmProvisioner::new(client.clone()));

    // --- 4. Run the Session ---
    let controller = SessionController::new(
        client,
        provisioner.clone(),
        provisioner,
        Box::new(ConsoleOperator),
        config.context_policy,
        config.log_path.clone(),
    );
    controller.run().await?;

    info!("Session ended.");
    Ok(())
}
