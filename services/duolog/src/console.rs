//! Console presentation and operator input.
//!
//! All terminal output goes through here: the persona banner after
//! provisioning, the numbered prompt list, per-turn transcript lines with one
//! color per speaker, and failure explanations. Operator decisions come in
//! through the [`Operator`] trait so the session controller can be driven by
//! a scripted operator in tests.

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, Input};
use duolog_core::persona::{PersonaPair, Speaker};
use duolog_core::prompts::{PromptSet, SelectionError};
use duolog_core::session::ConversationTurn;

/// Blocking operator decisions, one line of input per decision point.
#[cfg_attr(test, mockall::automock)]
pub trait Operator: Send + Sync {
    /// Reads a 1-based prompt selection. Non-numeric input is fatal; range
    /// checking happens in `PromptSet::select`.
    fn select_prompt(&self) -> Result<usize>;

    /// Asks a yes/no question and returns the answer.
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// The real operator: line-based prompts on the controlling terminal.
pub struct ConsoleOperator;

impl Operator for ConsoleOperator {
    fn select_prompt(&self) -> Result<usize> {
        let raw: String = Input::new()
            .with_prompt("Enter the number of the selected prompt")
            .interact_text()?;
        let trimmed = raw.trim();
        trimmed
            .parse::<usize>()
            .map_err(|_| SelectionError::NotANumber(trimmed.to_string()).into())
    }

    fn confirm(&self, question: &str) -> Result<bool> {
        Ok(Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()?)
    }
}

/// Prints the provisioned personas.
pub fn print_personas(personas: &PersonaPair) {
    println!();
    println!("  {}", style("── Personas ──").dim());
    for persona in [&personas.llm1, &personas.llm2] {
        println!(
            "  {} {} — {}",
            style("•").dim(),
            style(&persona.name).cyan().bold(),
            persona.skillset
        );
        println!("    {}", style(&persona.description).dim());
    }
    println!();
}

/// Prints the numbered prompt choices in display order.
pub fn print_prompts(prompts: &PromptSet) {
    println!("Select one of the following prompts to start the conversation:");
    for (i, prompt) in prompts.entries().iter().enumerate() {
        println!("  {} {}", style(format!("{}.", i + 1)).bold(), prompt);
    }
}

/// Prints one transcript line, colored by speaker.
pub fn print_turn(turn: &ConversationTurn) {
    match turn.speaker {
        Speaker::Llm1 => println!("{}", style(&turn.text).red()),
        Speaker::Llm2 => println!("{}", style(&turn.text).blue()),
    }
}

/// Prints a failure explanation before control returns to the caller.
pub fn print_error(context: &str, err: &dyn std::fmt::Display) {
    eprintln!("{} {}: {}", style("✗").red().bold(), context, err);
}
