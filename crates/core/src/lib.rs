//! Core logic for duolog: the completion-client abstraction, the persona and
//! prompt data model with their provisioning services, the turn-taking
//! conversation engine, and the session log. Everything here is free of
//! terminal I/O; presentation and operator input live in the service crate.

pub mod engine;
pub mod llm_client;
pub mod persona;
pub mod prompts;
pub mod provision;
pub mod session;
