//! duolog service crate
//!
//! The interactive surface around `duolog-core`: environment configuration,
//! console presentation and operator input, and the session controller. The
//! `bin/duolog.rs` binary is a thin wrapper around this library.

pub mod config;
pub mod console;
pub mod controller;
