//! Core domain + application logic for the social story generator.
//!
//! This crate is framework-agnostic. The chat backend (Slack) and the web front end
//! live in adapter crates and talk to the core through the `chat::port` trait.

pub mod chat;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod story;

pub use errors::{Error, Result};
