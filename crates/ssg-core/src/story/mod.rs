//! Child profile collected by the form and the prompt built from it.

pub mod profile;
pub mod prompt;

pub use profile::{ChildProfile, Gender};
pub use prompt::build_prompt;
