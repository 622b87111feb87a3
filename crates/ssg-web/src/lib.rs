//! Web front end (axum).
//!
//! Serves the story form and runs the `ssg-core` correlator flow for each
//! "Create Social Story" submission.

pub mod handlers;
pub mod page;
pub mod router;

pub use router::{router, serve, AppState};
