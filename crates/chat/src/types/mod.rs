//! Shared types for the chat crate

pub mod errors;

pub use errors::{ChatError, ChatResult};
