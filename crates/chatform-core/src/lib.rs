//! Core types and error definitions for the Chatform session engine.
//!
//! This crate provides the foundational types shared across all Chatform
//! crates: error handling and the conversation message model.
//!
//! # Main types
//!
//! - [`ChatformError`] — Unified error enum for all Chatform subsystems.
//! - [`ChatformResult`] — Convenience alias for `Result<T, ChatformError>`.
//! - [`Role`] — Message role (user, bot, error).
//! - [`Message`] — A single finalized turn within a conversation.

/// Error types for the Chatform subsystems.
pub mod error;
/// Conversation message types.
pub mod message;

pub use error::{ChatformError, ChatformResult};
pub use message::{Message, Role};
