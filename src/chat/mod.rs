//! Chat widget session: message history, booking sub-flow, reply dispatch.
//!
//! Builds on top of:
//! - `storage::LocalStore` (history persisted on every mutation)
//! - `gateway::ChatBackend` (webhook replies with keyword fallback)
//!
//! This module adds:
//! - `ChatSession`, the per-visitor engine with a non-reentrant send guard
//! - `booking`, the keyword-driven appointment mini-flow

pub mod booking;
pub mod session;

pub use booking::{BookingStage, BookingState};
pub use session::{welcome_message, ChatSession, IgnoreReason, SendOutcome, SessionOptions};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Chat session lock poisoned")]
    LockPoisoned,
}
