//! Site API endpoint handlers.
//!
//! Each module corresponds to one website feature. Handlers are thin and
//! delegate to the chat, registration and booking modules.

pub mod chat;
pub mod dashboard;
pub mod health;
pub mod preferences;
pub mod registration;
pub mod site;
