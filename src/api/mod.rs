//! Site API.
//!
//! HTTP surface for the marketing site and the chat widget: crawler
//! documents, per-visitor chat sessions, registration (one-shot or
//! stepwise), and the clinic dashboard. `site_router()` returns a `Router`
//! that can be mounted on any axum server; `server` runs it with graceful
//! shutdown.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::site_router;
pub use server::{start_site_server, ServerError, ServerSession, SiteServer};
pub use types::ApiContext;
