//! Webhook/API gateway: the boundary to the externally owned automation service.
//!
//! Chat replies never fail from the caller's point of view: any transport or
//! status error is replaced by a keyword-matched fallback reply. Registration
//! submission reports its result honestly and leaves the decision to proceed
//! to the caller.

pub mod fallback;
pub mod webhook;

pub use fallback::{FallbackResponder, FallbackTopic};
pub use webhook::WebhookGateway;

use std::future::Future;

use thiserror::Error;

use crate::models::{PatientRegistrationData, UserData};

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("No endpoint configured for {0}")]
    NotConfigured(&'static str),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Webhook returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Webhook returned an empty response")]
    EmptyResponse,

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else if e.is_connect() {
            GatewayError::Connection(e.to_string())
        } else if e.is_decode() {
            GatewayError::ResponseParsing(e.to_string())
        } else {
            GatewayError::HttpClient(e.to_string())
        }
    }
}

/// Registration submission failure, surfaced to the wizard's caller.
#[derive(Error, Debug)]
#[error("Registration submission failed: {0}")]
pub struct SubmissionError(#[from] pub GatewayError);

/// One chat turn forwarded to the conversational service.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
    pub user: Option<UserData>,
    pub session_id: String,
}

/// Produces the bot's reply for text the booking flow did not handle.
/// Implementations resolve to some text in every case.
pub trait ChatBackend: Send + Sync {
    fn reply(&self, request: &ChatRequest) -> impl Future<Output = String> + Send;
}

/// Delivers a finalized registration record.
pub trait RegistrationSubmitter: Send + Sync {
    fn submit(
        &self,
        data: &PatientRegistrationData,
    ) -> impl Future<Output = Result<(), SubmissionError>> + Send;
}
