//! Chat widget endpoints. Each acts on the session named by the caller's
//! `X-Session-Id`.
//!
//! - `POST /api/chat/send`: send a message, returns the bot reply
//! - `GET /api/chat/messages`: full history plus loading and booking state
//! - `POST /api/chat/clear`: reset the conversation to the welcome message

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, VisitorContext};
use crate::chat::{BookingState, IgnoreReason, SendOutcome};
use crate::models::ChatMessage;

const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Deserialize)]
pub struct ChatSendRequest {
    pub message: String,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChatSendResponse {
    Replied { reply: ChatMessage },
    Ignored { reason: &'static str },
    Discarded,
}

impl From<SendOutcome> for ChatSendResponse {
    fn from(outcome: SendOutcome) -> Self {
        match outcome {
            SendOutcome::Replied(reply) => ChatSendResponse::Replied { reply },
            SendOutcome::Ignored(IgnoreReason::EmptyMessage) => ChatSendResponse::Ignored {
                reason: "empty_message",
            },
            SendOutcome::Ignored(IgnoreReason::SendInFlight) => ChatSendResponse::Ignored {
                reason: "send_in_flight",
            },
            SendOutcome::Discarded => ChatSendResponse::Discarded,
        }
    }
}

#[derive(Serialize)]
pub struct ChatHistoryResponse {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    pub is_loading: bool,
    pub booking: BookingState,
}

/// `POST /api/chat/send`
pub async fn send(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<VisitorContext>,
    Json(req): Json<ChatSendRequest>,
) -> Result<Json<ChatSendResponse>, ApiError> {
    if req.message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Message too long (max {MAX_MESSAGE_CHARS} chars)"
        )));
    }

    let chat = ctx.chat(&visitor.session_id)?;
    let outcome = chat.send_message(&req.message).await?;
    Ok(Json(outcome.into()))
}

/// `GET /api/chat/messages`
pub async fn messages(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<VisitorContext>,
) -> Result<Json<ChatHistoryResponse>, ApiError> {
    let chat = ctx.chat(&visitor.session_id)?;
    Ok(Json(ChatHistoryResponse {
        session_id: chat.session_id().to_string(),
        messages: chat.history()?,
        is_loading: chat.is_loading()?,
        booking: chat.booking()?,
    }))
}

/// `POST /api/chat/clear`
pub async fn clear(
    State(ctx): State<ApiContext>,
    Extension(visitor): Extension<VisitorContext>,
) -> Result<Json<ChatHistoryResponse>, ApiError> {
    ctx.chat(&visitor.session_id)?.clear_chat()?;
    messages(State(ctx), Extension(visitor)).await
}
