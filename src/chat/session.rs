use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use super::booking::{BookingFlow, BookingState};
use super::ChatError;
use crate::config::{BOOKING_RESET_DELAY, CHAT_MESSAGES_KEY, LEGACY_CHAT_MESSAGES_KEY};
use crate::gateway::{ChatBackend, ChatRequest};
use crate::models::{ChatMessage, Sender, UserData};
use crate::storage::LocalStore;

/// Per-session knobs.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Reused when the caller already identifies the visitor; a fresh id otherwise.
    pub session_id: Option<String>,
    pub clinic_name: String,
    pub booking_reset_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            session_id: None,
            clinic_name: crate::config::ClinicProfile::default().name,
            booking_reset_delay: BOOKING_RESET_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyMessage,
    SendInFlight,
}

/// Result of `send_message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing was appended.
    Ignored(IgnoreReason),
    /// The bot reply that was appended after the user's message.
    Replied(ChatMessage),
    /// The session was cleared while the reply was in flight; it was dropped.
    Discarded,
}

struct SessionState {
    history: Vec<ChatMessage>,
    welcome: ChatMessage,
    is_loading: bool,
    booking: BookingFlow,
    /// Bumped by `clear_chat`; replies captured under an older value are stale.
    generation: u64,
}

/// One visitor's chat: history, booking sub-flow, and dispatch to the backend.
///
/// State lives behind a mutex that is never held across an await, so the
/// session can be shared via `Arc` and cleared while a reply is pending.
pub struct ChatSession<C: ChatBackend> {
    session_id: String,
    store: LocalStore,
    backend: Arc<C>,
    user: Option<UserData>,
    state: Mutex<SessionState>,
}

/// Greeting shown as the first message of every session.
pub fn welcome_message(user: Option<&UserData>, clinic_name: &str) -> ChatMessage {
    let greeting = match user.map(|u| u.first_name()).filter(|n| !n.is_empty()) {
        Some(name) => format!("Hi {name}!"),
        None => "Hi there!".to_string(),
    };
    ChatMessage::bot(format!(
        "{greeting} Welcome to {clinic_name}. I'm your virtual dental assistant. I can help you \
         book an appointment, answer questions about our treatments, or share our clinic hours \
         and location. How can I help you today?"
    ))
}

impl<C: ChatBackend> ChatSession<C> {
    /// Restore the persisted history (migrating the legacy key), or start a
    /// new one with a personalized welcome message.
    pub fn open(
        store: LocalStore,
        backend: Arc<C>,
        user: Option<UserData>,
        options: SessionOptions,
    ) -> Self {
        let mut history: Vec<ChatMessage> = store.load(CHAT_MESSAGES_KEY, Vec::new());

        if history.is_empty() && store.contains(LEGACY_CHAT_MESSAGES_KEY) {
            history = store.load(LEGACY_CHAT_MESSAGES_KEY, Vec::new());
            if !history.is_empty() && store.save(CHAT_MESSAGES_KEY, &history) {
                store.remove(LEGACY_CHAT_MESSAGES_KEY);
                tracing::info!(count = history.len(), "Migrated legacy chat history");
            }
        }

        let welcome = match history.first() {
            Some(first) if first.sender == Sender::Bot => first.clone(),
            _ => welcome_message(user.as_ref(), &options.clinic_name),
        };

        if history.is_empty() {
            history.push(welcome.clone());
            store.save(CHAT_MESSAGES_KEY, &history);
        }

        let session_id = options
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        tracing::debug!(
            session_id = %session_id,
            messages = history.len(),
            "Chat session opened"
        );

        Self {
            session_id,
            store,
            backend,
            user,
            state: Mutex::new(SessionState {
                history,
                welcome,
                is_loading: false,
                booking: BookingFlow::new(options.booking_reset_delay),
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionState>, ChatError> {
        self.state.lock().map_err(|_| ChatError::LockPoisoned)
    }

    fn persist(&self, history: &[ChatMessage]) {
        if !self.store.save(CHAT_MESSAGES_KEY, history) {
            tracing::warn!(session_id = %self.session_id, "Chat history not persisted");
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user(&self) -> Option<&UserData> {
        self.user.as_ref()
    }

    pub fn history(&self) -> Result<Vec<ChatMessage>, ChatError> {
        Ok(self.lock()?.history.clone())
    }

    pub fn is_loading(&self) -> Result<bool, ChatError> {
        Ok(self.lock()?.is_loading)
    }

    pub fn booking(&self) -> Result<BookingState, ChatError> {
        Ok(self.lock()?.booking.state(Instant::now()))
    }

    /// Append the user's text and the reply to it.
    ///
    /// Empty text and sends issued while another is in flight are dropped,
    /// not queued.
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SendOutcome::Ignored(IgnoreReason::EmptyMessage));
        }

        let (generation, booking_reply) = {
            let mut state = self.lock()?;
            if state.is_loading {
                tracing::debug!(session_id = %self.session_id, "Send ignored, reply in flight");
                return Ok(SendOutcome::Ignored(IgnoreReason::SendInFlight));
            }
            state.history.push(ChatMessage::user(text));
            self.persist(&state.history);
            state.is_loading = true;
            let reply = state.booking.intercept(text, Instant::now());
            (state.generation, reply)
        };

        let in_flight = InFlight {
            state: &self.state,
            generation,
            armed: true,
        };

        let reply = match booking_reply {
            Some(booking) if booking.is_confirmation => {
                ChatMessage::booking_confirmation(booking.content)
            }
            Some(booking) => ChatMessage::bot(booking.content),
            None => {
                let request = ChatRequest {
                    message: text.to_string(),
                    user: self.user.clone(),
                    session_id: self.session_id.clone(),
                };
                ChatMessage::bot(self.backend.reply(&request).await)
            }
        };

        in_flight.disarm();
        let mut state = self.lock()?;
        if state.generation != generation {
            tracing::debug!(
                session_id = %self.session_id,
                "Reply arrived after chat was cleared, discarding"
            );
            return Ok(SendOutcome::Discarded);
        }
        state.history.push(reply.clone());
        self.persist(&state.history);
        state.is_loading = false;
        Ok(SendOutcome::Replied(reply))
    }

    /// Reset to the welcome message and an idle booking flow. Any reply still
    /// in flight will be discarded.
    pub fn clear_chat(&self) -> Result<(), ChatError> {
        let mut state = self.lock()?;
        let welcome = state.welcome.clone();
        state.history = vec![welcome];
        state.booking.reset();
        state.is_loading = false;
        state.generation += 1;
        self.persist(&state.history);
        tracing::info!(session_id = %self.session_id, "Chat cleared");
        Ok(())
    }
}

/// Clears `is_loading` if a send is abandoned mid-await (its future dropped),
/// so the session does not stay busy forever.
struct InFlight<'a> {
    state: &'a Mutex<SessionState>,
    generation: u64,
    armed: bool,
}

impl InFlight<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut state) = self.state.lock() {
            if state.generation == self.generation {
                state.is_loading = false;
            }
        }
    }
}
