//! Shared state for the site API router.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::error::ApiError;
use crate::chat::{ChatSession, SessionOptions};
use crate::config::{AppConfig, CHAT_MESSAGES_KEY};
use crate::dashboard::ActivityItem;
use crate::gateway::{GatewayError, WebhookGateway};
use crate::models::UserData;
use crate::registration::RegistrationWizard;
use crate::storage::{prefs, LocalStore};

/// Registrations kept for the dashboard feed.
const RECENT_REGISTRATIONS: usize = 20;

/// Visitors held in memory. Past this the least recently seen one is
/// dropped; its history stays in storage and is restored on its next request.
const MAX_ACTIVE_VISITORS: usize = 1024;

pub type VisitorChat = ChatSession<WebhookGateway>;
pub type SharedWizard = Arc<tokio::sync::Mutex<RegistrationWizard>>;

/// Identity of the browser tab making the request. Injected by
/// `middleware::visitor`.
#[derive(Debug, Clone)]
pub struct VisitorContext {
    pub session_id: String,
}

struct VisitorEntry {
    chat: Arc<VisitorChat>,
    wizard: SharedWizard,
    last_seen: u64,
}

/// Active visitors plus a logical clock ordering their last requests.
#[derive(Default)]
struct VisitorTable {
    entries: HashMap<String, VisitorEntry>,
    clock: u64,
}

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<AppConfig>,
    /// Site-wide store. Visitor data lives in `visitor_store` scopes of it.
    pub store: LocalStore,
    pub gateway: Arc<WebhookGateway>,
    visitors: Arc<Mutex<VisitorTable>>,
    registrations: Arc<Mutex<Vec<ActivityItem>>>,
}

impl ApiContext {
    pub fn new(config: AppConfig, store: LocalStore) -> Result<Self, GatewayError> {
        let gateway = Arc::new(WebhookGateway::new(&config)?);
        Ok(Self {
            config: Arc::new(config),
            store,
            gateway,
            visitors: Arc::new(Mutex::new(VisitorTable::default())),
            registrations: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// The visitor's own slice of the store, with a browser-sized quota.
    pub fn visitor_store(&self, session_id: &str) -> LocalStore {
        self.store.scoped(
            &format!("visitor.{session_id}"),
            Some(self.config.storage_quota_bytes),
        )
    }

    /// The visitor's chat session, opened for their stored user on first use.
    pub fn chat(&self, session_id: &str) -> Result<Arc<VisitorChat>, ApiError> {
        let mut visitors = self.lock_visitors()?;
        let entry = self.entry(&mut visitors, session_id);
        Ok(Arc::clone(&entry.chat))
    }

    /// The visitor's registration wizard, gated per configuration.
    pub fn wizard(&self, session_id: &str) -> Result<SharedWizard, ApiError> {
        let mut visitors = self.lock_visitors()?;
        let entry = self.entry(&mut visitors, session_id);
        Ok(Arc::clone(&entry.wizard))
    }

    /// Replace the visitor's chat with a fresh one greeting `user`. A reply
    /// still pending on the previous session is discarded.
    pub fn start_chat_for(
        &self,
        session_id: &str,
        user: UserData,
    ) -> Result<Arc<VisitorChat>, ApiError> {
        let mut visitors = self.lock_visitors()?;
        let entry = self.entry(&mut visitors, session_id);
        entry.chat.clear_chat()?;

        self.visitor_store(session_id).remove(CHAT_MESSAGES_KEY);
        let chat = self.open_chat(session_id, Some(user));
        entry.chat = Arc::clone(&chat);
        tracing::debug!(session_id, "Chat restarted for registered user");
        Ok(chat)
    }

    fn lock_visitors(&self) -> Result<MutexGuard<'_, VisitorTable>, ApiError> {
        self.visitors
            .lock()
            .map_err(|_| ApiError::Internal("visitor lock".into()))
    }

    fn entry<'a>(&self, visitors: &'a mut VisitorTable, session_id: &str) -> &'a mut VisitorEntry {
        let entries = &mut visitors.entries;
        if !entries.contains_key(session_id) && entries.len() >= MAX_ACTIVE_VISITORS {
            evict_least_recent(entries);
        }
        visitors.clock += 1;
        let entry = entries
            .entry(session_id.to_string())
            .or_insert_with(|| self.admit(session_id));
        entry.last_seen = visitors.clock;
        entry
    }

    fn admit(&self, session_id: &str) -> VisitorEntry {
        let user = prefs::load_user_data(&self.visitor_store(session_id));
        VisitorEntry {
            chat: self.open_chat(session_id, user),
            wizard: Arc::new(tokio::sync::Mutex::new(RegistrationWizard::new(
                self.config.step_gating,
            ))),
            last_seen: 0,
        }
    }

    fn open_chat(&self, session_id: &str, user: Option<UserData>) -> Arc<VisitorChat> {
        let options = SessionOptions {
            session_id: Some(session_id.to_string()),
            clinic_name: self.config.clinic.name.clone(),
            ..SessionOptions::default()
        };
        Arc::new(ChatSession::open(
            self.visitor_store(session_id),
            Arc::clone(&self.gateway),
            user,
            options,
        ))
    }

    /// Remember a registration for the activity feed, newest last.
    pub fn record_registration(&self, item: ActivityItem) {
        match self.registrations.lock() {
            Ok(mut items) => {
                items.push(item);
                if items.len() > RECENT_REGISTRATIONS {
                    let excess = items.len() - RECENT_REGISTRATIONS;
                    items.drain(..excess);
                }
            }
            Err(_) => tracing::warn!("Registration feed lock poisoned, entry dropped"),
        }
    }

    pub fn recent_registrations(&self) -> Vec<ActivityItem> {
        self.registrations
            .lock()
            .map(|items| items.clone())
            .unwrap_or_default()
    }
}

fn evict_least_recent(visitors: &mut HashMap<String, VisitorEntry>) {
    let oldest = visitors
        .iter()
        .min_by_key(|(_, entry)| entry.last_seen)
        .map(|(id, _)| id.clone());
    if let Some(id) = oldest {
        visitors.remove(&id);
        tracing::debug!(session_id = %id, "Idle visitor evicted");
    }
}
