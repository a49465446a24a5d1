//! Typed accessors for the well-known storage keys outside the chat history.

use crate::config::{REGISTRATION_STATUS_KEY, THEME_KEY, USER_DATA_KEY};
use crate::models::{RegistrationStatus, Theme, UserData};

use super::LocalStore;

pub fn load_theme(store: &LocalStore) -> Theme {
    store.load(THEME_KEY, Theme::System)
}

pub fn save_theme(store: &LocalStore, theme: Theme) -> bool {
    store.save(THEME_KEY, &theme)
}

pub fn load_user_data(store: &LocalStore) -> Option<UserData> {
    store.load(USER_DATA_KEY, None)
}

pub fn load_registration_status(store: &LocalStore) -> RegistrationStatus {
    store.load(REGISTRATION_STATUS_KEY, RegistrationStatus::NotStarted)
}

/// Persist a finished onboarding. Both keys are written; returns `false` if either fails.
pub fn save_onboarding(store: &LocalStore, user: &UserData, status: RegistrationStatus) -> bool {
    let user_saved = store.save(USER_DATA_KEY, user);
    let status_saved = store.save(REGISTRATION_STATUS_KEY, &status);
    user_saved && status_saved
}
