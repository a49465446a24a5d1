use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::registration::StepGating;

/// Application-level constants
pub const APP_NAME: &str = "Kraftodent";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Storage keys shared with the website's local storage layout.
pub const CHAT_MESSAGES_KEY: &str = "kraftodent_chat_messages";
pub const LEGACY_CHAT_MESSAGES_KEY: &str = "kraftodentChatMessages";
pub const THEME_KEY: &str = "kraftodent-theme";
pub const USER_DATA_KEY: &str = "kraftodent_user_data";
pub const REGISTRATION_STATUS_KEY: &str = "kraftodent_registration_status";

/// How long a booking confirmation stays visible before the flow resets.
pub const BOOKING_RESET_DELAY: Duration = Duration::from_millis(2000);

/// Browser local storage budget; the file backend enforces the same quota.
pub const DEFAULT_STORAGE_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
const DEFAULT_SITE_URL: &str = "https://kraftodent.com";
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 30;

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,kraftodent=debug,kraftodent_lib=debug"
    } else {
        "info"
    }
}

/// Get the application data directory
/// ~/Kraftodent/ by default. `AppConfig::from_lookup` applies `KRAFTODENT_DATA_DIR`.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Directory backing the local key/value store.
pub fn storage_dir() -> PathBuf {
    app_data_dir().join("storage")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Contact details quoted in fallback replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicProfile {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub hours: String,
}

impl Default for ClinicProfile {
    fn default() -> Self {
        Self {
            name: "Kraftodent Dental Care".into(),
            phone: "+91 98765 43210".into(),
            address: "2nd Floor, Lakeview Plaza, Indiranagar, Bengaluru 560038".into(),
            hours: "Monday to Saturday, 9:00 AM to 8:00 PM".into(),
        }
    }
}

/// Runtime configuration. External endpoints are always injected here,
/// never hardcoded in the gateway.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub site_url: String,
    pub chat_webhook_url: Option<String>,
    pub registration_webhook_url: Option<String>,
    pub bookings_url: Option<String>,
    pub webhook_timeout: Duration,
    pub step_gating: StepGating,
    pub storage_dir: PathBuf,
    pub storage_quota_bytes: u64,
    pub clinic: ClinicProfile,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            site_url: DEFAULT_SITE_URL.into(),
            chat_webhook_url: None,
            registration_webhook_url: None,
            bookings_url: None,
            webhook_timeout: Duration::from_secs(DEFAULT_WEBHOOK_TIMEOUT_SECS),
            step_gating: StepGating::Ungated,
            storage_dir: storage_dir(),
            storage_quota_bytes: DEFAULT_STORAGE_QUOTA_BYTES,
            clinic: ClinicProfile::default(),
        }
    }
}

impl AppConfig {
    /// Build configuration from `KRAFTODENT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind = get("KRAFTODENT_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        config.bind_addr = bind.parse().map_err(|_| ConfigError::InvalidValue {
            var: "KRAFTODENT_BIND_ADDR",
            value: bind.clone(),
        })?;

        if let Some(url) = get("KRAFTODENT_SITE_URL") {
            config.site_url = url.trim_end_matches('/').to_string();
        }
        config.chat_webhook_url = get("KRAFTODENT_CHAT_WEBHOOK_URL");
        config.registration_webhook_url = get("KRAFTODENT_REGISTRATION_WEBHOOK_URL");
        config.bookings_url = get("KRAFTODENT_BOOKINGS_URL");

        if let Some(secs) = get("KRAFTODENT_WEBHOOK_TIMEOUT_SECS") {
            let parsed: u64 = secs.parse().map_err(|_| ConfigError::InvalidValue {
                var: "KRAFTODENT_WEBHOOK_TIMEOUT_SECS",
                value: secs.clone(),
            })?;
            config.webhook_timeout = Duration::from_secs(parsed);
        }

        if let Some(flag) = get("KRAFTODENT_GATE_REGISTRATION_STEPS") {
            config.step_gating = match flag.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => StepGating::Gated,
                "0" | "false" | "no" => StepGating::Ungated,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "KRAFTODENT_GATE_REGISTRATION_STEPS",
                        value: flag,
                    })
                }
            };
        }

        if let Some(dir) = get("KRAFTODENT_DATA_DIR") {
            config.storage_dir = PathBuf::from(dir).join("storage");
        }
        if let Some(name) = get("KRAFTODENT_CLINIC_NAME") {
            config.clinic.name = name;
        }
        if let Some(phone) = get("KRAFTODENT_CLINIC_PHONE") {
            config.clinic.phone = phone;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn app_name_is_kraftodent() {
        assert_eq!(APP_NAME, "Kraftodent");
    }

    #[test]
    fn defaults_without_env() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.bind_addr.port(), 8787);
        assert!(config.chat_webhook_url.is_none());
        assert_eq!(config.step_gating, StepGating::Ungated);
        assert_eq!(config.webhook_timeout, Duration::from_secs(30));
        assert_eq!(config.storage_quota_bytes, DEFAULT_STORAGE_QUOTA_BYTES);
    }

    #[test]
    fn env_overrides_endpoints_and_gating() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("KRAFTODENT_CHAT_WEBHOOK_URL", "https://hooks.example.com/chat"),
            ("KRAFTODENT_SITE_URL", "https://demo.example.com/"),
            ("KRAFTODENT_GATE_REGISTRATION_STEPS", "true"),
            ("KRAFTODENT_WEBHOOK_TIMEOUT_SECS", "5"),
            ("KRAFTODENT_DATA_DIR", "/tmp/kraft"),
        ]))
        .unwrap();

        assert_eq!(
            config.chat_webhook_url.as_deref(),
            Some("https://hooks.example.com/chat")
        );
        assert_eq!(config.site_url, "https://demo.example.com");
        assert_eq!(config.step_gating, StepGating::Gated);
        assert_eq!(config.webhook_timeout, Duration::from_secs(5));
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/kraft/storage"));
    }

    #[test]
    fn blank_values_are_ignored() {
        let config =
            AppConfig::from_lookup(lookup_from(&[("KRAFTODENT_CHAT_WEBHOOK_URL", "  ")])).unwrap();
        assert!(config.chat_webhook_url.is_none());
    }

    #[test]
    fn invalid_bind_addr_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("KRAFTODENT_BIND_ADDR", "nope")]))
            .unwrap_err();
        assert!(err.to_string().contains("KRAFTODENT_BIND_ADDR"));
    }

    #[test]
    fn invalid_gating_flag_rejected() {
        let result =
            AppConfig::from_lookup(lookup_from(&[("KRAFTODENT_GATE_REGISTRATION_STEPS", "maybe")]));
        assert!(result.is_err());
    }

    #[test]
    fn data_dir_comes_only_from_lookup() {
        assert_eq!(AppConfig::default().storage_dir, storage_dir());
        let unset = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(unset.storage_dir, storage_dir());

        let set =
            AppConfig::from_lookup(lookup_from(&[("KRAFTODENT_DATA_DIR", "/srv/kd")])).unwrap();
        assert_eq!(set.storage_dir, PathBuf::from("/srv/kd/storage"));
        assert_ne!(set.storage_dir, AppConfig::default().storage_dir);
    }

    #[test]
    fn storage_dir_under_app_data() {
        assert!(storage_dir().starts_with(app_data_dir()));
        assert!(storage_dir().ends_with("storage"));
    }
}
