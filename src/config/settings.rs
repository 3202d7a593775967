// Configuration structs

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bind address for the HTTP transport
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Symbolic calendar name -> provider calendar id
    pub calendars: CalendarRoutes,

    /// Google Calendar credentials and endpoint
    pub google: GoogleConfig,

    /// SMS gateway
    pub sms: SmsConfig,

    /// Mail relay
    pub mail: MailConfig,

    /// Client directory databases
    pub directories: DirectoryConfig,

    /// Date-validation strictness toggles
    #[serde(default)]
    pub validation: ValidationPolicy,

    /// Fallback values for created calendar events
    #[serde(default)]
    pub event_defaults: EventDefaults,
}

fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

/// Static table resolving each calendar selector to a provider id.
///
/// Every entry is required: a missing id is a configuration error and the
/// loader rejects it at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarRoutes {
    pub service: String,
    pub formalities: String,
    pub product_meeting: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    /// Path to the persisted OAuth token file
    pub token_path: PathBuf,

    #[serde(default = "default_google_api_base")]
    pub api_base_url: String,
}

fn default_google_api_base() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    #[serde(default = "default_sms_base")]
    pub base_url: String,

    /// Overridable via SMSAPI_TOKEN
    #[serde(default)]
    pub token: String,
}

fn default_sms_base() -> String {
    "https://api.smsapi.pl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub base_url: String,

    /// Overridable via MAIL_API_TOKEN
    #[serde(default)]
    pub token: String,

    /// Sender address
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    pub sundea_path: PathBuf,
    pub optivendi_path: PathBuf,

    /// Upper bound on pooled connections per directory
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_max_connections() -> usize {
    5
}

/// Named toggles for the stricter date checks.
///
/// The relaxed defaults accept past start dates and inverted ranges and let
/// the calendar backend reject them; flipping these restores the strict
/// handler-side checks.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ValidationPolicy {
    #[serde(default)]
    pub reject_past_start: bool,

    #[serde(default)]
    pub reject_inverted_range: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventDefaults {
    pub location: String,
    pub description: String,
}

impl Default for EventDefaults {
    fn default() -> Self {
        Self {
            location: "ul. Wałowa 3, 43-100 Skoczów".to_string(),
            description: "Wydarzenie utworzone przez Agenta AI z telefonicznej obsługi klienta"
                .to_string(),
        }
    }
}
