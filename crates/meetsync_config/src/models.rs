// --- File: crates/meetsync_config/src/models.rs ---

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8086,
        }
    }
}

// --- Database Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. sqlite:data/meetsync.db, loaded via MEETSYNC__DATABASE__URL
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

// --- Google Calendar Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GcalConfig {
    pub key_path: Option<String>,    // service account json
    pub calendar_id: Option<String>, // falls back to "primary"
}

// --- Working Hours Config ---
/// Weekly opening hours and slot shape.
///
/// `open_hours` maps a lower-case weekday abbreviation (`mon` .. `sun`) to a
/// list of `HH:MM-HH:MM` ranges in `time_zone`.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WorkingHoursConfig {
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default = "default_open_hours")]
    pub open_hours: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_slot_duration")]
    pub slot_duration_minutes: i64,
    #[serde(default)]
    pub buffer_minutes: i64,
    #[serde(default = "default_min_lead_time")]
    pub min_lead_time_minutes: i64,
    #[serde(default = "default_advance_days")]
    pub advance_days: i64,
    #[serde(default = "default_blackout_dates")]
    pub blackout_dates: Vec<String>, // YYYY-MM-DD
    #[serde(default = "default_capacity")]
    pub default_capacity: u32,
}

fn default_time_zone() -> String {
    "Asia/Seoul".to_string()
}

fn default_open_hours() -> BTreeMap<String, Vec<String>> {
    // Meetings start at 10:00, 14:00 and 16:00 on weekdays.
    let ranges = vec![
        "10:00-11:00".to_string(),
        "14:00-15:00".to_string(),
        "16:00-17:00".to_string(),
    ];
    ["mon", "tue", "wed", "thu", "fri"]
        .iter()
        .map(|day| (day.to_string(), ranges.clone()))
        .collect()
}

fn default_slot_duration() -> i64 {
    60
}

fn default_min_lead_time() -> i64 {
    120
}

fn default_advance_days() -> i64 {
    30
}

fn default_blackout_dates() -> Vec<String> {
    [
        "2025-01-01", "2025-01-28", "2025-01-29", "2025-01-30", "2025-03-01", "2025-03-03",
        "2025-05-05", "2025-05-06", "2025-06-06", "2025-08-15", "2025-09-06", "2025-09-07",
        "2025-09-08", "2025-09-09", "2025-10-03", "2025-10-09", "2025-12-25",
    ]
    .iter()
    .map(|d| d.to_string())
    .collect()
}

fn default_capacity() -> u32 {
    1
}

impl Default for WorkingHoursConfig {
    fn default() -> Self {
        Self {
            time_zone: default_time_zone(),
            open_hours: default_open_hours(),
            slot_duration_minutes: default_slot_duration(),
            buffer_minutes: 0,
            min_lead_time_minutes: default_min_lead_time(),
            advance_days: default_advance_days(),
            blackout_dates: default_blackout_dates(),
            default_capacity: default_capacity(),
        }
    }
}

// --- Proposal Config ---
// token_secret is normally "secret_from_env" -> PROPOSALS_TOKEN_SECRET
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProposalConfig {
    pub token_secret: String,
    #[serde(default = "default_ttl_hours")]
    pub default_ttl_hours: i64,
    pub booking_base_url: String,
}

fn default_ttl_hours() -> i64 {
    24 * 7
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            default_ttl_hours: default_ttl_hours(),
            booking_base_url: "http://localhost:3000/meetings/schedule".to_string(),
        }
    }
}

// --- Retry Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub factor: u32,
    pub attempt_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            factor: 2,
            attempt_timeout_ms: 10_000,
        }
    }
}

// --- Sync Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    pub reconcile_interval_secs: u64,
    pub stale_booking_minutes: i64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: 900,
            stale_booking_minutes: 15,
        }
    }
}

// --- Notifier Config ---
// resend_api_key is normally "secret_from_env" -> NOTIFIER_RESEND_API_KEY
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotifierConfig {
    pub resend_api_key: String,
    pub from_address: String,
    pub admin_address: Option<String>,
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_gcal: bool,
    #[serde(default)]
    pub use_notifier: bool,

    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub gcal: Option<GcalConfig>,
    #[serde(default)]
    pub working_hours: WorkingHoursConfig,
    #[serde(default)]
    pub proposals: ProposalConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub notifier: Option<NotifierConfig>,
}
