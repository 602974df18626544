//! Configuration for the meetsync backend.
//!
//! Sources are layered: `config/default.*`, then `config/{RUN_ENV}.*`, then
//! environment variables (`MEETSYNC__SECTION__KEY`). String values equal to
//! `secret_from_env` are replaced by the environment variable named after the
//! value's path, e.g. `proposals.token_secret` -> `PROPOSALS_TOKEN_SECRET`.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::env;
use std::path::PathBuf;
use tracing::{debug, warn};

pub mod models;
pub use models::*;

/// Marker value that asks the loader to read a secret from the environment.
pub const SECRET_FROM_ENV: &str = "secret_from_env";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let prefix = env::var("PREFIX").unwrap_or_else(|_| "MEETSYNC".to_string());
    let config_dir = env::var("MEETSYNC_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config"));

    let default_path = config_dir.join("default");
    let env_path = config_dir.join(&run_env);
    debug!(
        "Loading config from {} and {}",
        default_path.display(),
        env_path.display()
    );

    let builder = Config::builder()
        .add_source(File::with_name(&default_path.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_path.to_string_lossy()).required(false))
        .add_source(
            Environment::with_prefix(&prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let raw_config: AppConfig = builder.build()?.try_deserialize()?;
    apply_env_overrides_from_marker(raw_config)
}

/// Recursively replaces all "secret_from_env" string values with environment variable values
fn inject_env_secrets(value: &mut Value) {
    fn walk(path: Vec<String>, obj: &mut Value) {
        match obj {
            Value::Object(map) => {
                for (k, v) in map.iter_mut() {
                    let mut new_path = path.clone();
                    new_path.push(k.to_string());
                    walk(new_path, v);
                }
            }
            Value::String(s) if s == SECRET_FROM_ENV => {
                let env_key = path.join("_").to_uppercase();
                match env::var(&env_key) {
                    Ok(env_val) => *obj = Value::String(env_val),
                    Err(_) => warn!("env var {} not found for secret_from_env", env_key),
                }
            }
            _ => {}
        }
    }

    walk(vec![], value);
}

/// Applies environment overrides based on "secret_from_env" markers in serialized config
pub fn apply_env_overrides_from_marker(config: AppConfig) -> Result<AppConfig, ConfigError> {
    let mut json = serde_json::to_value(&config)
        .map_err(|err| ConfigError::Message(format!("failed to serialize config: {err}")))?;
    inject_env_secrets(&mut json);
    serde_json::from_value(json)
        .map_err(|err| ConfigError::Message(format!("failed to rebuild config: {err}")))
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Loads the dotenv file once per process.
///
/// `DOTENV_OVERRIDE` wins over a first command line argument starting with
/// `.env`, which wins over the plain `.env` default. Returns the path used.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path_override = env::var("DOTENV_OVERRIDE").ok();
    let dotenv_path_arg = env::args().nth(1).filter(|s| s.starts_with(".env"));

    let dotenv_path = dotenv_path_override
        .or(dotenv_path_arg)
        .unwrap_or_else(|| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_weekday_meeting_hours() {
        let config = AppConfig::default();
        let hours = &config.working_hours;
        assert_eq!(hours.time_zone, "Asia/Seoul");
        assert_eq!(hours.slot_duration_minutes, 60);
        assert_eq!(hours.open_hours.len(), 5);
        assert!(!hours.open_hours.contains_key("sat"));
        assert_eq!(hours.open_hours["mon"].len(), 3);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 1_000);
    }

    #[test]
    fn secret_marker_is_replaced_from_environment() {
        env::set_var("PROPOSALS_TOKEN_SECRET", "s3cr3t-from-env");
        let mut config = AppConfig::default();
        config.proposals.token_secret = SECRET_FROM_ENV.to_string();

        let config = apply_env_overrides_from_marker(config).expect("config must round-trip");
        assert_eq!(config.proposals.token_secret, "s3cr3t-from-env");
    }

    #[test]
    fn missing_secret_keeps_marker() {
        let mut config = AppConfig::default();
        config.notifier = Some(NotifierConfig {
            resend_api_key: SECRET_FROM_ENV.to_string(),
            from_address: "meetings@example.com".to_string(),
            admin_address: None,
        });
        env::remove_var("NOTIFIER_RESEND_API_KEY");

        let config = apply_env_overrides_from_marker(config).expect("config must round-trip");
        let notifier = config.notifier.expect("notifier section kept");
        assert_eq!(notifier.resend_api_key, SECRET_FROM_ENV);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let raw = r#"
            use_gcal = true

            [server]
            host = "0.0.0.0"
            port = 9000

            [working_hours]
            time_zone = "Europe/Zurich"
            slot_duration_minutes = 30
        "#;
        let config: AppConfig = toml::from_str(raw).expect("valid toml");
        assert!(config.use_gcal);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.working_hours.time_zone, "Europe/Zurich");
        assert_eq!(config.working_hours.slot_duration_minutes, 30);
        assert_eq!(config.working_hours.min_lead_time_minutes, 120);
        assert_eq!(config.sync.reconcile_interval_secs, 900);
    }
}
