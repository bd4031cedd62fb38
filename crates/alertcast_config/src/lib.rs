//! Configuration for the alertcast notification dispatch service.
//!
//! Sources are layered in this order, later ones winning:
//!
//! 1. `config/default.*` (optional)
//! 2. `config/{RUN_ENV}.*` (optional, `RUN_ENV` defaults to `debug`)
//! 3. Environment variables prefixed with `ALERTCAST`, nested with `__`
//!    (e.g. `ALERTCAST__DEDUP__INTERVAL_MS=1000`)
//!
//! A `.env` file is loaded into the process environment once before the
//! environment layer is read.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use std::env;
use std::path::Path;
use tracing::debug;

pub mod models;
pub use models::*;

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "ALERTCAST";

/// Separator for nested configuration keys in environment variables.
pub const ENV_SEPARATOR: &str = "__";

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Loads the application configuration from `./config` and the environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let config_dir = env::var("ALERTCAST_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    load_config_from(Path::new(&config_dir))
}

/// Loads the application configuration from an explicit config directory.
pub fn load_config_from(config_dir: &Path) -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let default_path = config_dir.join("default");
    let env_path = config_dir.join(&run_env);

    debug!(
        default_path = %default_path.display(),
        env_path = %env_path.display(),
        "Loading configuration"
    );

    let builder = Config::builder()
        .add_source(File::with_name(&default_path.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_path.to_string_lossy()).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );

    builder.build()?.try_deserialize()
}

/// Ensures the dotenv file is loaded into the environment exactly once.
///
/// `DOTENV_OVERRIDE` selects a different file than `.env`. Returns the path
/// that was (or would have been) used.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path = env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_when_no_files_present() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(dir.path()).unwrap();

        assert!(config.dedup.enabled);
        assert_eq!(config.dedup.interval_ms, 0);
        assert_eq!(config.dedup.store_ttl_seconds, 120);
        assert_eq!(config.dedup.bloom_filter_insertion_count, 100);
        assert!(config.dedup.store_class.is_none());
        assert!(!config.use_push);
        assert!(config.firebase.is_none());
    }

    #[test]
    fn test_default_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("default.toml"),
            r#"
use_push = true

[dedup]
interval_ms = 1000
store_class = "in-memory"

[firebase]
project_id = "vehicle-app"
key_path = "/etc/alertcast/sa.json"

[sms]
region = "eu-west-1"
role_arn = "arn:aws:iam::123456789012:role/sms-sender"
"#,
        )
        .unwrap();

        let config = load_config_from(dir.path()).unwrap();

        assert!(config.use_push);
        assert_eq!(config.dedup.interval_ms, 1000);
        assert_eq!(config.dedup.store_class.as_deref(), Some("in-memory"));
        let firebase = config.firebase.unwrap();
        assert_eq!(firebase.project_id.as_deref(), Some("vehicle-app"));
        assert_eq!(firebase.api_endpoint, DEFAULT_FCM_ENDPOINT);
        assert_eq!(firebase.connect_timeout_ms, 5_000);
        let sms = config.sms.unwrap();
        assert_eq!(sms.session_duration_secs, 900);
        assert_eq!(sms.sms_type, "Transactional");
    }
}
