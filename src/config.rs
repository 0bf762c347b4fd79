use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "ClinicVault";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// PBKDF2 rounds for staff passwords. Stored inside each hash, so raising it
/// only affects newly set passwords.
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 600_000;

const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
const DEFAULT_SWEEP_GRACE_SECS: u64 = 3600;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "clinicvault=info,clinicvault_lib=info,tower_http=info"
}

/// Default data directory: `<platform data dir>/ClinicVault/`.
/// Falls back to `./clinicvault-data` on systems without a data dir.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_NAME))
        .unwrap_or_else(|| PathBuf::from("clinicvault-data"))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Runtime configuration, loaded from `CLINICVAULT_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    /// Base URL used when resolving public blob URLs (no trailing slash).
    pub public_url: String,
    pub session_ttl: chrono::Duration,
    /// Minimum blob age before the orphan sweep may remove it.
    pub sweep_grace: Duration,
    pub max_upload_bytes: usize,
    pub password_iterations: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind: SocketAddr =
            parse_var("CLINICVAULT_BIND", None)?.unwrap_or_else(default_bind);
        let data_dir = env::var("CLINICVAULT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());
        let public_url = env::var("CLINICVAULT_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{bind}"))
            .trim_end_matches('/')
            .to_string();
        let ttl_hours: i64 =
            parse_var("CLINICVAULT_SESSION_TTL_HOURS", Some(DEFAULT_SESSION_TTL_HOURS))?
                .unwrap_or(DEFAULT_SESSION_TTL_HOURS);
        let session_ttl = session_ttl_from_hours(ttl_hours)?;
        let grace_secs: u64 =
            parse_var("CLINICVAULT_SWEEP_GRACE_SECS", Some(DEFAULT_SWEEP_GRACE_SECS))?
                .unwrap_or(DEFAULT_SWEEP_GRACE_SECS);
        let max_upload_bytes: usize =
            parse_var("CLINICVAULT_MAX_UPLOAD_BYTES", Some(DEFAULT_MAX_UPLOAD_BYTES))?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Self {
            bind,
            data_dir,
            public_url,
            session_ttl,
            sweep_grace: Duration::from_secs(grace_secs),
            max_upload_bytes,
            password_iterations: DEFAULT_PASSWORD_ITERATIONS,
        })
    }

    /// Configuration rooted at an explicit directory, with defaults elsewhere.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let bind = default_bind();
        Self {
            bind,
            data_dir: data_dir.into(),
            public_url: format!("http://{bind}"),
            session_ttl: chrono::Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            sweep_grace: Duration::from_secs(DEFAULT_SWEEP_GRACE_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            password_iterations: DEFAULT_PASSWORD_ITERATIONS,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("clinicvault.db")
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }
}

/// Positive hours that fit a `chrono::Duration`.
fn session_ttl_from_hours(hours: i64) -> Result<chrono::Duration, ConfigError> {
    chrono::Duration::try_hours(hours)
        .filter(|_| hours > 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: "CLINICVAULT_SESSION_TTL_HOURS",
            value: hours.to_string(),
        })
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8710))
}

fn parse_var<T: std::str::FromStr>(
    key: &'static str,
    default: Option<T>,
) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => {
            let parsed = value.trim().parse::<T>();
            parsed
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue { key, value })
        }
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_clinicvault() {
        assert_eq!(APP_NAME, "ClinicVault");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn paths_live_under_data_dir() {
        let config = AppConfig::with_data_dir("/tmp/cv-test");
        assert!(config.database_path().starts_with("/tmp/cv-test"));
        assert!(config.blob_dir().ends_with("blobs"));
    }

    #[test]
    fn default_data_dir_is_named_after_app() {
        assert!(default_data_dir().to_string_lossy().contains("ClinicVault")
            || default_data_dir().ends_with("clinicvault-data"));
    }

    #[test]
    fn parse_var_falls_back_to_default() {
        let value: Option<u64> =
            parse_var("CLINICVAULT_TEST_UNSET_VARIABLE", Some(7)).unwrap();
        assert_eq!(value, Some(7));
    }

    #[test]
    fn session_ttl_rejects_out_of_range_hours() {
        assert_eq!(session_ttl_from_hours(12).unwrap(), chrono::Duration::hours(12));
        for hours in [0, -1, i64::MAX] {
            assert!(
                matches!(session_ttl_from_hours(hours), Err(ConfigError::InvalidValue { .. })),
                "{hours}"
            );
        }
    }

    #[test]
    fn parse_var_rejects_garbage() {
        env::set_var("CLINICVAULT_TEST_GARBAGE_VALUE", "not-a-number");
        let result: Result<Option<u64>, _> = parse_var("CLINICVAULT_TEST_GARBAGE_VALUE", None);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        env::remove_var("CLINICVAULT_TEST_GARBAGE_VALUE");
    }
}
