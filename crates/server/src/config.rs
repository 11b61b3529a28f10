use serde::Deserialize;

/// Top-level configuration for the night-watch server, loaded from a TOML
/// file and then overlaid with `NIGHTWATCH_`-prefixed environment variables.
/// A missing config file is not an error; every field falls back to its
/// compiled-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NightwatchConfig {
    pub server_port: u16,
    pub server_host: String,
    /// Postgres connection string. Empty means "use the in-memory store".
    pub database_url: String,
    pub database_schema: String,
    pub database_table_prefix: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub otp_validity_minutes: i64,
    pub default_shift_duration_minutes: u32,
    pub outbox_batch_size: u32,
    pub outbox_max_retries: u32,
    pub outbox_tick_interval_secs: u64,
    pub outbox_backoff_base_secs: u64,
    pub outbox_backoff_max_secs: u64,
    pub reminder_lead_minutes: i64,
    pub early_checkin_window_minutes: i64,
    pub dev_mode: bool,
    pub vapid_public: String,
    pub vapid_private: String,
    pub vapid_subject: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
    pub materialize_horizon_days: i64,
    pub materialize_interval_secs: u64,
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Human,
    Json,
}

impl Default for NightwatchConfig {
    fn default() -> Self {
        Self {
            server_port: 8080,
            server_host: "127.0.0.1".to_owned(),
            database_url: String::new(),
            database_schema: "public".to_owned(),
            database_table_prefix: "nightwatch_".to_owned(),
            jwt_secret: String::new(),
            jwt_expiration_hours: 24,
            otp_validity_minutes: 10,
            default_shift_duration_minutes: 60,
            outbox_batch_size: 50,
            outbox_max_retries: 5,
            outbox_tick_interval_secs: 5,
            outbox_backoff_base_secs: 30,
            outbox_backoff_max_secs: 1800,
            reminder_lead_minutes: 60,
            early_checkin_window_minutes: 60,
            dev_mode: false,
            vapid_public: String::new(),
            vapid_private: String::new(),
            vapid_subject: "mailto:ops@example.com".to_owned(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_from_number: String::new(),
            materialize_horizon_days: 14,
            materialize_interval_secs: 3600,
            log_level: "info".to_owned(),
            log_format: LogFormat::Human,
        }
    }
}

impl NightwatchConfig {
    /// Loads config by merging, lowest to highest precedence: compiled-in
    /// defaults, an optional TOML file, then `NIGHTWATCH_`-prefixed
    /// environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, String> {
        let mut config: Self = match path {
            Some(path) if std::path::Path::new(path).exists() => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|e| format!("failed to read config file {path}: {e}"))?;
                toml::from_str(&contents).map_err(|e| format!("failed to parse config file {path}: {e}"))?
            }
            _ => {
                tracing::info!(path = ?path, "config file not found, using defaults");
                Self::default()
            }
        };
        config.apply_overrides(std::env::vars());
        Ok(config)
    }

    /// Overlays `NIGHTWATCH_`-prefixed entries from `vars` onto this config.
    /// Split out from [`Self::load`] so tests can inject a synthetic
    /// environment instead of mutating the process-wide one.
    fn apply_overrides(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        let overrides: std::collections::HashMap<String, String> = vars
            .into_iter()
            .filter_map(|(k, v)| k.strip_prefix("NIGHTWATCH_").map(|k| (k.to_owned(), v)))
            .collect();

        macro_rules! env_str {
            ($field:expr, $name:literal) => {
                if let Some(v) = overrides.get($name) {
                    $field = v.clone();
                }
            };
        }
        macro_rules! env_parse {
            ($field:expr, $name:literal) => {
                if let Some(v) = overrides.get($name) {
                    if let Ok(parsed) = v.parse() {
                        $field = parsed;
                    }
                }
            };
        }

        env_parse!(self.server_port, "SERVER_PORT");
        env_str!(self.server_host, "SERVER_HOST");
        env_str!(self.database_url, "DATABASE_URL");
        env_str!(self.jwt_secret, "JWT_SECRET");
        env_parse!(self.jwt_expiration_hours, "JWT_EXPIRATION_HOURS");
        env_parse!(self.otp_validity_minutes, "OTP_VALIDITY_MINUTES");
        env_parse!(self.dev_mode, "DEV_MODE");
        env_str!(self.vapid_public, "VAPID_PUBLIC");
        env_str!(self.vapid_private, "VAPID_PRIVATE");
        env_str!(self.vapid_subject, "VAPID_SUBJECT");
        env_str!(self.twilio_account_sid, "TWILIO_ACCOUNT_SID");
        env_str!(self.twilio_auth_token, "TWILIO_AUTH_TOKEN");
        env_str!(self.twilio_from_number, "TWILIO_FROM_NUMBER");
        env_str!(self.log_level, "LOG_LEVEL");
    }
}
