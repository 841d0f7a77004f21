use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::error;

pub const PRACTICUM_TOKEN: &str = "PRACTICUM_TOKEN";
pub const TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

/// Older names of the credential variables, read when the current name
/// is unset or empty.
const FALLBACK_NAMES: [(&str, &str); 3] = [
    (PRACTICUM_TOKEN, "P_TOKEN"),
    (TELEGRAM_TOKEN, "TG_TOKEN"),
    (TELEGRAM_CHAT_ID, "TG_ID"),
];

pub const DEFAULT_ENDPOINT: &str = "https://practicum.yandex.ru/api/user_api/homework_statuses/";
pub const DEFAULT_RETRY_PERIOD_SECS: u64 = 600;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_FILE: &str = "main.log";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .missing.join(", "))]
    Missing { missing: Vec<&'static str> },

    #[error("invalid value `{value}` for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    pub format: LogFormat,
    /// Log lines are appended here in addition to stdout. `None` when
    /// `WATCHER_LOG_FILE` is set to an empty value.
    pub file: Option<PathBuf>,
}

/// Validated, non-empty credentials. Only obtainable through
/// [`WatcherConfig::credentials`].
#[derive(Clone)]
pub struct Credentials {
    pub practicum_token: String,
    pub telegram_token: String,
    pub telegram_chat_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("practicum_token", &"<redacted>")
            .field("telegram_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .finish()
    }
}

/// Runtime configuration read from the process environment.
#[derive(Clone)]
pub struct WatcherConfig {
    pub practicum_token: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub endpoint: String,
    pub retry_period: Duration,
    pub request_timeout: Duration,
    pub telegram_api_url: Option<String>,
    pub logging: LogSettings,
}

impl WatcherConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let retry_period = parse_secs(&lookup, "RETRY_PERIOD_SECS", DEFAULT_RETRY_PERIOD_SECS)?;
        let request_timeout =
            parse_secs(&lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;

        let format = match lookup("WATCHER_LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") => LogFormat::Text,
            Some(v) if v.eq_ignore_ascii_case("text") => LogFormat::Text,
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "WATCHER_LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected `text` or `json`",
                })
            }
        };

        Ok(Self {
            practicum_token: credential(&lookup, PRACTICUM_TOKEN),
            telegram_token: credential(&lookup, TELEGRAM_TOKEN),
            telegram_chat_id: credential(&lookup, TELEGRAM_CHAT_ID),
            endpoint: non_empty(lookup("HOMEWORK_ENDPOINT"))
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            retry_period,
            request_timeout,
            telegram_api_url: non_empty(lookup("TELEGRAM_API_URL")),
            logging: LogSettings {
                format,
                file: match lookup("WATCHER_LOG_FILE") {
                    None => Some(PathBuf::from(DEFAULT_LOG_FILE)),
                    set => non_empty(set).map(PathBuf::from),
                },
            },
        })
    }

    /// Names of required variables that are absent or empty.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        [
            (PRACTICUM_TOKEN, &self.practicum_token),
            (TELEGRAM_TOKEN, &self.telegram_token),
            (TELEGRAM_CHAT_ID, &self.telegram_chat_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }

    /// Startup gate. Logs a critical diagnostic naming every missing
    /// variable; the caller must not start polling on `false`.
    pub fn validate(&self) -> bool {
        let missing = self.missing_credentials();
        if missing.is_empty() {
            return true;
        }
        error!(
            missing = ?missing,
            "CRITICAL: required environment variables are missing or empty"
        );
        false
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        match (
            non_empty(self.practicum_token.clone()),
            non_empty(self.telegram_token.clone()),
            non_empty(self.telegram_chat_id.clone()),
        ) {
            (Some(practicum_token), Some(telegram_token), Some(telegram_chat_id)) => {
                Ok(Credentials {
                    practicum_token,
                    telegram_token,
                    telegram_chat_id,
                })
            }
            _ => Err(ConfigError::Missing {
                missing: self.missing_credentials(),
            }),
        }
    }
}

fn credential<F>(lookup: &F, name: &'static str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let current = lookup(name);
    if current.as_deref().is_some_and(|v| !v.trim().is_empty()) {
        return current;
    }
    FALLBACK_NAMES
        .iter()
        .find(|(current_name, _)| *current_name == name)
        .and_then(|(_, fallback)| lookup(fallback))
        .or(current)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_secs<F>(lookup: &F, var: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = non_empty(lookup(var)) else {
        return Ok(Duration::from_secs(default));
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: "must be greater than zero",
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: "expected a whole number of seconds",
        }),
    }
}
