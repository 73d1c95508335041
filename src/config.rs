//! Runtime configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3001";
pub const DEFAULT_API_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_API_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SIMULATED_DELAY_MS: u64 = 1500;

/// Canned assistant answer used in simulated chat mode.
pub const DEFAULT_SIMULATED_REPLY: &str = "Thanks for sharing that. Here is a first pass at where your brand stands.\n\n\
Market: buyers in your category compare on price first and trust second, so a clear value story \
and visible reviews will move more people than a discount.\n\n\
Competitors: most of them lean on generic messaging. A specific promise about who you serve and \
what changes for them is the fastest way to stand apart.\n\n\
Next steps: list your three strongest proof points, pick one audience to lead with, and test two \
headlines against each other before spending on ads.";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(String),
}

/// How the conversation engine resolves assistant turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    /// Store each chat line as a record and acknowledge it.
    Delegated,
    /// Answer with a canned reply after a fixed delay. No network.
    Simulated,
}

impl std::str::FromStr for ChatMode {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "delegated" => Ok(Self::Delegated),
            "simulated" => Ok(Self::Simulated),
            _ => Err(ConfigError::Parse(format!(
                "unknown CHAT_MODE '{raw}' (expected 'delegated' or 'simulated')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    pub mode: ChatMode,
    pub simulated_delay_ms: u64,
    pub simulated_reply: String,
}

impl ChatConfig {
    #[must_use]
    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            mode: ChatMode::Simulated,
            simulated_delay_ms: DEFAULT_SIMULATED_DELAY_MS,
            simulated_reply: DEFAULT_SIMULATED_REPLY.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_url: String,
    pub timeouts: ApiTimeouts,
    pub chat: ChatConfig,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `RAILWAY_API_URL`: record service base URL, default `http://localhost:3001`
    /// - `API_REQUEST_TIMEOUT_SECS`: default 30
    /// - `API_CONNECT_TIMEOUT_SECS`: default 10
    /// - `CHAT_MODE`: `simulated` (default) or `delegated`
    /// - `CHAT_SIMULATED_DELAY_MS`: default 1500
    /// - `CHAT_SIMULATED_REPLY`: overrides the canned answer
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if `CHAT_MODE` is not recognized.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = std::env::var("RAILWAY_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let timeouts = ApiTimeouts {
            request_secs: env_parse("API_REQUEST_TIMEOUT_SECS", DEFAULT_API_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse("API_CONNECT_TIMEOUT_SECS", DEFAULT_API_CONNECT_TIMEOUT_SECS),
        };
        let mode = match std::env::var("CHAT_MODE") {
            Ok(raw) => raw.parse()?,
            Err(_) => ChatMode::Simulated,
        };
        let chat = ChatConfig {
            mode,
            simulated_delay_ms: env_parse("CHAT_SIMULATED_DELAY_MS", DEFAULT_SIMULATED_DELAY_MS),
            simulated_reply: std::env::var("CHAT_SIMULATED_REPLY").unwrap_or_else(|_| DEFAULT_SIMULATED_REPLY.to_owned()),
        };

        Ok(Self { api_url, timeouts, chat })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
