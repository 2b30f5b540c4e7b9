use crate::error::{AppError, Result};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DB_PATH: &str = "signals.db";
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub port: u16,
    /// Enables the companion bot (TELEGRAM_BOT_TOKEN). Unset = no bot.
    pub telegram_token: Option<String>,
    /// Launch link the bot sends on /start.
    pub webapp_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match var("PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| AppError::Config("PORT must be a valid port number".to_string()))?,
            None => DEFAULT_PORT,
        };

        // WEBAPP_URL wins; WEBAPP_DOMAIN is the bare public host name.
        let webapp_url = var("WEBAPP_URL")
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                var("WEBAPP_DOMAIN")
                    .filter(|s| !s.trim().is_empty())
                    .map(|d| format!("https://{}", d.trim()))
            })
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        Ok(Self {
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            db_path: var("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            port,
            telegram_token: var("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty()),
            webapp_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.db_path, DEFAULT_DB_PATH);
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.telegram_token.is_none());
        assert_eq!(cfg.webapp_url, "http://localhost:5000");
    }

    #[test]
    fn invalid_port_is_a_config_error() {
        assert!(matches!(config_from(&[("PORT", "http")]), Err(AppError::Config(_))));
    }

    #[test]
    fn webapp_url_precedence() {
        let cfg = config_from(&[("WEBAPP_DOMAIN", "signals.example.com")]).unwrap();
        assert_eq!(cfg.webapp_url, "https://signals.example.com");

        let cfg = config_from(&[
            ("WEBAPP_URL", "https://app.example.com/start"),
            ("WEBAPP_DOMAIN", "ignored.example.com"),
        ])
        .unwrap();
        assert_eq!(cfg.webapp_url, "https://app.example.com/start");

        let cfg = config_from(&[("PORT", "8080")]).unwrap();
        assert_eq!(cfg.webapp_url, "http://localhost:8080");
    }

    #[test]
    fn blank_token_disables_bot() {
        let cfg = config_from(&[("TELEGRAM_BOT_TOKEN", "  ")]).unwrap();
        assert!(cfg.telegram_token.is_none());
    }
}
