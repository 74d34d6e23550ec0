use std::env;
use std::path::PathBuf;

use crate::errors::IntakeError;

pub const GMAIL_AUTHORIZATION_ENV: &str = "GMAIL_AUTHORIZATION";
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com";
pub const DEFAULT_MAX_RESULTS: u32 = 50;
pub const DEFAULT_LOOKBACK_DAYS: u32 = 14;
pub const DEFAULT_SEARCH_QUERY: &str = "in:inbox has:attachment filename:pdf";

#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Bearer token for the Gmail API
    pub gmail_authorization: Option<String>,
    /// Gmail REST base URL (overridable for tests and proxies)
    pub gmail_api_base: String,
    /// Where downloaded attachments are written before being read back
    pub download_dir: PathBuf,
    /// Page limit handed to the mail listing
    pub max_results: u32,
    pub lookback_days: u32,
    pub search_query: String,
    /// When set, converted markdown is kept here as well
    pub converted_dir: Option<PathBuf>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            gmail_authorization: None,
            gmail_api_base: DEFAULT_GMAIL_API_BASE.to_string(),
            download_dir: default_download_dir(),
            max_results: DEFAULT_MAX_RESULTS,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            search_query: DEFAULT_SEARCH_QUERY.to_string(),
            converted_dir: None,
        }
    }
}

impl IntakeConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            gmail_authorization: non_empty_env(GMAIL_AUTHORIZATION_ENV),
            gmail_api_base: non_empty_env("GMAIL_API_BASE_URL").unwrap_or(defaults.gmail_api_base),
            download_dir: non_empty_env("INVOICE_DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            max_results: non_empty_env("GMAIL_MAX_RESULTS")
                .and_then(|value| value.parse::<u32>().ok())
                .filter(|value| *value > 0)
                .unwrap_or(defaults.max_results),
            lookback_days: non_empty_env("GMAIL_SEARCH_DAYS")
                .and_then(|value| value.parse::<u32>().ok())
                .unwrap_or(defaults.lookback_days),
            search_query: non_empty_env("GMAIL_SEARCH_QUERY").unwrap_or(defaults.search_query),
            converted_dir: non_empty_env("INVOICE_CONVERTED_DIR").map(PathBuf::from),
        }
    }

    pub fn with_gmail_authorization(mut self, token: impl Into<String>) -> Self {
        self.gmail_authorization = Some(token.into());
        self
    }

    pub fn require_gmail_authorization(&self) -> Result<&str, IntakeError> {
        self.gmail_authorization
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(IntakeError::MissingConfig(GMAIL_AUTHORIZATION_ENV))
    }
}

fn default_download_dir() -> PathBuf {
    env::temp_dir().join("invoice_intake")
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_config_error() {
        let err = IntakeConfig::default()
            .require_gmail_authorization()
            .unwrap_err();
        assert!(matches!(err, IntakeError::MissingConfig(GMAIL_AUTHORIZATION_ENV)));
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let config = IntakeConfig::default().with_gmail_authorization("  ");
        assert!(config.require_gmail_authorization().is_err());
    }

    #[test]
    fn defaults_match_inbox_search() {
        let config = IntakeConfig::default();
        assert_eq!(config.max_results, 50);
        assert_eq!(config.lookback_days, 14);
        assert!(config.download_dir.ends_with("invoice_intake"));
    }
}
