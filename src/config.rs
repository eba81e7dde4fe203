use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Sanoscribe";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Production endpoints, overridable per environment.
const DEFAULT_API_BASE_URL: &str = "https://sano-api-production.up.railway.app";
const DEFAULT_ANALYSIS_FN_URL: &str =
    "https://sano-api-production.up.railway.app/api/analyze";
const DEFAULT_DICTATION_WEBHOOK_URL: &str =
    "https://manolox9.app.n8n.cloud/webhook-test/sano-dictee";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Remote endpoints and local directories for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base of the transcribe / structure / relance / arrêt API.
    pub api_base_url: String,
    /// The analysis function (serverless chat-completion wrapper).
    pub analysis_fn_url: String,
    /// The voice-dictation webhook (alternate flow).
    pub dictation_webhook_url: String,
    /// Where generated PDFs are written.
    pub documents_dir: PathBuf,
    pub request_timeout_secs: u64,
}

impl Config {
    /// Build from `SANOSCRIBE_*` environment variables, falling back
    /// to the production defaults.
    pub fn from_env() -> Self {
        Self {
            api_base_url: env_or("SANOSCRIBE_API_URL", DEFAULT_API_BASE_URL),
            analysis_fn_url: env_or("SANOSCRIBE_ANALYSIS_URL", DEFAULT_ANALYSIS_FN_URL),
            dictation_webhook_url: env_or(
                "SANOSCRIBE_DICTATION_WEBHOOK_URL",
                DEFAULT_DICTATION_WEBHOOK_URL,
            ),
            documents_dir: documents_dir(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Where generated documents land: the user's download directory, or
/// a `Sanoscribe` folder under home when the platform has none.
pub fn documents_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "sanoscribe=info"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_production() {
        let config = Config::from_env();
        assert!(config.api_base_url.starts_with("https://"));
        assert!(config.dictation_webhook_url.contains("webhook"));
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn documents_dir_ends_with_app_name() {
        assert!(documents_dir().ends_with(APP_NAME));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}
