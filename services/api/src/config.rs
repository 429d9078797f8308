use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o";
const DEFAULT_PROMPTS_PATH: &str = "./prompts";

/// Why the service could not build its [`Config`] from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// The OpenAI-compatible chat backend that scripts the class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    pub fn api_base(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1/",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    /// Environment variable holding this provider's key.
    pub fn key_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "gemini" => Ok(Provider::Gemini),
            other => Err(format!("'{other}' is not one of 'openai', 'gemini'")),
        }
    }
}

/// Credentials for the sentiment / key-phrase service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextAnalyticsConfig {
    pub endpoint: String,
    pub key: String,
}

/// Everything the service reads from its environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    pub elevenlabs_api_key: Option<String>,
    pub text_analytics: Option<TextAnalyticsConfig>,
}

fn non_blank_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Reads `name` (or `default` when unset) and parses it, naming the variable
/// in the error.
fn parsed_var<T, E>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr<Err = E>,
    E: ToString,
{
    let raw = non_blank_var(name).unwrap_or_else(|| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

fn text_analytics_from_env() -> Result<Option<TextAnalyticsConfig>, ConfigError> {
    let endpoint = non_blank_var("TEXT_ANALYTICS_ENDPOINT");
    let key = non_blank_var("TEXT_ANALYTICS_KEY");
    match (endpoint, key) {
        (None, None) => Ok(None),
        (Some(endpoint), Some(key)) => Ok(Some(TextAnalyticsConfig {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key,
        })),
        (Some(_), None) => Err(ConfigError::MissingVar(
            "TEXT_ANALYTICS_KEY (TEXT_ANALYTICS_ENDPOINT is set)".to_string(),
        )),
        (None, Some(_)) => Err(ConfigError::MissingVar(
            "TEXT_ANALYTICS_ENDPOINT (TEXT_ANALYTICS_KEY is set)".to_string(),
        )),
    }
}

impl Config {
    /// Builds the configuration, reading a `.env` file first outside of tests.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let provider: Provider = parsed_var("LLM_PROVIDER", "openai")?;
        let log_level = parsed_var::<Level, _>("RUST_LOG", "INFO").map_err(|e| match e {
            ConfigError::InvalidValue(var, _) => {
                ConfigError::InvalidValue(var, "not a valid log level".to_string())
            }
            other => other,
        })?;

        let config = Self {
            bind_address: parsed_var("BIND_ADDRESS", DEFAULT_BIND_ADDRESS)?,
            provider,
            openai_api_key: non_blank_var("OPENAI_API_KEY"),
            gemini_api_key: non_blank_var("GEMINI_API_KEY"),
            chat_model: non_blank_var("CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            log_level,
            prompts_path: non_blank_var("PROMPTS_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_PROMPTS_PATH), PathBuf::from),
            elevenlabs_api_key: non_blank_var("ELEVENLABS_API_KEY"),
            text_analytics: text_analytics_from_env()?,
        };

        if config.provider_api_key().is_none() {
            return Err(ConfigError::MissingVar(format!(
                "{} (required by LLM_PROVIDER={:?})",
                provider.key_var(),
                provider
            )));
        }
        Ok(config)
    }

    /// The API key for the configured chat provider.
    pub fn provider_api_key(&self) -> Option<&str> {
        match self.provider {
            Provider::OpenAI => self.openai_api_key.as_deref(),
            Provider::Gemini => self.gemini_api_key.as_deref(),
        }
    }
}
