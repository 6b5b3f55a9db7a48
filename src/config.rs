use std::env;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::ConfigError;
use crate::session::configuration::{validate_temperature, DEFAULT_MODEL, DEFAULT_SYSTEM_MESSAGE, DEFAULT_TEMPERATURE};
use crate::session::{Configuration, ContextWindow, ModelCatalog};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const BASE_URL_VAR: &str = "LMCHAT_BASE_URL";
pub const MODEL_VAR: &str = "LMCHAT_MODEL";
pub const MODELS_VAR: &str = "LMCHAT_MODELS";
pub const TEMPERATURE_VAR: &str = "LMCHAT_TEMPERATURE";
pub const SYSTEM_MESSAGE_VAR: &str = "LMCHAT_SYSTEM_MESSAGE";
pub const TIMEOUT_VAR: &str = "LMCHAT_TIMEOUT_SECS";
pub const STREAMING_VAR: &str = "LMCHAT_STREAMING";
pub const MAX_CONTEXT_MESSAGES_VAR: &str = "LMCHAT_MAX_CONTEXT_MESSAGES";
pub const MAX_CONTEXT_CHARS_VAR: &str = "LMCHAT_MAX_CONTEXT_CHARS";

pub const DEFAULT_BASE_URL: &str = "http://localhost:1234";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub base_url: String,
    pub session: Configuration,
    pub models: Vec<String>,
    pub timeout: Duration,
    pub streaming: bool,
    pub context_window: ContextWindow,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Builds the configuration from `lookup`, which returns the raw value of
    /// a variable. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get(API_KEY_VAR).ok_or(ConfigError::Missing { var: API_KEY_VAR })?;

        let base_url = get(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        validate_url(&base_url)?;

        let temperature = match get(TEMPERATURE_VAR) {
            Some(raw) => {
                let value = parse::<f32>(TEMPERATURE_VAR, &raw)?;
                validate_temperature(value).map_err(|e| ConfigError::Invalid {
                    var: TEMPERATURE_VAR,
                    reason: e.to_string(),
                })?
            }
            None => DEFAULT_TEMPERATURE,
        };

        let session = Configuration {
            model: get(MODEL_VAR).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature,
            system_message: get(SYSTEM_MESSAGE_VAR).unwrap_or_else(|| DEFAULT_SYSTEM_MESSAGE.to_string()),
        };

        let models = get(MODELS_VAR)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let timeout = match get(TIMEOUT_VAR) {
            Some(raw) => Duration::from_secs(parse(TIMEOUT_VAR, &raw)?),
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let streaming = match get(STREAMING_VAR) {
            Some(raw) => parse_bool(STREAMING_VAR, &raw)?,
            None => true,
        };

        let context_window = ContextWindow {
            max_messages: get(MAX_CONTEXT_MESSAGES_VAR)
                .map(|raw| parse(MAX_CONTEXT_MESSAGES_VAR, &raw))
                .transpose()?,
            max_chars: get(MAX_CONTEXT_CHARS_VAR)
                .map(|raw| parse(MAX_CONTEXT_CHARS_VAR, &raw))
                .transpose()?,
        };

        debug!(base_url = %base_url, model = %session.model, "Loaded configuration");

        Ok(Self {
            api_key,
            base_url,
            session,
            models,
            timeout,
            streaming,
            context_window,
        })
    }

    /// The default model, any extra models, and the configured model.
    pub fn catalog(&self) -> ModelCatalog {
        let mut catalog = ModelCatalog::default();
        for model in &self.models {
            catalog.insert(model.as_str());
        }
        catalog.insert(self.session.model.as_str());
        catalog
    }
}

pub fn validate_url(raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        var: BASE_URL_VAR,
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid(format!("'{raw}' must be an http(s) URL with a host")));
    }
    Ok(())
}

fn parse<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: format!("'{raw}': {e}"),
    })
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            reason: format!("'{raw}' is not a boolean"),
        }),
    }
}
