use thiserror::Error;

/// Rejected input or configuration. Raised before any state mutation or
/// provider call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("message cannot be empty")]
    EmptyInput,

    #[error("temperature {0} is outside the allowed range 0.0 to 2.0")]
    TemperatureOutOfRange(f32),

    #[error("model '{model}' is not supported (available: {})", supported.join(", "))]
    UnsupportedModel { model: String, supported: Vec<String> },

    #[error("model catalog cannot be empty")]
    EmptyModelCatalog,
}

/// Failure reported by the completion provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("authentication failed")]
    Authentication,

    #[error("rate limited by provider")]
    RateLimited,

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Map a non-success HTTP status to an error kind.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            404 => Self::ModelNotFound(body),
            429 => Self::RateLimited,
            _ => Self::Api { status, body },
        }
    }

    /// Text suitable for showing to the person chatting.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Cannot connect to the model server. Please make sure it is running and reachable.".to_string(),
            Self::Timeout => "Request timed out. The model might be taking too long to respond.".to_string(),
            Self::ModelNotFound(_) => "Model not found. Please check your model selection.".to_string(),
            Self::Authentication => "Authentication failed. Please check your API settings.".to_string(),
            Self::RateLimited => "Rate limit reached. Please wait a moment and try again.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

/// Startup configuration problem. Fatal before any session exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("required setting {var} is not set")]
    Missing { var: &'static str },

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Error returned by a conversation turn or a configuration change.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ChatError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}
