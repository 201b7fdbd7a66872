use ddns_provider::ProviderError;
use reqwest::StatusCode;
use thiserror::Error;

/// Problems with the merged file / env / CLI configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot load config: {0}")]
    Load(#[from] config::ConfigError),

    #[error("validation failed: {0}")]
    Validate(#[from] validator::ValidationErrors),

    #[error("{0}")]
    Invalid(String),
}

/// Everything that can end a run
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("request {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} statusCode: {}", .status.as_u16())]
    HttpStatus { url: String, status: StatusCode },

    #[error("cannot decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// The provider answered and refused; unreachable providers are `Transport`.
    #[error("provider error: {0}")]
    Provider(ProviderError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("fatal error: {0}")]
    Fatal(#[from] anyhow::Error),
}

impl From<ProviderError> for CoreError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Http(source) => CoreError::Transport {
                url: source
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "provider API".into()),
                source,
            },
            api => CoreError::Provider(api),
        }
    }
}

impl CoreError {
    /// Process exit status for this error; never 0.
    pub fn exit_code(&self) -> u8 {
        match self {
            CoreError::Fatal(_) => 1,
            CoreError::Config(_) => 2,
            CoreError::Transport { .. } => 3,
            CoreError::HttpStatus { .. } => 4,
            CoreError::Decode { .. } => 5,
            CoreError::Provider(_) => 6,
            CoreError::NotFound(_) => 7,
        }
    }
}
