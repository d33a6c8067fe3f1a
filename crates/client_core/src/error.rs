use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("invalid content type '{mime_type}': {source}")]
    InvalidMimeType {
        mime_type: String,
        source: reqwest::Error,
    },
    #[error("request to /{endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        source: reqwest::Error,
    },
    #[error("/{endpoint} responded with status {status}")]
    Status { endpoint: &'static str, status: u16 },
    #[error("invalid JSON from /{endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        source: serde_json::Error,
    },
}

impl ClientError {
    pub fn endpoint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidBaseUrl { .. } | Self::HttpClient(_) | Self::InvalidMimeType { .. } => {
                None
            }
            Self::Transport { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Decode { endpoint, .. } => Some(*endpoint),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported locale '{0}' (expected 'ru' or 'en')")]
pub struct UnknownLocale(pub String);
