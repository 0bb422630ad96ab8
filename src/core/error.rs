use std::collections::BTreeMap;

use crate::types::response::ApiErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Reqwest error: {0}")]
    HTTPClient(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Reqwest error: {0}")]
    HTTPClient(#[from] reqwest::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
    #[error("URL encoding error: {0}")]
    URLEncode(#[from] serde_urlencoded::ser::Error),
    #[error("Token storage error: {0}")]
    Storage(std::io::Error),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Invalid product: {0}")]
    InvalidProduct(String),
    #[error("Administrator access required")]
    NotAdmin,
    #[error("Not signed in")]
    NotSignedIn,
}

impl Error {
    /// HTTP status of the failed call, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(e) => Some(e.status),
            Error::HTTPClient(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Error::Api(e) if e.is_auth_failure())
    }
}

/// Body of a non-2xx response: the backend either sends its structured error
/// record or plain text.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorBody {
    Structured(ApiErrorBody),
    Text(String),
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub body: Option<ErrorBody>,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(status: u16, body: Option<ErrorBody>) -> Self {
        let message = match &body {
            Some(ErrorBody::Structured(body)) => body.message.clone().filter(|m| !m.is_empty()),
            Some(ErrorBody::Text(text)) => Some(text.clone()).filter(|t| !t.is_empty()),
            None => None,
        }
        .unwrap_or_else(|| format!("Error {status}"));

        Self {
            status,
            body,
            message,
        }
    }

    /// 401 and 403 mean the stored token is no longer accepted; callers
    /// usually respond by logging out.
    pub fn is_auth_failure(&self) -> bool {
        self.status == 401 || self.status == 403
    }

    pub fn validation_errors(&self) -> Option<&BTreeMap<String, String>> {
        match &self.body {
            Some(ErrorBody::Structured(body)) => body.errors.as_ref().filter(|e| !e.is_empty()),
            _ => None,
        }
    }

    /// One `field: message` line per validation error.
    pub fn validation_summary(&self) -> Option<String> {
        self.validation_errors().map(|errors| {
            errors
                .iter()
                .map(|(field, message)| format!("{field}: {message}"))
                .collect::<Vec<_>>()
                .join("\n")
        })
    }
}
