use serde::Deserialize;
use thiserror::Error;

/// Error body returned by the policy service on a rejected call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub i18n_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A rejected call to the policy service.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("server rejected request ({status}): {}", rejection_detail(.message, .i18n_code))]
    Rejected {
        status: u16,
        i18n_code: Option<String>,
        message: Option<String>,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(String),
}

fn rejection_detail<'a>(message: &'a Option<String>, i18n_code: &'a Option<String>) -> &'a str {
    message
        .as_deref()
        .or(i18n_code.as_deref())
        .unwrap_or("no details")
}

impl RemoteError {
    pub fn rejected(status: u16, body: ErrorBody) -> Self {
        RemoteError::Rejected {
            status,
            i18n_code: body.i18n_code,
            message: body.message,
        }
    }

    /// Localisation key supplied by the server, if any.
    pub fn i18n_code(&self) -> Option<&str> {
        match self {
            RemoteError::Rejected { i18n_code, .. } => i18n_code.as_deref(),
            _ => None,
        }
    }
}
