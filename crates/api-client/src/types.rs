use serde::Deserialize;

/// Error body returned by the API. `message` is a string, or a list of
/// validation messages.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<ApiErrorMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ApiErrorMessage {
    Single(String),
    Many(Vec<String>),
}

impl ApiErrorResponse {
    pub fn describe(&self) -> Option<String> {
        let message = match &self.message {
            Some(ApiErrorMessage::Single(message)) => message.clone(),
            Some(ApiErrorMessage::Many(messages)) => messages.join("; "),
            None => return self.error.clone(),
        };
        Some(match &self.error {
            Some(error) => format!("{}: {}", error, message),
            None => message,
        })
    }
}

/// List endpoints answer either a bare array or `{ "data": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListResponse<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListResponse<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Wrapped { data: items } => items,
        }
    }
}
