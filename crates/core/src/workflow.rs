//! Workflow vocabulary shared by observations and tasks.

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_ANSWERED: &str = "ANSWERED";
pub const STATUS_CLOSED: &str = "CLOSED";
pub const STATUS_REJECTED: &str = "REJECTED";

/// A media attachment reference, stored denormalized on the owning row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Answer,
    Close,
    Reject,
}

impl TransitionAction {
    pub fn resulting_status(&self) -> &'static str {
        match self {
            Self::Answer => STATUS_ANSWERED,
            Self::Close => STATUS_CLOSED,
            Self::Reject => STATUS_REJECTED,
        }
    }

    /// Path segment of the remote endpoint performing this action.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Answer => "answer",
            Self::Close => "close",
            Self::Reject => "reject",
        }
    }
}

/// Answer, close or reject request for an observation or a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    pub action: TransitionAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StatusTransition {
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            action: TransitionAction::Answer,
            answer: Some(text.into()),
            reason: None,
        }
    }

    pub fn close() -> Self {
        Self {
            action: TransitionAction::Close,
            answer: None,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            action: TransitionAction::Reject,
            answer: None,
            reason: Some(reason.into()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let blank = |value: &Option<String>| value.as_deref().map_or(true, |v| v.trim().is_empty());
        match self.action {
            TransitionAction::Answer if blank(&self.answer) => {
                Err(Error::Validation("An answer requires text".to_string()))
            }
            TransitionAction::Reject if blank(&self.reason) => Err(Error::Validation(
                "A rejection requires a reason".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn resulting_status(&self) -> &'static str {
        self.action.resulting_status()
    }
}
