//! Diagnostics raised while interpreting timer configuration.
//!
//! None of these abort a tick. They travel alongside an [`Evaluation`] so the
//! caller can log or display them.
//!
//! [`Evaluation`]: crate::timer::engine::Evaluation

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("{kind} timer is missing required field '{field}'")]
    MissingField { kind: String, field: &'static str },

    #[error("invalid value '{value}' for field '{field}': {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("unknown timer type '{0}', counting down to end date")]
    UnknownTimerType(String),

    #[error("expiry action '{action}' is not supported for {kind} timers")]
    UnsupportedExpiry { action: String, kind: String },

    #[error("discarded unreadable persisted target '{value}' for key '{key}'")]
    CorruptPersistedTarget { key: String, value: String },

    #[error("target store unavailable: {0}")]
    StoreUnavailable(String),
}

impl Diagnostic {
    pub(crate) fn invalid(field: &'static str, value: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidField {
            field,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

impl serde::Serialize for Diagnostic {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
