//! Fetch error taxonomy

use thiserror::Error;

use super::context::CancelCause;
use crate::content::RenderError;
use crate::source::SourceError;

/// Tag of a [`FetchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    SourceUnavailable,
    ContentUnreadable,
    DecodeFailure,
    RenderFailure,
    Cancelled,
}

/// Terminal error of a fetch. The first one raised aborts the whole fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Listing or reading failed at the transport or filesystem level
    #[error("source unavailable")]
    SourceUnavailable {
        filename: Option<String>,
        #[source]
        source: SourceError,
    },

    /// The entry exists but its bytes could not be obtained
    #[error("content of '{filename}' is unreadable")]
    ContentUnreadable {
        filename: String,
        #[source]
        source: SourceError,
    },

    /// The transport encoding (base64) was invalid
    #[error("could not decode '{filename}'")]
    DecodeFailure {
        filename: String,
        #[source]
        source: base64::DecodeError,
    },

    /// Markdown conversion itself failed
    #[error("could not render '{filename}'")]
    RenderFailure {
        filename: String,
        #[source]
        source: RenderError,
    },

    #[error("fetch cancelled")]
    Cancelled(#[from] CancelCause),
}

impl FetchError {
    /// Map a failed directory listing; always `SourceUnavailable`
    pub(crate) fn listing(source: SourceError) -> Self {
        Self::SourceUnavailable {
            filename: None,
            source,
        }
    }

    /// Map a failed read of `filename` according to the source's verdict
    pub(crate) fn reading(filename: &str, source: SourceError) -> Self {
        match source {
            SourceError::Unavailable { .. } => Self::SourceUnavailable {
                filename: Some(filename.to_string()),
                source,
            },
            SourceError::Unreadable { .. } => Self::ContentUnreadable {
                filename: filename.to_string(),
                source,
            },
        }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::SourceUnavailable { .. } => FetchErrorKind::SourceUnavailable,
            Self::ContentUnreadable { .. } => FetchErrorKind::ContentUnreadable,
            Self::DecodeFailure { .. } => FetchErrorKind::DecodeFailure,
            Self::RenderFailure { .. } => FetchErrorKind::RenderFailure,
            Self::Cancelled(_) => FetchErrorKind::Cancelled,
        }
    }

    /// The document being processed when the error was raised
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::SourceUnavailable { filename, .. } => filename.as_deref(),
            Self::ContentUnreadable { filename, .. }
            | Self::DecodeFailure { filename, .. }
            | Self::RenderFailure { filename, .. } => Some(filename),
            Self::Cancelled(_) => None,
        }
    }

    /// The cancellation cause, for `Cancelled`
    pub fn cancel_cause(&self) -> Option<CancelCause> {
        match self {
            Self::Cancelled(cause) => Some(*cause),
            _ => None,
        }
    }
}
