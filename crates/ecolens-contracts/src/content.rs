use std::fmt;

use serde::{Deserialize, Serialize};

/// One rendered unit of an analysis.
///
/// `RawMarkup` carries upstream markup that is injected into the render tree
/// without escaping. Only the markup sniff in [`crate::normalize`] produces it,
/// and renderers must treat it as trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum ContentBlock {
    Heading(String),
    ListItem(String),
    Paragraph(String),
    RawMarkup(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The transport never produced a response (connect failure, timeout).
    NetworkError,
    /// The service answered but reported a failure or an unrecognized shape.
    ApplicationError,
    /// Caller misuse of the controller. Logged, never part of a result shown to users.
    InvalidState,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "network_error",
            Self::ApplicationError => "application_error",
            Self::InvalidState => "invalid_state",
        }
    }

    /// Prefix used when a failure is shown to a person.
    pub fn display_label(&self) -> &'static str {
        match self {
            Self::NetworkError => "Network error",
            Self::ApplicationError => "Error",
            Self::InvalidState => "Invalid state",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_label())
    }
}

/// A transport-level failure handed to the normalizer in place of a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NetworkError,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for TransportError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NormalizedResult {
    Success { blocks: Vec<ContentBlock> },
    Failure { kind: ErrorKind, message: String },
}

impl NormalizedResult {
    pub fn success(blocks: Vec<ContentBlock>) -> Self {
        Self::Success { blocks }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        match self {
            Self::Success { blocks } => blocks.as_slice(),
            Self::Failure { .. } => &[],
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}
