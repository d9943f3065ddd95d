use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeckError>;

/// Failures surfaced by the deck pipeline.
///
/// Soft conditions such as hitting the copy cap are not errors; see
/// [`AddOutcome`](crate::AddOutcome).
#[derive(Debug, Error)]
pub enum DeckError {
    #[error("unknown card '{0}'")]
    UnknownCard(String),

    #[error("card '{0}' is a leader and cannot be added to the main deck")]
    LeaderInMainDeck(String),

    #[error("deck has no leader")]
    MissingLeader,

    #[error("invalid deck name '{name}': {reason}")]
    InvalidDeckName { name: String, reason: &'static str },

    #[error("malformed deck list at line {line}: {reason}")]
    MalformedDeckList { line: usize, reason: String },

    #[error("no QR code detected in image")]
    NoCodeDetected,

    #[error("image could not be decoded: {0}")]
    UnreadableImage(String),

    #[error("payload of {0} bytes does not fit in a QR code")]
    PayloadTooLarge(usize),

    #[error("artwork fetch failed for {url}: {reason}")]
    ArtworkFetchFailed { url: String, reason: String },

    #[error("save slot operation failed on {}: {reason}", path.display())]
    PersistenceFailure { path: PathBuf, reason: String },

    #[error("catalog error: {0}")]
    Catalog(String),
}

impl DeckError {
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedDeckList {
            line,
            reason: reason.into(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::PersistenceFailure {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub fn fetch(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ArtworkFetchFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
