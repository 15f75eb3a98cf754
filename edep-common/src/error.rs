// edep-common/src/error.rs
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum EdepError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Semantic Versioning Error: {0}")]
    SemVer(#[from] Arc<semver::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Input Error: {0}")]
    Input(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Parsing Error in {0}: {1}")]
    Parse(String, String),

    #[error("IO Error: {0}")]
    IoError(String),

    #[error("Fetch Error: {0}")]
    Fetch(String),

    #[error("{}", format_multiple(.0))]
    Multiple(Vec<EdepError>),
}

/// Coarse classification of an [`EdepError`], used by callers that map
/// failures onto exit codes or summary lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    NotFound,
    Validation,
    Parse,
    Io,
    Fetch,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Input => "input error",
            Self::NotFound => "not found",
            Self::Validation => "validation error",
            Self::Parse => "parse error",
            Self::Io => "I/O error",
            Self::Fetch => "fetch error",
            Self::Config => "configuration error",
        };
        f.write_str(s)
    }
}

impl EdepError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) | Self::IoError(_) => ErrorKind::Io,
            Self::Http(_) | Self::Fetch(_) => ErrorKind::Fetch,
            Self::Json(_) | Self::Parse(_, _) => ErrorKind::Parse,
            Self::SemVer(_) | Self::Validation(_) => ErrorKind::Validation,
            Self::Config(_) => ErrorKind::Config,
            Self::Input(_) => ErrorKind::Input,
            Self::NotFound(_) => ErrorKind::NotFound,
            // An aggregate takes the kind of its first member.
            Self::Multiple(errors) => errors
                .first()
                .map(EdepError::kind)
                .unwrap_or(ErrorKind::Validation),
        }
    }

    /// Collapses a list of collected errors: none is `Ok`, one is returned
    /// as-is, several become [`EdepError::Multiple`].
    pub fn from_collected(mut errors: Vec<EdepError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(EdepError::Multiple(errors)),
        }
    }
}

fn format_multiple(errors: &[EdepError]) -> String {
    let mut out = format!("{} errors occurred:", errors.len());
    for e in errors {
        out.push_str("\n  - ");
        out.push_str(&e.to_string());
    }
    out
}

impl From<std::io::Error> for EdepError {
    fn from(err: std::io::Error) -> Self {
        EdepError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for EdepError {
    fn from(err: reqwest::Error) -> Self {
        EdepError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for EdepError {
    fn from(err: serde_json::Error) -> Self {
        EdepError::Json(Arc::new(err))
    }
}

impl From<semver::Error> for EdepError {
    fn from(err: semver::Error) -> Self {
        EdepError::SemVer(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, EdepError>;
