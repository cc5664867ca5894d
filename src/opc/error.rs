//! Error types for package operations
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpcError {
    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Ambiguous uri '{tail}' matches {} items: {}", .matches.len(), .matches.join(", "))]
    AmbiguousUri { tail: String, matches: Vec<String> },

    #[error("Malformed XML in '{uri}': {reason}")]
    MalformedXml { uri: String, reason: String },

    /// A uri with `.` or `..` segments, which cannot be mapped below a directory
    #[error("Unsafe item uri: {0}")]
    UnsafeUri(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Broad failure categories, used by the command layer to pick an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Ambiguous,
    MalformedXml,
    Io,
}

impl OpcError {
    /// Create a malformed-xml error not yet attributed to an item.
    pub fn malformed(reason: impl Into<String>) -> Self {
        OpcError::MalformedXml {
            uri: String::new(),
            reason: reason.into(),
        }
    }

    /// Attribute a malformed-xml error to `uri` if it has no uri yet.
    ///
    /// Other variants pass through unchanged.
    pub fn for_uri(self, uri: &str) -> Self {
        match self {
            OpcError::MalformedXml { uri: existing, reason } if existing.is_empty() => {
                OpcError::MalformedXml {
                    uri: uri.to_string(),
                    reason,
                }
            },
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OpcError::ItemNotFound(_) => ErrorKind::NotFound,
            OpcError::AmbiguousUri { .. } => ErrorKind::Ambiguous,
            OpcError::MalformedXml { .. } => ErrorKind::MalformedXml,
            OpcError::PackageNotFound(_)
            | OpcError::UnsafeUri(_)
            | OpcError::Io(_)
            | OpcError::Zip(_)
            | OpcError::Walk(_) => ErrorKind::Io,
        }
    }
}

impl From<quick_xml::Error> for OpcError {
    fn from(err: quick_xml::Error) -> Self {
        OpcError::malformed(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for OpcError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        OpcError::malformed(err.to_string())
    }
}

impl From<std::str::Utf8Error> for OpcError {
    fn from(err: std::str::Utf8Error) -> Self {
        OpcError::malformed(format!("invalid UTF-8: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, OpcError>;
