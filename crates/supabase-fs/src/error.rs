//! Adapter error types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised by filesystem operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Upload rejected or not confirmed by the remote
    #[error("Unable to write file at location: {path}. {reason}")]
    WriteFailed { path: String, reason: String },

    /// Download or metadata lookup failed
    #[error("Unable to read file from location: {path}. {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Unable to delete file located at: {path}. {reason}")]
    DeleteFailed { path: String, reason: String },

    #[error("Unable to delete directory located at: {path}. {reason}")]
    DeleteDirectoryFailed { path: String, reason: String },

    /// Placeholder write failed; the write error is kept as the source
    #[error("Unable to create a directory at {path}. {reason}")]
    CreateDirectoryFailed {
        path: String,
        reason: String,
        #[source]
        source: Box<StorageError>,
    },

    #[error("Unable to move file from {from} to {to}: {reason}")]
    MoveFailed { from: String, to: String, reason: String },

    #[error("Unable to copy file from {from} to {to}: {reason}")]
    CopyFailed { from: String, to: String, reason: String },

    /// The remote has no per-object ACL this adapter can expose
    #[error("Unable to set visibility for file {path}. Driver doesn't support visibility")]
    VisibilityUnsupported { path: String },

    #[error("Unable to generate temporary url for {path}: {reason}")]
    TemporaryUrlFailed { path: String, reason: String },

    /// A listing page failed under `ListingErrorPolicy::Fail`
    #[error("Unable to list contents of {path}: {reason}")]
    ListFailed { path: String, reason: String },

    /// Caller asked for something the configuration forbids
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    /// Path the failed operation targeted, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::WriteFailed { path, .. }
            | Self::ReadFailed { path, .. }
            | Self::DeleteFailed { path, .. }
            | Self::DeleteDirectoryFailed { path, .. }
            | Self::CreateDirectoryFailed { path, .. }
            | Self::VisibilityUnsupported { path }
            | Self::TemporaryUrlFailed { path, .. }
            | Self::ListFailed { path, .. } => Some(path),
            Self::MoveFailed { from, .. } | Self::CopyFailed { from, .. } => Some(from),
            _ => None,
        }
    }

    /// Check if this is a "capability not supported" error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::VisibilityUnsupported { .. })
    }

    pub(crate) fn write(path: &str, reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn read(path: &str, reason: impl Into<String>) -> Self {
        Self::ReadFailed {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn temporary_url(path: &str, reason: impl Into<String>) -> Self {
        Self::TemporaryUrlFailed {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_create_directory_keeps_source() {
        let inner = StorageError::write("docs/.emptyFolderPlaceholder", "Error");
        let reason = inner.to_string();
        let error = StorageError::CreateDirectoryFailed {
            path: "docs".to_string(),
            reason: reason.clone(),
            source: Box::new(inner),
        };

        assert!(error.to_string().contains(&reason));
        let source = error.source().expect("source should be set");
        assert!(source.to_string().contains("docs/.emptyFolderPlaceholder"));
        assert_eq!(error.path(), Some("docs"));
    }

    #[test]
    fn test_visibility_is_unsupported() {
        let error = StorageError::VisibilityUnsupported {
            path: "a.txt".to_string(),
        };
        assert!(error.is_unsupported());
        assert!(!StorageError::read("a.txt", "nope").is_unsupported());
    }

    #[test]
    fn test_move_reports_source_path() {
        let error = StorageError::MoveFailed {
            from: "a.txt".to_string(),
            to: "b.txt".to_string(),
            reason: "{\"error\":\"not_found\"}".to_string(),
        };
        assert_eq!(error.path(), Some("a.txt"));
        assert!(error.to_string().contains("not_found"));
    }
}
