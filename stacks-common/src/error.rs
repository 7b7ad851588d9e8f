//! Common error types for Stacks

use thiserror::Error;

/// Common result type for Stacks operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Stacks applications
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("{0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("{0}")]
    InvalidInput(String),

    /// Request conflicts with existing data (duplicate name, stub in use)
    #[error("{0}")]
    Conflict(String),

    /// Record cannot be removed while other records still reference it
    #[error("{message}")]
    InUse {
        message: String,
        used_by: Vec<String>,
    },

    /// Spreadsheet or bulk import rejected, with one entry per problem row
    #[error("{message}")]
    Import {
        message: String,
        issues: Vec<String>,
    },

    /// Upstream service failure (geocoding, directory)
    #[error("External service error: {0}")]
    External(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the message may be shown to the person who made the request.
    ///
    /// Everything else is logged and replaced with a generic message.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::InvalidInput(_)
                | Error::Conflict(_)
                | Error::InUse { .. }
                | Error::Import { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_classification() {
        assert!(Error::InvalidInput("bad".into()).is_user_facing());
        assert!(Error::InUse {
            message: "in use".into(),
            used_by: vec!["Location: Central".into()],
        }
        .is_user_facing());
        assert!(!Error::Internal("boom".into()).is_user_facing());
        assert!(!Error::Config("missing".into()).is_user_facing());
    }

    #[test]
    fn test_user_facing_messages_are_bare() {
        let err = Error::NotFound("Unable to find product id 4".into());
        assert_eq!(err.to_string(), "Unable to find product id 4");
    }
}
