//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while fetching, extracting, parsing or storing reports.
#[derive(Debug, Error)]
pub enum DataError {
    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Zip archive error
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// CSV input error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The server answered 404 for the requested URL
    #[error("not found")]
    NotFound {
        /// URL that was requested
        url: String,
    },

    /// Any other non-success HTTP status
    #[error("HTTP {status}")]
    HttpStatus {
        /// Status code returned by the server
        status: u16,
        /// URL that was requested
        url: String,
    },

    /// The server returned an empty body
    #[error("empty download from {0}")]
    EmptyDownload(String),

    /// The transfer exceeded the configured size cap
    #[error("download exceeds {limit} bytes")]
    TooLarge {
        /// Configured cap in bytes
        limit: u64,
    },

    /// Archive contents exceed the configured uncompressed size cap
    #[error("extracted contents exceed {limit} bytes")]
    ExtractedTooLarge {
        /// Configured cap in bytes
        limit: u64,
    },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The downloaded file is not a zip archive
    #[error("not an archive: {0}")]
    NotAnArchive(String),

    /// The archive contains no usable files
    #[error("archive is empty")]
    EmptyArchive,

    /// XML parsing error
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// No XBRL instance document among the extracted files
    #[error("no XBRL instance document among {0} extracted files")]
    NoInstanceDocument(usize),

    /// A required fact is absent from the instance
    #[error("missing required fact: {0}")]
    MissingFact(String),

    /// A fact is present but cannot be used
    #[error("malformed fact {concept}: {reason}")]
    MalformedFact {
        /// Concept the fact reports
        concept: String,
        /// Why the fact was rejected
        reason: String,
    },

    /// Store error that is not a SQLite error
    #[error("Store error: {0}")]
    Store(String),
}

impl DataError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<quick_xml::Error> for DataError {
    fn from(err: quick_xml::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_reason() {
        let err = DataError::NotFound {
            url: "https://example.com/x.zip".to_string(),
        };
        assert_eq!(err.to_string(), "not found");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_status() {
        let server_error = DataError::HttpStatus {
            status: 503,
            url: String::new(),
        };
        let forbidden = DataError::HttpStatus {
            status: 403,
            url: String::new(),
        };
        let throttled = DataError::HttpStatus {
            status: 429,
            url: String::new(),
        };
        assert!(server_error.is_transient());
        assert!(throttled.is_transient());
        assert!(!forbidden.is_transient());
        assert_eq!(forbidden.to_string(), "HTTP 403");
    }
}
