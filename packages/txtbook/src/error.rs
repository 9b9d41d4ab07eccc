//! Error types for txtbook.
//!
//! Only I/O, packaging and configuration problems are errors. Line
//! classification is total and never fails.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the txtbook library.
#[derive(Debug, Error)]
pub enum TxtbookError {
    /// The input text file could not be opened.
    #[error("Failed to open input file {}: {source}", .path.display())]
    InputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the input stream failed part way through.
    #[error("Failed to read input {}: {source}", .path.display())]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The title pattern does not compile.
    #[error("Invalid title pattern '{pattern}': {source}")]
    InvalidTitlePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The maximum title length is not a positive integer.
    #[error("Invalid maximum title length: '{0}'. Expected a positive integer")]
    InvalidTitleMax(String),

    /// The language tag is malformed.
    #[error("Invalid language tag: '{0}'. Expected a tag like 'zh' or 'en-US'")]
    InvalidLanguage(String),

    /// The book name cannot be used as a file name.
    #[error("Invalid book name: '{0}'. Expected a non-empty name without path separators")]
    InvalidBookName(String),

    /// The cover image could not be read.
    #[error("Failed to read cover image {}: {source}", .path.display())]
    Cover {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cover image has an extension we cannot map to a media type.
    #[error("Unsupported cover image format: {0}")]
    UnsupportedCover(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing the EPUB archive failed.
    #[error("Failed to write EPUB archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// YAML serialization error.
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Invalid configuration from the environment.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for txtbook operations.
pub type Result<T> = std::result::Result<T, TxtbookError>;
