//! Error types for rabbit-replayer
//!
//! This module defines the error hierarchy covering:
//! - Binary decoding errors inside index / persistent-store files
//! - Configuration and CLI errors
//! - Broker publishing errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Decoding errors carry the exact offset and source name so a
//!   diagnostic points at the byte that failed
//! - Per-file errors are recovered by the parser worker; only
//!   coordinator-level errors terminate the process

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the rabbit-replayer application
#[derive(Error, Debug)]
pub enum ReplayerError {
    /// Binary decoding errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Broker publishing errors
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structured report rendering failed
    #[error("Render error: {0}")]
    Render(String),

    /// Channel closed unexpectedly
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

/// Errors raised while decoding an index or persistent-store buffer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A read would run past the end of the buffer
    #[error("Read of {wanted} byte(s) at {pos} exceeds the {len} available in {name}")]
    OutOfBounds {
        name: String,
        pos: usize,
        wanted: usize,
        len: usize,
    },

    /// An asserted literal byte did not match
    #[error("Expected 0x{want:02X} but got 0x{got:02X} at {pos} in {name}")]
    UnexpectedByte {
        name: String,
        pos: usize,
        want: u8,
        got: u8,
    },

    /// Semantic violation in an otherwise well-framed record
    #[error("{reason} at {pos} in {name}")]
    Structure {
        name: String,
        pos: usize,
        reason: String,
    },

    /// The embedded routing metadata does not name a queue
    #[error("Unable to find queue name at position {pos} in {name}")]
    QueueNameNotFound { name: String, pos: usize },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid queue-match expression
    #[error("Invalid match pattern '{pattern}': {reason}")]
    InvalidMatchPattern { pattern: String, reason: String },

    /// Invalid file search pattern
    #[error("Invalid file pattern '{pattern}': {reason}")]
    InvalidFilePattern { pattern: String, reason: String },

    /// Commands writing per-queue files need somewhere to put them
    #[error("An output folder is required for this command")]
    MissingOutputFolder,

    /// Source folder missing or not a directory
    #[error("Invalid source folder '{path}': {reason}")]
    InvalidFolder { path: PathBuf, reason: String },

    /// Lost-message document cannot be read
    #[error("Cannot read lost-message list '{path}': {reason}")]
    LostMessagesUnreadable { path: PathBuf, reason: String },

    /// Lost-message document does not decode to a list of {name, messages}
    #[error("Malformed lost-message list '{path}': {reason}")]
    LostMessagesMalformed { path: PathBuf, reason: String },
}

/// Broker publishing errors
#[derive(Error, Debug)]
pub enum PublishError {
    /// Connection to the broker failed
    #[error("Failed to connect to broker at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// Channel could not be opened on an established connection
    #[error("Failed to open broker channel: {0}")]
    ChannelFailed(String),

    /// Durable queue declare failed
    #[error("Queue declare failed for '{queue}': {reason}")]
    DeclareFailed { queue: String, reason: String },

    /// basic.publish failed
    #[error("Publish failed for '{queue}': {reason}")]
    PublishFailed { queue: String, reason: String },
}

impl ParseError {
    /// Offset at which decoding failed
    pub fn position(&self) -> usize {
        match self {
            ParseError::OutOfBounds { pos, .. }
            | ParseError::UnexpectedByte { pos, .. }
            | ParseError::Structure { pos, .. }
            | ParseError::QueueNameNotFound { pos, .. } => *pos,
        }
    }

    /// True for the structural rejections (e.g. multi-block index records)
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ParseError::Structure { .. } | ParseError::QueueNameNotFound { .. }
        )
    }
}

/// Result type alias for ReplayerError
pub type Result<T> = std::result::Result<T, ReplayerError>;

/// Result type alias for ParseError
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Result type alias for PublishError
pub type PublishResult<T> = std::result::Result<T, PublishError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_position() {
        let err = ParseError::UnexpectedByte {
            name: "file.rdq:0".into(),
            pos: 42,
            want: b'l',
            got: 0x00,
        };
        assert_eq!(err.position(), 42);
        assert!(!err.is_structural());
    }

    #[test]
    fn test_error_conversion() {
        let parse = ParseError::QueueNameNotFound {
            name: "x.idx".into(),
            pos: 0,
        };
        assert!(parse.is_structural());
        let top: ReplayerError = parse.into();
        assert!(matches!(top, ReplayerError::Parse(_)));
    }

    #[test]
    fn test_display_has_offset_and_name() {
        let err = ParseError::OutOfBounds {
            name: "seg.rdq:3".into(),
            pos: 10,
            wanted: 8,
            len: 12,
        };
        let msg = err.to_string();
        assert!(msg.contains("seg.rdq:3"));
        assert!(msg.contains("10"));
    }
}
