//! Bootstrap data translation errors

use thiserror::Error;

/// Errors raised while translating bootstrap data.
///
/// `UnknownAction` and `MalformedBlock` are block-local: the parser reports
/// them as diagnostics and keeps going. Everything else fails the whole
/// document.
#[derive(Debug, Error)]
pub enum CloudInitError {
    /// Top-level key with no matching action
    #[error("unknown action {key:?} at line {line}")]
    UnknownAction {
        /// The unrecognized key
        key: String,
        /// 1-based line of the key
        line: usize,
    },

    /// Block YAML could not be decoded into its action
    #[error("malformed {key} block at line {line}: {source}")]
    MalformedBlock {
        /// Key of the block
        key: String,
        /// 1-based line of the key
        line: usize,
        /// YAML decoding error
        #[source]
        source: serde_yaml::Error,
    },

    /// Bootstrap format other than cloud-config
    #[error("unsupported bootstrap data format {0:?}, only cloud-config is supported")]
    UnsupportedFormat(String),

    /// Bootstrap data is not UTF-8 text
    #[error("bootstrap data is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// write_files content is not valid base64
    #[error("failed to base64 decode content of {path}: {source}")]
    Base64 {
        /// File being written
        path: String,
        /// Decoding error
        #[source]
        source: base64::DecodeError,
    },

    /// write_files content is not a valid gzip stream
    #[error("failed to gunzip content of {path}: {source}")]
    Gzip {
        /// File being written
        path: String,
        /// Decompression error
        #[source]
        source: std::io::Error,
    },

    /// Decoded write_files content is not UTF-8 text
    #[error("decoded content of {path} is not valid UTF-8")]
    NonUtf8Content {
        /// File being written
        path: String,
    },

    /// Top-level key pattern failed to compile
    #[error("invalid top-level key pattern: {0}")]
    KeyPattern(#[from] regex::Error),
}

impl CloudInitError {
    /// Whether the error only affects its own block.
    pub fn is_block_local(&self) -> bool {
        matches!(self, CloudInitError::UnknownAction { .. } | CloudInitError::MalformedBlock { .. })
    }
}
