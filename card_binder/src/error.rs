//! Error types for card_binder

use crate::card_key::CardKey;
use mtg_common::FetchError;
use std::path::PathBuf;
use thiserror::Error;

/// Why an inventory line was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("missing quantity")]
    MissingQuantity,
    #[error("invalid quantity {0:?}")]
    InvalidQuantity(String),
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("missing card name")]
    MissingName,
    #[error("unknown condition {0:?}")]
    UnknownCondition(String),
    #[error("unknown foil marker {0:?}")]
    UnknownFoil(String),
    #[error("expected at most 5 fields, found {0}")]
    TooManyFields(usize),
    #[error("unparseable record: {0}")]
    Unparseable(String),
    #[error("line is not valid UTF-8")]
    InvalidEncoding,
}

/// An inventory line that does not match the expected record shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed inventory line {line_number}: {reason}: {line:?}")]
pub struct MalformedLineError {
    /// 1-based line number in the source
    pub line_number: usize,
    /// Raw line content as read
    pub line: String,
    pub reason: MalformedReason,
}

/// Failure while reading an inventory source
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Malformed(#[from] MalformedLineError),
    #[error("failed to read inventory: {0}")]
    Io(#[from] std::io::Error),
}

/// Network/timeout/rate-limit failure while resolving one key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transient fetch error for {key}: {source}")]
pub struct TransientFetchError {
    pub key: CardKey,
    #[source]
    pub source: FetchError,
}

/// Outcome of a failed `resolve`, shared between singleflight waiters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Transient(#[from] TransientFetchError),
    #[error("cache store error for {key}: {message}")]
    Store { key: CardKey, message: String },
}

/// Filesystem problem writing the rendered binder view
#[derive(Debug, Error)]
pub enum OutputWriteError {
    #[error("output directory {0} is not empty (use overwrite mode to replace its contents)")]
    NotEmpty(PathBuf),
    #[error("output path {0} exists and is not a directory")]
    NotADirectory(PathBuf),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OutputWriteError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OutputWriteError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Unified error type for card_binder operations
#[derive(Debug, Error)]
pub enum BinderError {
    #[error(transparent)]
    Malformed(#[from] MalformedLineError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    OutputWrite(#[from] OutputWriteError),
    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("refusing to persist unresolved placeholder for {0}")]
    UnstorableRecord(CardKey),
    #[error("inventory contains no cards")]
    EmptyInventory,
    #[error("binder name must not be blank")]
    BlankName,
    #[error("binder id must not be blank")]
    BlankId,
    #[error("a binder with id `{0}` already exists")]
    DuplicateBinder(String),
    #[error("no binder with id `{0}`")]
    UnknownBinder(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("resolver task failed: {0}")]
    Task(String),
}

impl From<ParseError> for BinderError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Malformed(e) => BinderError::Malformed(e),
            ParseError::Io(e) => BinderError::Io(e),
        }
    }
}

impl From<TransientFetchError> for BinderError {
    fn from(err: TransientFetchError) -> Self {
        BinderError::Resolve(ResolveError::Transient(err))
    }
}

/// Result alias for card_binder operations
pub type Result<T> = std::result::Result<T, BinderError>;
