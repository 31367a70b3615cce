//! Error and Result types for fan-in query operations.

use thiserror::Error;

/// A convenience `Result` type for fan-in operations.
pub type Result<T> = std::result::Result<T, QueryError>;

/// The error type for fan-in query operations.
///
/// Errors are `Clone` because sentinel iterators and series sets hand the same
/// error back on every call to `err()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Chunk record carries an encoding tag this crate cannot decode.
    #[error("unrecognized chunk encoding {0}")]
    UnsupportedEncoding(i32),

    /// Chunk payload is malformed or truncated.
    #[error("convert chunk: {0}")]
    ChunkDecode(String),

    /// A store shard failed to answer a request.
    #[error("store {store}: {message}")]
    Store {
        /// Name of the failing store.
        store: String,
        /// Error reported by the store client.
        message: String,
    },
}
