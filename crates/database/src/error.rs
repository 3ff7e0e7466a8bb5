use thiserror::Error;

/// Failures raised by the store underneath a `DocumentCollection`.
///
/// This is the "underlying cause" carried by every `DbError` variant that
/// reaches the store; it is never reinterpreted on the way up.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("MongoDB driver error: {0}")]
    Driver(#[from] mongodb::error::Error),

    #[error("Failed to decode BSON document: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("Failed to encode BSON document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("Invalid connection URI: {0}")]
    InvalidUri(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to connect to the document store: {0}")]
    ConnectionError(#[source] StoreError),

    #[error("Query against the document store failed: {0}")]
    QueryError(#[source] StoreError),

    #[error("Writing a document failed: {0}")]
    WriteError(#[source] StoreError),

    #[error("Deleting a document failed: {0}")]
    DeleteError(#[source] StoreError),

    #[error("The operation was cancelled by its caller.")]
    Cancelled,

    #[error("The operation deadline was exceeded.")]
    DeadlineExceeded,
}
