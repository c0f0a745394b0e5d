use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("not logged in")]
    NoSession,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("document extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("no file was provided")]
    MissingFile,

    #[error("embedding model failed to load: {0}")]
    ModelLoad(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("embedding dimension {left} != {right}")]
    DimensionMismatch { left: usize, right: usize },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T, E = ProcessingError> = std::result::Result<T, E>;
