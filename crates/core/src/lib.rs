pub mod analysis;
pub mod auth;
pub mod embeddings;
pub mod error;
pub mod loader;
pub mod models;
pub mod response;
pub mod scorer;
pub mod storage;

pub use analysis::Analyzer;
pub use auth::{CredentialStore, SESSION_KEY, USERS_KEY};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, HttpEmbedder, HttpEmbedderConfig, HttpModelLoader,
    ModelLoader, ModelSource, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_HTTP_MODEL,
};
pub use error::{AuthError, ProcessingError, StorageError};
pub use loader::{join_pages, DocumentLoader, LopdfTextSource, PageText, PdfTextSource};
pub use models::{
    guess_mime_type, AnalysisReport, CredentialRecord, Session, UploadedFile, PDF_MIME_TYPE,
    TEXT_MIME_TYPE,
};
pub use response::{format_percentage, ResponsePolicy, LOW_SIMILARITY_NOTICE};
pub use scorer::{dot_product, SimilarityScorer};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
