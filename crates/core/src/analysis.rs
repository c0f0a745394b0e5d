use crate::embeddings::ModelLoader;
use crate::error::{ProcessingError, Result};
use crate::loader::{DocumentLoader, LopdfTextSource, PdfTextSource};
use crate::models::{AnalysisReport, UploadedFile};
use crate::response::ResponsePolicy;
use crate::scorer::SimilarityScorer;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Document text -> similarity against the query -> user-facing message.
pub struct Analyzer<L: ModelLoader, P = LopdfTextSource> {
    loader: Arc<DocumentLoader<P>>,
    scorer: SimilarityScorer<L>,
    policy: ResponsePolicy,
}

impl<L: ModelLoader> Analyzer<L, LopdfTextSource> {
    pub fn new(model: L) -> Self {
        Self::with_parts(
            DocumentLoader::default(),
            SimilarityScorer::new(model),
            ResponsePolicy::default(),
        )
    }
}

impl<L, P> Analyzer<L, P>
where
    L: ModelLoader,
    P: PdfTextSource + Send + Sync + 'static,
{
    pub fn with_parts(
        loader: DocumentLoader<P>,
        scorer: SimilarityScorer<L>,
        policy: ResponsePolicy,
    ) -> Self {
        Self {
            loader: Arc::new(loader),
            scorer,
            policy,
        }
    }

    pub fn scorer(&self) -> &SimilarityScorer<L> {
        &self.scorer
    }

    pub async fn analyze(&self, file: Option<&UploadedFile>, query: &str) -> Result<AnalysisReport> {
        let file = file.ok_or(ProcessingError::MissingFile)?;

        // lopdf parsing is CPU-bound; keep it off the async workers.
        let loader = Arc::clone(&self.loader);
        let upload = file.clone();
        let document_text = tokio::task::spawn_blocking(move || loader.load(&upload)).await??;
        let score = self.scorer.score(&document_text, query).await?;
        let message = self.policy.render(score, &document_text);
        let document_chars = document_text.chars().count();

        info!(file = %file.name, document_chars, score, "document analyzed");

        Ok(AnalysisReport {
            score,
            message,
            document_chars,
            analyzed_at: Utc::now(),
        })
    }
}
