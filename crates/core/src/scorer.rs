use crate::embeddings::{Embedder, ModelLoader};
use crate::error::{ProcessingError, Result};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Embeds two texts with a shared model and returns their raw dot product.
///
/// The model is loaded on first use. Concurrent first calls wait on the same
/// load; a failed load is not cached, so the next call tries again.
pub struct SimilarityScorer<L: ModelLoader> {
    loader: L,
    model: OnceCell<L::Model>,
}

impl<L: ModelLoader> SimilarityScorer<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    pub async fn model(&self) -> Result<&L::Model> {
        self.model
            .get_or_try_init(|| async {
                info!("loading embedding model");
                self.loader.load().await
            })
            .await
    }

    pub async fn score(&self, text_a: &str, text_b: &str) -> Result<f32> {
        let model = self.model().await?;
        let vectors = model
            .embed_batch(&[text_a.to_string(), text_b.to_string()])
            .await?;

        let [left, right] = vectors.as_slice() else {
            return Err(ProcessingError::Embedding(format!(
                "expected 2 embeddings, got {}",
                vectors.len()
            )));
        };

        let score = dot_product(left, right)?;
        debug!(score, "similarity scored");
        Ok(score)
    }
}

/// Unnormalized dot product. Not cosine similarity unless both inputs are unit length.
pub fn dot_product(left: &[f32], right: &[f32]) -> Result<f32> {
    if left.len() != right.len() {
        return Err(ProcessingError::DimensionMismatch {
            left: left.len(),
            right: right.len(),
        });
    }

    Ok(left.iter().zip(right).map(|(a, b)| a * b).sum())
}

#[cfg(test)]
mod tests {
    use super::{dot_product, SimilarityScorer};
    use crate::embeddings::{CharacterNgramEmbedder, Embedder, ModelLoader};
    use crate::error::{ProcessingError, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedEmbedder {
        vectors: Vec<Vec<f32>>,
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(self.vectors.clone())
        }
    }

    #[derive(Default)]
    struct CountingLoader {
        loads: Arc<AtomicUsize>,
        fail_first: bool,
    }

    #[async_trait]
    impl ModelLoader for CountingLoader {
        type Model = FixedEmbedder;

        async fn load(&self) -> Result<Self::Model> {
            let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && attempt == 0 {
                return Err(ProcessingError::ModelLoad("weights unavailable".to_string()));
            }
            tokio::task::yield_now().await;
            Ok(FixedEmbedder {
                vectors: vec![vec![2.0, 1.0], vec![0.5, 3.0]],
            })
        }
    }

    #[test]
    fn dot_product_is_not_normalized() -> Result<()> {
        assert_eq!(dot_product(&[2.0, 1.0], &[0.5, 3.0])?, 4.0);
        assert_eq!(dot_product(&[], &[])?, 0.0);
        Ok(())
    }

    #[test]
    fn dot_product_rejects_mismatched_lengths() {
        assert!(matches!(
            dot_product(&[1.0], &[1.0, 2.0]),
            Err(ProcessingError::DimensionMismatch { left: 1, right: 2 })
        ));
    }

    #[tokio::test]
    async fn score_uses_raw_dot_product() -> Result<()> {
        let scorer = SimilarityScorer::new(CountingLoader::default());
        assert!(!scorer.is_loaded());
        assert_eq!(scorer.score("a", "b").await?, 4.0);
        assert!(scorer.is_loaded());
        Ok(())
    }

    #[tokio::test]
    async fn model_loads_once_across_concurrent_calls() -> Result<()> {
        let loads = Arc::new(AtomicUsize::new(0));
        let scorer = SimilarityScorer::new(CountingLoader {
            loads: Arc::clone(&loads),
            fail_first: false,
        });

        let (first, second) = tokio::join!(scorer.score("a", "b"), scorer.score("c", "d"));
        assert_eq!(first?, second?);
        scorer.score("e", "f").await?;
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_load_propagates_and_is_retried() -> Result<()> {
        let loads = Arc::new(AtomicUsize::new(0));
        let scorer = SimilarityScorer::new(CountingLoader {
            loads: Arc::clone(&loads),
            fail_first: true,
        });

        assert!(matches!(
            scorer.score("a", "b").await,
            Err(ProcessingError::ModelLoad(_))
        ));
        assert_eq!(scorer.score("a", "b").await?, 4.0);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test]
    async fn wrong_batch_size_is_an_error() {
        struct Short;

        #[async_trait]
        impl ModelLoader for Short {
            type Model = FixedEmbedder;

            async fn load(&self) -> Result<Self::Model> {
                Ok(FixedEmbedder {
                    vectors: vec![vec![1.0]],
                })
            }
        }

        let scorer = SimilarityScorer::new(Short);
        assert!(matches!(
            scorer.score("a", "b").await,
            Err(ProcessingError::Embedding(_))
        ));
    }

    #[tokio::test]
    async fn ngram_scores_are_deterministic() -> Result<()> {
        let scorer = SimilarityScorer::new(CharacterNgramEmbedder::default());
        let first = scorer.score("employee handbook vacation policy", "vacation days").await?;
        let second = scorer.score("employee handbook vacation policy", "vacation days").await?;
        assert!((first - second).abs() < 1e-6);

        let same = scorer.score("privacy notice", "privacy notice").await?;
        assert!((same - 1.0).abs() < 1e-4);
        Ok(())
    }
}
