use crate::error::{ProcessingError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;
pub const DEFAULT_HTTP_MODEL: &str = "all-MiniLM-L6-v2";

/// A loaded embedding model: one vector per input text, same order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[async_trait]
impl Embedder for Box<dyn Embedder> {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts).await
    }
}

/// Produces the model behind a scorer. Called at most once per scorer.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    type Model: Embedder;

    async fn load(&self) -> Result<Self::Model>;
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    /// Hashed character trigram counts, scaled to unit length.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let buckets = self.dimensions.max(1);
        let mut vector = vec![0f32; buckets];
        let chars = text.to_lowercase().chars().collect::<Vec<_>>();

        for trigram in chars.windows(3) {
            let bucket = trigram_hash(trigram) % buckets as u64;
            vector[bucket as usize] += 1.0;
        }

        scale_to_unit(&mut vector);
        vector
    }
}

// FNV-1a over the UTF-8 bytes of the trigram.
fn trigram_hash(trigram: &[char]) -> u64 {
    let mut buffer = [0u8; 4];
    trigram.iter().fold(0xcbf2_9ce4_8422_2325, |hash, ch| {
        ch.encode_utf8(&mut buffer)
            .bytes()
            .fold(hash, |acc, byte| (acc ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3))
    })
}

fn scale_to_unit(vector: &mut [f32]) {
    let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|value| *value /= norm);
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

#[async_trait]
impl ModelLoader for CharacterNgramEmbedder {
    type Model = Self;

    async fn load(&self) -> Result<Self::Model> {
        Ok(*self)
    }
}

#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
pub struct HttpEmbedder {
    url: Url,
    model: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(config: &HttpEmbedderConfig) -> Result<Self> {
        Ok(Self {
            url: embeddings_url(&config.endpoint)?,
            model: config.model.clone(),
            api_key: config
                .api_key
                .as_ref()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            client: Client::new(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(self.url.clone())
            .header("content-type", "application/json")
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            });

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ProcessingError::Embedding(format!(
                "embedding request to {} returned {}",
                self.url,
                response.status()
            )));
        }

        let payload: EmbeddingResponse = response.json().await?;
        vectors_from_response(payload, texts.len())
    }
}

/// Loads an [`HttpEmbedder`] and checks the endpoint with a one-text request.
#[derive(Debug, Clone)]
pub struct HttpModelLoader {
    pub config: HttpEmbedderConfig,
}

#[async_trait]
impl ModelLoader for HttpModelLoader {
    type Model = HttpEmbedder;

    async fn load(&self) -> Result<Self::Model> {
        let embedder = HttpEmbedder::new(&self.config)?;
        let probe = embedder
            .embed_batch(&["warmup".to_string()])
            .await
            .map_err(|error| ProcessingError::ModelLoad(error.to_string()))?;

        info!(
            url = %embedder.url(),
            model = %self.config.model,
            dimensions = probe.first().map(Vec::len).unwrap_or_default(),
            "remote embedding model ready"
        );
        Ok(embedder)
    }
}

/// Either embedding backend, picked at runtime from configuration.
#[derive(Debug, Clone)]
pub enum ModelSource {
    Local(CharacterNgramEmbedder),
    Http(HttpEmbedderConfig),
}

#[async_trait]
impl ModelLoader for ModelSource {
    type Model = Box<dyn Embedder>;

    async fn load(&self) -> Result<Self::Model> {
        match self {
            ModelSource::Local(embedder) => {
                debug!(dimensions = embedder.dimensions, "using local n-gram embedder");
                let model: Box<dyn Embedder> = Box::new(*embedder);
                Ok(model)
            }
            ModelSource::Http(config) => {
                let loader = HttpModelLoader {
                    config: config.clone(),
                };
                let model: Box<dyn Embedder> = Box::new(loader.load().await?);
                Ok(model)
            }
        }
    }
}

fn embeddings_url(endpoint: &str) -> Result<Url> {
    let base = endpoint.trim().trim_end_matches('/');
    if base.ends_with("/embeddings") {
        return Ok(Url::parse(base)?);
    }
    Ok(Url::parse(&format!("{base}/embeddings"))?)
}

fn vectors_from_response(payload: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if payload.data.len() != expected {
        return Err(ProcessingError::Embedding(format!(
            "expected {expected} embeddings, got {}",
            payload.data.len()
        )));
    }

    let mut data = payload.data;
    if data.iter().all(|item| item.index.is_some()) {
        data.sort_by_key(|item| item.index);
    }

    Ok(data.into_iter().map(|item| item.embedding).collect())
}
