pub const LOW_SIMILARITY_NOTICE: &str = "Low similarity detected. Consider refining your query.";

#[derive(Debug, Clone)]
pub struct ResponsePolicy {
    /// Scores strictly above this include a document excerpt.
    pub threshold: f32,
    pub excerpt_chars: usize,
    pub ellipsis: &'static str,
}

impl Default for ResponsePolicy {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            excerpt_chars: 500,
            ellipsis: "...",
        }
    }
}

impl ResponsePolicy {
    pub fn render(&self, score: f32, document_text: &str) -> String {
        let header = format!("Similarity score: {}", format_percentage(score));

        if score > self.threshold {
            let excerpt = document_text
                .chars()
                .take(self.excerpt_chars)
                .collect::<String>();
            format!(
                "{header}\n\nResponse based on document content:\n{excerpt}{}",
                self.ellipsis
            )
        } else {
            format!("{header}\n\n{LOW_SIMILARITY_NOTICE}")
        }
    }
}

pub fn format_percentage(score: f32) -> String {
    format!("{:.2}%", f64::from(score) * 100.0)
}
