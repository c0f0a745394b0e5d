use crate::error::ProcessingError;
use crate::models::UploadedFile;
use lopdf::Document;
use tracing::debug;

/// Text fragments reported for a single page, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub fragments: Vec<String>,
}

pub trait PdfTextSource {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, ProcessingError>;
}

/// Extracts page text with `lopdf`; every non-blank extracted line is one fragment.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfTextSource;

impl PdfTextSource for LopdfTextSource {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<PageText>, ProcessingError> {
        let document =
            Document::load_mem(bytes).map_err(|error| ProcessingError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| ProcessingError::PdfParse(error.to_string()))?;

            pages.push(PageText {
                number: page_no,
                fragments: text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect(),
            });
        }

        Ok(pages)
    }
}

pub struct DocumentLoader<P = LopdfTextSource> {
    pdf: P,
}

impl Default for DocumentLoader<LopdfTextSource> {
    fn default() -> Self {
        Self::new(LopdfTextSource)
    }
}

impl<P: PdfTextSource> DocumentLoader<P> {
    pub fn new(pdf: P) -> Self {
        Self { pdf }
    }

    /// Plain text of `file`. PDF pages are fragment-joined with spaces and each
    /// page is followed by one trailing space; other files are decoded as UTF-8
    /// without a leading byte order mark.
    pub fn load(&self, file: &UploadedFile) -> Result<String, ProcessingError> {
        if !file.is_pdf() {
            let text = String::from_utf8_lossy(&file.bytes);
            return Ok(text.strip_prefix('\u{feff}').unwrap_or(text.as_ref()).to_string());
        }

        let mut pages = self.pdf.extract_pages(&file.bytes)?;
        pages.sort_by_key(|page| page.number);
        debug!(file = %file.name, pages = pages.len(), "extracted pdf text");

        Ok(join_pages(&pages))
    }
}

pub fn join_pages(pages: &[PageText]) -> String {
    let mut text = String::new();
    for page in pages {
        text.push_str(&page.fragments.join(" "));
        text.push(' ');
    }
    text
}
