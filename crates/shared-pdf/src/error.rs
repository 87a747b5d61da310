use shared_types::GeometryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("Failed to parse PDF: {0}")]
    Load(String),

    #[error("PDF has no pages")]
    NoPages,

    #[error("Page {page} not found (document has {page_count} pages)")]
    PageNotFound { page: u32, page_count: u32 },

    #[error("Malformed page object: {0}")]
    MalformedPage(String),

    #[error("Failed to save PDF: {0}")]
    Save(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
