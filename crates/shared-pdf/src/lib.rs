//! PDF handling for formsign
//!
//! Loads source PDFs with lopdf, resolves page geometry, and rasterizes
//! submitted field values onto pages.
//!
//! - [`parser`]: `PdfDocument` wrapper, page boxes, page geometry resolution
//! - [`rasterize`]: the signing engine (images, text, dates, radio marks)
//! - [`fit`]: aspect-preserving fit of an image into a field box
//! - [`font`]: WinAnsi encoding and Helvetica widths for overlay text
//! - [`placeholder`]: minimal stand-in PDF when no source is available

pub mod content;
pub mod error;
pub mod fit;
pub mod font;
pub mod parser;
pub mod placeholder;
pub mod rasterize;

pub use error::PdfError;
pub use fit::{fit_in_bounds, FittedImage};
pub use parser::{PageBox, PdfDocument};
pub use placeholder::placeholder_pdf;
pub use rasterize::{rasterize, rasterize_into, Diagnostic, DiagnosticKind, Mark, RasterReport, RasterizeOutcome};
