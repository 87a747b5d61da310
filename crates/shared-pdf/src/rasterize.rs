//! Field rasterization: draws submitted values onto PDF pages as fixed content
//!
//! Each field is drawn in input order onto its page's overlay. Overlays are
//! appended after the existing page content, wrapped so the original
//! graphics state cannot leak into them.

use crate::content::ContentBuilder;
use crate::error::PdfError;
use crate::fit::fit_in_bounds;
use crate::parser::{PageBox, PdfDocument};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use crate::font::text_width_em;
use image::io::{Limits, Reader};
use image::{DynamicImage, ImageError, ImageFormat, ImageResult};
use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream};
use serde::Serialize;
use shared_types::{FieldType, FieldValue, SubmittedValue};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use tracing::{debug, warn};

const FONT_NAME: &str = "FsHelv";
const DEFAULT_FONT_SIZE: f64 = 12.0;
const MIN_FONT_SIZE: f64 = 1.0;
/// Largest accepted width or height of a field image, in pixels
const MAX_IMAGE_SIDE: u32 = 4096;
/// Decoder allocation cap for a single field image
const MAX_IMAGE_ALLOC: u64 = 64 * 1024 * 1024;
const RADIO_INSET: f64 = 2.0;
const RADIO_INNER_RATIO: f64 = 0.6;
const RADIO_LINE_WIDTH: f64 = 1.0;

/// What to draw for one field, decided from its type and submitted value
#[derive(Debug, Clone, PartialEq)]
pub enum Mark {
    Signature(String),
    Image(String),
    Text(String),
    Date(String),
    Radio,
}

impl Mark {
    /// `None` means the field is skipped: empty strings, `false`, absent
    /// values, and anything but exactly `true` for radio fields.
    pub fn from_value(field_type: FieldType, value: Option<&SubmittedValue>) -> Option<Mark> {
        match (field_type, value?) {
            (FieldType::Radio, SubmittedValue::Flag(true)) => Some(Mark::Radio),
            (FieldType::Radio, _) => None,
            (_, SubmittedValue::Flag(_)) => None,
            (_, SubmittedValue::Text(s)) if s.is_empty() => None,
            (FieldType::Signature, SubmittedValue::Text(s)) => Some(Mark::Signature(s.clone())),
            (FieldType::Image, SubmittedValue::Text(s)) => Some(Mark::Image(s.clone())),
            (FieldType::Text, SubmittedValue::Text(s)) => Some(Mark::Text(s.clone())),
            (FieldType::Date, SubmittedValue::Text(s)) => Some(Mark::Date(s.clone())),
        }
    }
}

/// Why a field was skipped or drawn somewhere other than requested
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Payload was not a base64 PNG or JPEG; the field was skipped
    ImageDecode { reason: String },
    /// Page index outside the document; the field was drawn on page 1
    PageOutOfRange { requested: u32, page_count: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Position of the field in the submitted list
    pub index: usize,
    pub field_type: FieldType,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RasterReport {
    pub processed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct RasterizeOutcome {
    pub bytes: Vec<u8>,
    pub processed: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Drawing state for one page
struct PageOverlay {
    page_id: ObjectId,
    origin: PageBox,
    content: ContentBuilder,
    images: Vec<(String, ObjectId)>,
    uses_font: bool,
}

/// Load `pdf_bytes`, draw every non-empty field, and serialize the result.
///
/// Load and save failures are fatal. Undecodable images are skipped and
/// reported in the diagnostics.
pub fn rasterize(pdf_bytes: &[u8], fields: &[FieldValue]) -> Result<RasterizeOutcome, PdfError> {
    let mut pdf = PdfDocument::from_bytes(pdf_bytes)?;
    let report = rasterize_into(&mut pdf, fields)?;
    let bytes = pdf.save_to_bytes()?;
    Ok(RasterizeOutcome {
        bytes,
        processed: report.processed,
        diagnostics: report.diagnostics,
    })
}

/// Draw fields onto an already loaded document
pub fn rasterize_into(pdf: &mut PdfDocument, fields: &[FieldValue]) -> Result<RasterReport, PdfError> {
    let pages = pdf.page_ids();
    if pages.is_empty() {
        return Err(PdfError::NoPages);
    }
    let page_count = pages.len() as u32;

    let mut overlays: BTreeMap<usize, PageOverlay> = BTreeMap::new();
    let mut report = RasterReport::default();
    let mut image_count = 0usize;

    for (index, field) in fields.iter().enumerate() {
        let Some(mark) = Mark::from_value(field.field_type, field.value.as_ref()) else {
            continue;
        };

        let page_index = match page_index(field.page, pages.len()) {
            Some(i) => i,
            None => {
                warn!(
                    index,
                    requested = field.page,
                    page_count,
                    "Field page out of range, drawing on first page"
                );
                report.diagnostics.push(Diagnostic {
                    index,
                    field_type: field.field_type,
                    kind: DiagnosticKind::PageOutOfRange {
                        requested: field.page,
                        page_count,
                    },
                });
                0
            }
        };

        let page_id = pages[page_index];
        if !overlays.contains_key(&page_index) {
            let origin = pdf.page_box_by_id(page_id);
            overlays.insert(
                page_index,
                PageOverlay {
                    page_id,
                    origin,
                    content: ContentBuilder::new(),
                    images: Vec::new(),
                    uses_font: false,
                },
            );
        }
        let Some(overlay) = overlays.get_mut(&page_index) else {
            continue;
        };

        let x = field.x + overlay.origin.x;
        let y = field.y + overlay.origin.y;

        match mark {
            Mark::Signature(data) | Mark::Image(data) => {
                let image = match decode_image(&data) {
                    Ok(image) => image,
                    Err(reason) => {
                        warn!(index, field_type = %field.field_type, %reason, "Skipping undecodable image field");
                        report.diagnostics.push(Diagnostic {
                            index,
                            field_type: field.field_type,
                            kind: DiagnosticKind::ImageDecode { reason },
                        });
                        continue;
                    }
                };
                let image_id = embed_image(pdf, &image)?;
                let name = format!("FsIm{}", image_count);
                image_count += 1;

                let fit = fit_in_bounds(
                    image.width() as f64,
                    image.height() as f64,
                    field.width,
                    field.height,
                );
                overlay.content.draw_xobject(
                    &name,
                    x + fit.offset_x,
                    y + fit.offset_y,
                    fit.width,
                    fit.height,
                );
                overlay.images.push((name, image_id));
            }
            Mark::Text(text) | Mark::Date(text) => {
                draw_text_field(overlay, &text, x, y, field.width, field.height);
            }
            Mark::Radio => {
                let outer = radio_outer_radius(field.width, field.height);
                let cx = x + field.width / 2.0;
                let cy = y + field.height / 2.0;
                overlay.content.stroke_circle(cx, cy, outer, RADIO_LINE_WIDTH);
                overlay.content.fill_circle(cx, cy, outer * RADIO_INNER_RATIO);
            }
        }
        report.processed += 1;
    }

    let mut font_id = None;
    for overlay in overlays.into_values() {
        if overlay.content.is_empty() {
            continue;
        }
        let font = if overlay.uses_font {
            Some(*font_id.get_or_insert_with(|| add_font(pdf)))
        } else {
            None
        };
        apply_overlay(pdf, overlay, font)?;
    }

    debug!(
        processed = report.processed,
        skipped = fields.len() - report.processed,
        "Rasterized fields"
    );
    Ok(report)
}

/// 0-based page index, or `None` when `page` is outside 1..=page_count
fn page_index(page: u32, page_count: usize) -> Option<usize> {
    let index = page.checked_sub(1)? as usize;
    (index < page_count).then_some(index)
}

/// Outer radius of a radio mark, inset from the smaller box side
pub fn radio_outer_radius(width: f64, height: f64) -> f64 {
    (width.min(height) / 2.0 - RADIO_INSET).max(0.0)
}

/// Font size for a single line of text in a box: at most 12pt, at most 60%
/// of the box height, and narrow enough for the Helvetica advance width of
/// the text to fit the box width.
pub fn text_font_size(text: &str, width: f64, height: f64) -> f64 {
    let mut size = DEFAULT_FONT_SIZE.min(height * 0.6);
    let em = text_width_em(text);
    if em > 0.0 && width > 0.0 {
        size = size.min(width / em);
    }
    size.max(MIN_FONT_SIZE)
}

fn draw_text_field(overlay: &mut PageOverlay, text: &str, x: f64, y: f64, width: f64, height: f64) {
    let size = text_font_size(text, width, height);
    let baseline = y + height / 2.0 - size / 3.0;
    overlay.content.draw_text(FONT_NAME, size, x, baseline, text);
    overlay.uses_font = true;
}

/// Decode a data URL (or bare base64) into raw bytes
fn decode_data_url(value: &str) -> Result<Vec<u8>, String> {
    let payload = match value.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => value,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(cleaned)
        .map_err(|e| format!("invalid base64 payload: {}", e))
}

fn image_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_SIDE);
    limits.max_image_height = Some(MAX_IMAGE_SIDE);
    limits.max_alloc = Some(MAX_IMAGE_ALLOC);
    limits
}

fn decode_limited(bytes: &[u8], format: ImageFormat) -> ImageResult<DynamicImage> {
    let mut reader = Reader::with_format(Cursor::new(bytes), format);
    reader.limits(image_limits());
    reader.decode()
}

fn decode_reason(err: ImageError) -> String {
    match err {
        ImageError::Limits(e) => format!("image exceeds size limits: {}", e),
        other => format!("not a PNG or JPEG image: {}", other),
    }
}

/// PNG first, then JPEG, both under the field image size limits
fn decode_image(value: &str) -> Result<DynamicImage, String> {
    let bytes = decode_data_url(value)?;
    match decode_limited(&bytes, ImageFormat::Png) {
        Ok(image) => Ok(image),
        Err(e @ ImageError::Limits(_)) => Err(decode_reason(e)),
        Err(_) => decode_limited(&bytes, ImageFormat::Jpeg).map_err(decode_reason),
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, PdfError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| PdfError::Save(format!("image compression failed: {}", e)))
}

/// Add the image as an RGB XObject, with a soft mask when it has transparency
fn embed_image(pdf: &mut PdfDocument, image: &DynamicImage) -> Result<ObjectId, PdfError> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };

    if alpha.iter().any(|&a| a != u8::MAX) {
        let smask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            deflate(&alpha)?,
        );
        let smask_id = pdf.doc.add_object(smask);
        image_dict.set("SMask", smask_id);
    }

    Ok(pdf.doc.add_object(Stream::new(image_dict, deflate(&rgb)?)))
}

fn add_font(pdf: &mut PdfDocument) -> ObjectId {
    pdf.doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Resolved copy of a resources sub-dictionary (XObject, Font)
fn sub_dict(pdf: &PdfDocument, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .and_then(|obj| pdf.resolve(obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default()
}

/// Register the overlay's resources on the page and append its content.
///
/// Resources are copied inline onto the page so dictionaries shared with
/// other pages are never modified.
fn apply_overlay(
    pdf: &mut PdfDocument,
    overlay: PageOverlay,
    font_id: Option<ObjectId>,
) -> Result<(), PdfError> {
    let page_id = overlay.page_id;

    let mut resources = pdf
        .inherited(page_id, b"Resources")
        .and_then(|obj| pdf.resolve(obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    if !overlay.images.is_empty() {
        let mut xobjects = sub_dict(pdf, &resources, b"XObject");
        for (name, id) in &overlay.images {
            xobjects.set(name.as_bytes().to_vec(), Object::Reference(*id));
        }
        resources.set("XObject", xobjects);
    }
    if let Some(font_id) = font_id {
        let mut fonts = sub_dict(pdf, &resources, b"Font");
        fonts.set(FONT_NAME, Object::Reference(font_id));
        resources.set("Font", fonts);
    }

    let existing: Vec<Object> = match pdf
        .dict(page_id)
        .and_then(|page| page.get(b"Contents").ok())
    {
        Some(Object::Reference(id)) => match pdf.doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Some(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let mut ops = b"\nQ\n".to_vec();
    ops.extend(overlay.content.into_bytes());
    let save_id = pdf.doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let overlay_id = pdf.doc.add_object(Stream::new(dictionary! {}, ops));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(overlay_id));

    let page = pdf
        .doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PdfError::MalformedPage(e.to_string()))?;
    page.set("Resources", resources);
    page.set("Contents", contents);
    Ok(())
}
