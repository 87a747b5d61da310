//! PDF parsing and page geometry using lopdf

use crate::error::PdfError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use shared_types::PageGeometry;

/// Pages tree depth limit when walking inherited attributes
const MAX_INHERIT_DEPTH: usize = 32;

/// US Letter, used when a page carries no usable box at all
const DEFAULT_PAGE_BOX: PageBox = PageBox {
    x: 0.0,
    y: 0.0,
    width: 612.0,
    height: 792.0,
};

/// Visible page area in PDF points: lower-left corner plus size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Wrapper around lopdf::Document
pub struct PdfDocument {
    pub(crate) doc: Document,
}

impl PdfDocument {
    /// Load a PDF from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let doc = Document::load_mem(bytes).map_err(|e| PdfError::Load(e.to_string()))?;
        Ok(Self { doc })
    }

    /// Get the number of pages
    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Page object ids in page order
    pub fn page_ids(&self) -> Vec<ObjectId> {
        self.doc.get_pages().into_values().collect()
    }

    /// Get page object ID for a given page number (1-indexed)
    pub fn page_id(&self, page_num: u32) -> Option<ObjectId> {
        self.doc.get_pages().get(&page_num).copied()
    }

    /// Visible box of a page (1-indexed): CropBox when present, else MediaBox.
    ///
    /// Both are inheritable, so the Pages tree is walked upward. Pages with
    /// no usable box are treated as US Letter.
    pub fn page_box(&self, page_num: u32) -> Result<PageBox, PdfError> {
        let page_id = self.page_id(page_num).ok_or(PdfError::PageNotFound {
            page: page_num,
            page_count: self.page_count(),
        })?;
        Ok(self.page_box_by_id(page_id))
    }

    pub(crate) fn page_box_by_id(&self, page_id: ObjectId) -> PageBox {
        self.inherited(page_id, b"CropBox")
            .and_then(|obj| self.parse_rect(obj))
            .or_else(|| {
                self.inherited(page_id, b"MediaBox")
                    .and_then(|obj| self.parse_rect(obj))
            })
            .unwrap_or(DEFAULT_PAGE_BOX)
    }

    /// Resolve the geometry of a page rendered `render_width` pixels wide.
    ///
    /// Recompute whenever the render width or the page changes: pages in
    /// one document may have different sizes.
    pub fn page_geometry(&self, page_num: u32, render_width: f64) -> Result<PageGeometry, PdfError> {
        let page_box = self.page_box(page_num)?;
        Ok(PageGeometry::new(
            page_num,
            page_box.width,
            page_box.height,
            render_width,
        )?)
    }

    /// Look up a possibly inherited page attribute
    pub(crate) fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = Some(page_id);
        for _ in 0..MAX_INHERIT_DEPTH {
            let dict = self.dict(current?)?;
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            current = dict.get(b"Parent").and_then(Object::as_reference).ok();
        }
        None
    }

    pub(crate) fn dict(&self, id: ObjectId) -> Option<&Dictionary> {
        self.doc.get_object(id).and_then(Object::as_dict).ok()
    }

    /// Follow a reference if `obj` is one
    pub(crate) fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).ok(),
            other => Some(other),
        }
    }

    /// Parse a PDF rectangle array into a normalized box
    fn parse_rect(&self, obj: &Object) -> Option<PageBox> {
        let arr = self.resolve(obj)?.as_array().ok()?;
        if arr.len() != 4 {
            return None;
        }

        let mut values = [0.0f64; 4];
        for (i, item) in arr.iter().enumerate() {
            values[i] = self.extract_number(item)?;
        }

        let [x1, y1, x2, y2] = values;
        let page_box = PageBox {
            x: x1.min(x2),
            y: y1.min(y2),
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        };
        (page_box.width > 0.0 && page_box.height > 0.0).then_some(page_box)
    }

    /// Extract a number from a PDF object
    fn extract_number(&self, obj: &Object) -> Option<f64> {
        match self.resolve(obj)? {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r as f64),
            _ => None,
        }
    }

    /// Get mutable access to the internal document
    pub fn doc_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// Save the document to bytes
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, PdfError> {
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| PdfError::Save(e.to_string()))?;
        Ok(buffer)
    }
}

/// Build a document whose pages have the given MediaBoxes, for tests
#[cfg(test)]
pub(crate) fn test_pdf(media_boxes: &[[i64; 4]]) -> Vec<u8> {
    use lopdf::{dictionary, Stream};

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for mb in media_boxes {
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            b"BT /F1 12 Tf 72 720 Td (Original) Tj ET".to_vec(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![mb[0].into(), mb[1].into(), mb[2].into(), mb[3].into()],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => dictionary! {
                "Font" => dictionary! {
                    "F1" => dictionary! {
                        "Type" => "Font",
                        "Subtype" => "Type1",
                        "BaseFont" => "Helvetica",
                    },
                },
            },
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}
