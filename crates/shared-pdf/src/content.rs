//! Content stream construction for field overlays

use crate::font::encode_winansi;
use std::fmt::Write;

/// Bezier control-point distance for a quarter circle
const KAPPA: f64 = 0.552_284_749_8;

/// Format a number for a content stream: at most 4 decimals, no trailing zeros
pub fn num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let s = format!("{:.4}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Escape text for a PDF literal string in WinAnsi encoding.
///
/// Bytes above ASCII are written as octal escapes; characters WinAnsi
/// cannot represent become `?`.
pub fn escape_pdf_string(s: &str) -> String {
    let encoded = encode_winansi(s);
    let mut out = String::with_capacity(encoded.len());
    for byte in encoded {
        match byte {
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7E => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\{:03o}", byte);
            }
        }
    }
    out
}

/// Accumulates drawing operators for one page overlay
#[derive(Debug, Default, Clone)]
pub struct ContentBuilder {
    ops: String,
}

impl ContentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Paint an image XObject into the box (x, y, width, height)
    pub fn draw_xobject(&mut self, name: &str, x: f64, y: f64, width: f64, height: f64) {
        let _ = writeln!(
            self.ops,
            "q {} 0 0 {} {} {} cm /{} Do Q",
            num(width),
            num(height),
            num(x),
            num(y),
            name
        );
    }

    /// Show a single line of black text with its baseline at (x, y)
    pub fn draw_text(&mut self, font: &str, size: f64, x: f64, y: f64, text: &str) {
        let _ = writeln!(
            self.ops,
            "BT 0 g /{} {} Tf {} {} Td ({}) Tj ET",
            font,
            num(size),
            num(x),
            num(y),
            escape_pdf_string(text)
        );
    }

    /// Circle outline, black, `line_width` thick
    pub fn stroke_circle(&mut self, cx: f64, cy: f64, r: f64, line_width: f64) {
        self.ops.push_str("q 0 G ");
        let _ = writeln!(self.ops, "{} w", num(line_width));
        self.circle_path(cx, cy, r);
        self.ops.push_str("S Q\n");
    }

    /// Filled black disc
    pub fn fill_circle(&mut self, cx: f64, cy: f64, r: f64) {
        self.ops.push_str("q 0 g\n");
        self.circle_path(cx, cy, r);
        self.ops.push_str("f Q\n");
    }

    fn circle_path(&mut self, cx: f64, cy: f64, r: f64) {
        let k = r * KAPPA;
        let _ = writeln!(self.ops, "{} {} m", num(cx + r), num(cy));
        let _ = writeln!(
            self.ops,
            "{} {} {} {} {} {} c",
            num(cx + r),
            num(cy + k),
            num(cx + k),
            num(cy + r),
            num(cx),
            num(cy + r)
        );
        let _ = writeln!(
            self.ops,
            "{} {} {} {} {} {} c",
            num(cx - k),
            num(cy + r),
            num(cx - r),
            num(cy + k),
            num(cx - r),
            num(cy)
        );
        let _ = writeln!(
            self.ops,
            "{} {} {} {} {} {} c",
            num(cx - r),
            num(cy - k),
            num(cx - k),
            num(cy - r),
            num(cx),
            num(cy - r)
        );
        let _ = writeln!(
            self.ops,
            "{} {} {} {} {} {} c",
            num(cx + k),
            num(cy - r),
            num(cx + r),
            num(cy - k),
            num(cx + r),
            num(cy)
        );
        self.ops.push_str("h\n");
    }

    pub fn as_str(&self) -> &str {
        &self.ops
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.ops.into_bytes()
    }
}
