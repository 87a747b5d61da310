//! Coordinate transformation between percent, screen and PDF spaces
//!
//! Three spaces describe the same field rectangle:
//!
//! - [`Percent`]: 0-100 of the page size, origin bottom-left. This is the
//!   only form that is ever persisted.
//! - [`Screen`]: pixels at the current render width, origin top-left.
//! - [`PdfPoints`]: 1/72 inch, origin bottom-left, intrinsic to the page.
//!
//! Every conversion takes the [`PageGeometry`] of the page the rectangle
//! lives on. Division only ever happens by page dimensions, so zero-area
//! rectangles convert cleanly. Negative sizes are carried through untouched.

use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use thiserror::Error;

/// Percent of page size, bottom-left origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Percent;

/// On-screen pixels, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Screen;

/// PDF user-space points, bottom-left origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PdfPoints;

/// Axis-aligned rectangle tagged with the coordinate space it is expressed in.
///
/// `x`/`y` locate the origin-side corner: top-left for [`Screen`],
/// bottom-left for [`Percent`] and [`PdfPoints`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Rect<S> {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(skip)]
    space: PhantomData<S>,
}

impl<S> Rect<S> {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            space: PhantomData,
        }
    }

    /// True when every component is a finite number
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("{name} must be a positive finite number, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("Page numbers start at 1")]
    InvalidPageNumber,
}

/// Geometry of one page at one render width.
///
/// Always derived on demand from the page's intrinsic size and the chosen
/// render width; never persisted. Scaling is uniform: the same `scale` maps
/// both axes from points to pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub page_number: u32,
    pub width_points: f64,
    pub height_points: f64,
    pub width_pixels: f64,
    pub height_pixels: f64,
    pub scale: f64,
}

fn positive(name: &'static str, value: f64) -> Result<f64, GeometryError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(GeometryError::NonPositive { name, value })
    }
}

impl PageGeometry {
    /// Build the geometry of a page rendered at `render_width` pixels.
    pub fn new(
        page_number: u32,
        width_points: f64,
        height_points: f64,
        render_width: f64,
    ) -> Result<Self, GeometryError> {
        if page_number == 0 {
            return Err(GeometryError::InvalidPageNumber);
        }
        let width_points = positive("width_points", width_points)?;
        let height_points = positive("height_points", height_points)?;
        let render_width = positive("render_width", render_width)?;

        let scale = render_width / width_points;
        Ok(Self {
            page_number,
            width_points,
            height_points,
            width_pixels: render_width,
            height_pixels: height_points * scale,
            scale,
        })
    }

    /// Same page, different render width.
    pub fn with_render_width(&self, render_width: f64) -> Result<Self, GeometryError> {
        Self::new(
            self.page_number,
            self.width_points,
            self.height_points,
            render_width,
        )
    }

    pub fn is_well_formed(&self) -> bool {
        [
            self.width_points,
            self.height_points,
            self.width_pixels,
            self.height_pixels,
        ]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0)
    }
}

/// Screen pixels (top-left) to PDF points (bottom-left)
pub fn screen_to_pdf(rect: &Rect<Screen>, geom: &PageGeometry) -> Rect<PdfPoints> {
    let sx = geom.width_points / geom.width_pixels;
    let sy = geom.height_points / geom.height_pixels;

    // Bottom edge of the rectangle, still in pixels
    let bottom_px = geom.height_pixels - rect.y - rect.height;

    Rect::new(rect.x * sx, bottom_px * sy, rect.width * sx, rect.height * sy)
}

/// PDF points (bottom-left) to screen pixels (top-left)
pub fn pdf_to_screen(rect: &Rect<PdfPoints>, geom: &PageGeometry) -> Rect<Screen> {
    let sx = geom.width_pixels / geom.width_points;
    let sy = geom.height_pixels / geom.height_points;

    let bottom_px = rect.y * sy;
    let height_px = rect.height * sy;

    Rect::new(
        rect.x * sx,
        geom.height_pixels - bottom_px - height_px,
        rect.width * sx,
        height_px,
    )
}

/// Screen pixels to percent, measuring y from the bottom of the page
pub fn screen_to_percent(rect: &Rect<Screen>, geom: &PageGeometry) -> Rect<Percent> {
    let top_pct = rect.y / geom.height_pixels * 100.0;
    let height_pct = rect.height / geom.height_pixels * 100.0;

    Rect::new(
        rect.x / geom.width_pixels * 100.0,
        100.0 - top_pct - height_pct,
        rect.width / geom.width_pixels * 100.0,
        height_pct,
    )
}

/// Percent to screen pixels
pub fn percent_to_screen(rect: &Rect<Percent>, geom: &PageGeometry) -> Rect<Screen> {
    let y_from_bottom = rect.y / 100.0 * geom.height_pixels;
    let height_px = rect.height / 100.0 * geom.height_pixels;

    Rect::new(
        rect.x / 100.0 * geom.width_pixels,
        geom.height_pixels - y_from_bottom - height_px,
        rect.width / 100.0 * geom.width_pixels,
        height_px,
    )
}

/// Percent to PDF points. Both spaces are bottom-origin, so no flip.
pub fn percent_to_pdf(rect: &Rect<Percent>, geom: &PageGeometry) -> Rect<PdfPoints> {
    let sx = geom.width_points / 100.0;
    let sy = geom.height_points / 100.0;
    Rect::new(rect.x * sx, rect.y * sy, rect.width * sx, rect.height * sy)
}

/// PDF points to percent
pub fn pdf_to_percent(rect: &Rect<PdfPoints>, geom: &PageGeometry) -> Rect<Percent> {
    let sx = 100.0 / geom.width_points;
    let sy = 100.0 / geom.height_points;
    Rect::new(rect.x * sx, rect.y * sy, rect.width * sx, rect.height * sy)
}
