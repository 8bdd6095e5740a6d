//! Document-space to device-space geometry.
//!
//! Document space is measured in 1/72-inch units. Device space is pixels at
//! a caller-supplied DPI.

use serde::Serialize;

/// Document units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Two-corner rectangle in engine coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Smallest rectangle enclosing all the given points.
    pub fn enclosing(points: &[(f32, f32)]) -> Self {
        let mut rect = Self::new(f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for &(x, y) in points {
            rect.x0 = rect.x0.min(x);
            rect.y0 = rect.y0.min(y);
            rect.x1 = rect.x1.max(x);
            rect.y1 = rect.y1.max(y);
        }
        rect
    }
}

/// Origin plus extent, as sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviceRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl From<Rect> for DeviceRect {
    fn from(r: Rect) -> Self {
        Self {
            x: r.x0,
            y: r.y0,
            w: r.x1 - r.x0,
            h: r.y1 - r.y0,
        }
    }
}

/// Affine transform `[a b c d e f]`, row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Affine {
    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Uniform document-to-device scale for `dpi`.
    pub fn doc_to_device(dpi: f32) -> Self {
        let s = dpi / POINTS_PER_INCH;
        Self::scale(s, s)
    }

    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Transform all four corners and take the bounding box, so the result
    /// stays well-formed under flips.
    pub fn transform_rect(&self, r: Rect) -> Rect {
        Rect::enclosing(&[
            self.transform_point(r.x0, r.y0),
            self.transform_point(r.x1, r.y0),
            self.transform_point(r.x0, r.y1),
            self.transform_point(r.x1, r.y1),
        ])
    }

    /// Transform and convert to the wire rectangle in one step.
    pub fn project(&self, r: Rect) -> DeviceRect {
        self.transform_rect(r).into()
    }
}

/// Scale a document-space length to device pixels.
pub fn to_device(value: f32, dpi: f32) -> f32 {
    value * dpi / POINTS_PER_INCH
}
