//! Rectangle geometry.

use serde_json::{json, Map, Value};

use super::capability::{Resizable, Serializable};
use crate::error::RegionError;
use crate::geom::transform::dimension_to_percent;
use crate::geom::{CoordsType, MediaSize};

/// Rectangles narrower or shorter than this (in display pixels) are discarded
/// when drawing ends.
pub const MIN_SIZE: f64 = 3.0;

/// Normalizes an angle in degrees into `[0, 360)`.
pub fn normalize_rotation(degrees: f64) -> f64 {
    let r = degrees.rem_euclid(360.0);
    if r >= 360.0 {
        0.0
    } else {
        r
    }
}

/// An axis-aligned (optionally rotated) rectangle.
///
/// `x`, `y`, `width` and `height` are in the region's coordinate type. The
/// `relative_*` fields hold the percentage shadow used to recompute pixels
/// after a display resize.
#[derive(Clone, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees in `[0, 360)`.
    pub rotation: f64,
    /// Live transform scale, baked into width/height by [`Rect::commit_scale`].
    pub scale_x: f64,
    pub scale_y: f64,
    relative_x: f64,
    relative_y: f64,
    relative_width: f64,
    relative_height: f64,
}

impl Rect {
    /// Creates a rectangle from percentage values.
    pub fn from_percent(x: f64, y: f64, width: f64, height: f64, rotation: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotation: normalize_rotation(rotation),
            scale_x: 1.0,
            scale_y: 1.0,
            relative_x: x,
            relative_y: y,
            relative_width: width,
            relative_height: height,
        }
    }

    /// Creates a rectangle from display pixels.
    pub fn from_pixels(x: f64, y: f64, width: f64, height: f64, media: &MediaSize) -> Self {
        let mut rect = Self::from_percent(0.0, 0.0, 0.0, 0.0, 0.0);
        rect.set_position(x, y, width, height, 0.0, media);
        rect
    }

    /// Sets the pixel geometry and refreshes the percentage shadow.
    pub fn set_position(&mut self, x: f64, y: f64, width: f64, height: f64, rotation: f64, media: &MediaSize) {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self.rotation = normalize_rotation(rotation);
        self.sync_relative(media);
    }

    /// Applies a live transform scale without touching the base size.
    pub fn set_scale(&mut self, scale_x: f64, scale_y: f64) {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
    }

    /// Bakes the live scale into width and height.
    pub fn commit_scale(&mut self, media: &MediaSize) {
        self.width *= self.scale_x;
        self.height *= self.scale_y;
        self.scale_x = 1.0;
        self.scale_y = 1.0;
        self.sync_relative(media);
    }

    pub fn translate(&mut self, dx: f64, dy: f64, media: &MediaSize) {
        self.x += dx;
        self.y += dy;
        self.sync_relative(media);
    }

    /// Effective (scaled) width and height.
    pub fn scaled_size(&self) -> (f64, f64) {
        (self.width * self.scale_x, self.height * self.scale_y)
    }

    /// True when either effective dimension is below [`MIN_SIZE`].
    pub fn is_undersized(&self) -> bool {
        let (w, h) = self.scaled_size();
        w < MIN_SIZE || h < MIN_SIZE
    }

    /// Hit test in the rectangle's own (unrotated) frame.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (w, h) = self.scaled_size();
        let theta = -self.rotation.to_radians();
        let (dx, dy) = (x - self.x, y - self.y);
        let lx = dx * theta.cos() - dy * theta.sin();
        let ly = dx * theta.sin() + dy * theta.cos();
        (0.0..=w).contains(&lx) && (0.0..=h).contains(&ly)
    }

    fn sync_relative(&mut self, media: &MediaSize) {
        if !media.is_measured() {
            return;
        }
        self.relative_x = media.x_to_percent(self.x);
        self.relative_y = media.y_to_percent(self.y);
        self.relative_width = media.x_to_percent(self.width);
        self.relative_height = media.y_to_percent(self.height);
    }

    /// Percent-space (x, y, width, height) as written to the wire.
    pub fn percent_values(&self, coordstype: CoordsType, media: &MediaSize) -> (f64, f64, f64, f64) {
        match coordstype {
            CoordsType::Perc => (
                self.x,
                self.y,
                self.width * self.scale_x,
                self.height * self.scale_y,
            ),
            CoordsType::Px => (
                media.x_to_percent(self.x),
                media.y_to_percent(self.y),
                dimension_to_percent(self.width, self.scale_x, media.stage_width),
                dimension_to_percent(self.height, self.scale_y, media.stage_height),
            ),
        }
    }
}

impl Serializable for Rect {
    fn serialize(&self, coordstype: CoordsType, media: &MediaSize) -> Result<Map<String, Value>, RegionError> {
        if coordstype == CoordsType::Px && !media.is_measured() {
            return Err(RegionError::geometry(
                "rectangle is in pixels but the display size is unknown",
            ));
        }
        let (x, y, width, height) = self.percent_values(coordstype, media);
        let mut value = Map::new();
        value.insert("x".into(), json!(x));
        value.insert("y".into(), json!(y));
        value.insert("width".into(), json!(width));
        value.insert("height".into(), json!(height));
        value.insert("rotation".into(), json!(self.rotation));
        Ok(value)
    }
}

impl Resizable for Rect {
    fn update_image_size(&mut self, coordstype: CoordsType, media: &MediaSize) {
        if coordstype == CoordsType::Perc {
            self.relative_x = self.x;
            self.relative_y = self.y;
            self.relative_width = self.width;
            self.relative_height = self.height;
        }
        self.x = media.x_to_pixels(self.relative_x);
        self.y = media.y_to_pixels(self.relative_y);
        self.width = media.x_to_pixels(self.relative_width);
        self.height = media.y_to_pixels(self.relative_height);
    }
}
