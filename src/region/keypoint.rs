//! Single-point regions.

use serde_json::{json, Map, Value};

use super::capability::{Resizable, Serializable};
use crate::error::RegionError;
use crate::geom::{CoordsType, MediaSize};

/// Radius in display pixels used when the control sets no `strokeWidth`.
pub const DEFAULT_WIDTH: f64 = 5.0;

#[derive(Clone, Debug, PartialEq)]
pub struct KeyPoint {
    pub x: f64,
    pub y: f64,
    /// Radius.
    pub width: f64,
    relative_x: f64,
    relative_y: f64,
    relative_width: f64,
}

impl KeyPoint {
    pub fn from_percent(x: f64, y: f64, width: f64) -> Self {
        Self {
            x,
            y,
            width,
            relative_x: x,
            relative_y: y,
            relative_width: width,
        }
    }

    pub fn from_pixels(x: f64, y: f64, width: f64, media: &MediaSize) -> Self {
        let mut point = Self::from_percent(x, y, width);
        point.sync_relative(media);
        point
    }

    pub fn set_position(&mut self, x: f64, y: f64, media: &MediaSize) {
        self.x = x;
        self.y = y;
        self.sync_relative(media);
    }

    pub fn translate(&mut self, dx: f64, dy: f64, media: &MediaSize) {
        self.set_position(self.x + dx, self.y + dy, media);
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (dx, dy) = (x - self.x, y - self.y);
        dx * dx + dy * dy <= self.width * self.width
    }

    fn sync_relative(&mut self, media: &MediaSize) {
        if media.is_measured() {
            self.relative_x = media.x_to_percent(self.x);
            self.relative_y = media.y_to_percent(self.y);
            self.relative_width = media.x_to_percent(self.width);
        }
    }
}

impl Serializable for KeyPoint {
    fn serialize(&self, coordstype: CoordsType, media: &MediaSize) -> Result<Map<String, Value>, RegionError> {
        let (x, y, width) = match coordstype {
            CoordsType::Perc => (self.x, self.y, self.width),
            CoordsType::Px if media.is_measured() => (
                media.x_to_percent(self.x),
                media.y_to_percent(self.y),
                media.x_to_percent(self.width),
            ),
            CoordsType::Px => {
                return Err(RegionError::geometry(
                    "keypoint is in pixels but the display size is unknown",
                ))
            }
        };
        let mut value = Map::new();
        value.insert("x".into(), json!(x));
        value.insert("y".into(), json!(y));
        value.insert("width".into(), json!(width));
        Ok(value)
    }
}

impl Resizable for KeyPoint {
    fn update_image_size(&mut self, coordstype: CoordsType, media: &MediaSize) {
        if coordstype == CoordsType::Perc {
            self.relative_x = self.x;
            self.relative_y = self.y;
            self.relative_width = self.width;
        }
        self.x = media.x_to_pixels(self.relative_x);
        self.y = media.y_to_pixels(self.relative_y);
        self.width = media.x_to_pixels(self.relative_width);
    }
}
