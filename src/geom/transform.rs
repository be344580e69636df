//! Conversions between natural media pixels, display pixels and percentages.
//!
//! All functions here are pure. Percentages are always relative to the media
//! (natural and display sizes are proportional), so the display size is the
//! divisor when converting from display pixels.

use serde::{Deserialize, Serialize};

/// Natural sizes at or below this value mean "not measured yet".
pub const MIN_MEASURED_SIZE: f64 = 1.0;

/// Converts a pixel value to a percentage of `axis_size`.
#[inline]
pub fn to_percent(value: f64, axis_size: f64) -> f64 {
    value / axis_size * 100.0
}

/// Converts a percentage of `axis_size` back to pixels.
#[inline]
pub fn to_pixels(percent: f64, axis_size: f64) -> f64 {
    percent / 100.0 * axis_size
}

/// Converts a dimension (width or height) to a percentage after applying the
/// region's live scale factor.
#[inline]
pub fn dimension_to_percent(value: f64, scale: f64, axis_size: f64) -> f64 {
    to_percent(value * scale, axis_size)
}

/// Which coordinate fields of a region are authoritative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordsType {
    /// Display pixels; percentages are derived.
    #[default]
    Px,
    /// Percentages; pixels are derived once the media is measured.
    Perc,
}

/// Natural and display dimensions of a labeled object.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MediaSize {
    pub natural_width: f64,
    pub natural_height: f64,
    pub stage_width: f64,
    pub stage_height: f64,
}

impl MediaSize {
    /// Creates a media size from natural and display dimensions.
    pub fn new(natural_width: f64, natural_height: f64, stage_width: f64, stage_height: f64) -> Self {
        Self {
            natural_width,
            natural_height,
            stage_width,
            stage_height,
        }
    }

    /// Media displayed at its natural size.
    pub fn natural(width: f64, height: f64) -> Self {
        Self::new(width, height, width, height)
    }

    /// Returns true once both natural and display sizes are usable.
    pub fn is_measured(&self) -> bool {
        self.natural_width > MIN_MEASURED_SIZE
            && self.natural_height > MIN_MEASURED_SIZE
            && self.stage_width > 0.0
            && self.stage_height > 0.0
    }

    /// Display pixels per natural pixel along x.
    pub fn scale_x(&self) -> f64 {
        self.stage_width / self.natural_width
    }

    /// Display pixels per natural pixel along y.
    pub fn scale_y(&self) -> f64 {
        self.stage_height / self.natural_height
    }

    pub fn x_to_percent(&self, x: f64) -> f64 {
        to_percent(x, self.stage_width)
    }

    pub fn y_to_percent(&self, y: f64) -> f64 {
        to_percent(y, self.stage_height)
    }

    pub fn x_to_pixels(&self, percent: f64) -> f64 {
        to_pixels(percent, self.stage_width)
    }

    pub fn y_to_pixels(&self, percent: f64) -> f64 {
        to_pixels(percent, self.stage_height)
    }

    /// Maps a display point to natural media pixels.
    pub fn stage_to_natural(&self, x: f64, y: f64) -> (f64, f64) {
        (x / self.scale_x(), y / self.scale_y())
    }

    /// Maps a natural media point to display pixels.
    pub fn natural_to_stage(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale_x(), y * self.scale_y())
    }

    /// Clamps a display point into the stage rectangle.
    pub fn clamp_to_stage(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x.clamp(0.0, self.stage_width.max(0.0)),
            y.clamp(0.0, self.stage_height.max(0.0)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_axis() {
        assert_eq!(to_percent(50.0, 200.0), 25.0);
        assert_eq!(to_pixels(25.0, 200.0), 50.0);
    }

    #[test]
    fn dimension_uses_scale() {
        assert_eq!(dimension_to_percent(10.0, 2.0, 100.0), 20.0);
    }

    #[test]
    fn unmeasured_media_is_detected() {
        assert!(!MediaSize::default().is_measured());
        assert!(!MediaSize::new(1.0, 1.0, 100.0, 100.0).is_measured());
        assert!(!MediaSize::new(640.0, 480.0, 0.0, 0.0).is_measured());
        assert!(MediaSize::new(640.0, 480.0, 320.0, 240.0).is_measured());
    }

    #[test]
    fn stage_natural_mapping() {
        let media = MediaSize::new(1000.0, 500.0, 500.0, 250.0);
        assert_eq!(media.stage_to_natural(100.0, 50.0), (200.0, 100.0));
        assert_eq!(media.natural_to_stage(200.0, 100.0), (100.0, 50.0));
    }

    #[test]
    fn coordstype_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&CoordsType::Perc).unwrap(), "\"perc\"");
    }
}
