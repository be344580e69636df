//! Freehand masks built from strokes.
//!
//! Stroke points are kept in natural media pixels so the mask does not
//! depend on the display size. The persisted form is an RLE of the
//! rasterised single-channel mask.

use image::{GrayImage, Luma};
use serde_json::{json, Map, Value};

use super::capability::Serializable;
use super::rle;
use crate::error::RegionError;
use crate::geom::{CoordsType, MediaSize};

/// Stroke width in display pixels used when the control sets none.
pub const DEFAULT_STROKE_WIDTH: f64 = 15.0;

const FILLED: u8 = 255;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrokeKind {
    Add,
    Eraser,
}

/// One pointer-down to pointer-up gesture.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    pub kind: StrokeKind,
    /// Width in natural pixels.
    pub width: f64,
    /// Flat `x, y` pairs in natural pixels.
    pub points: Vec<f64>,
}

impl Stroke {
    pub fn new(kind: StrokeKind, width: f64) -> Self {
        Self {
            kind,
            width,
            points: Vec::new(),
        }
    }

    pub fn add_point(&mut self, x: f64, y: f64) {
        self.points.push(x);
        self.points.push(y);
    }

    pub fn pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    fn stamp(&self, mask: &mut GrayImage) {
        let value = match self.kind {
            StrokeKind::Add => FILLED,
            StrokeKind::Eraser => 0,
        };
        let radius = (self.width / 2.0).max(0.5);
        let step = (radius / 2.0).max(0.5);
        let mut prev: Option<(f64, f64)> = None;
        for (x, y) in self.pairs() {
            match prev {
                None => stamp_disc(mask, x, y, radius, value),
                Some((px, py)) => {
                    let dist = ((x - px).powi(2) + (y - py).powi(2)).sqrt();
                    let steps = (dist / step).ceil().max(1.0) as usize;
                    for i in 1..=steps {
                        let t = i as f64 / steps as f64;
                        stamp_disc(mask, px + (x - px) * t, py + (y - py) * t, radius, value);
                    }
                }
            }
            prev = Some((x, y));
        }
    }
}

fn stamp_disc(mask: &mut GrayImage, cx: f64, cy: f64, radius: f64, value: u8) {
    let (w, h) = mask.dimensions();
    let x0 = (cx - radius).floor().max(0.0) as u32;
    let y0 = (cy - radius).floor().max(0.0) as u32;
    let x1 = ((cx + radius).ceil().max(0.0) as u32).min(w);
    let y1 = ((cy + radius).ceil().max(0.0) as u32).min(h);
    let r_sq = radius * radius;
    for y in y0..y1 {
        for x in x0..x1 {
            let (dx, dy) = (x as f64 + 0.5 - cx, y as f64 + 0.5 - cy);
            if dx * dx + dy * dy <= r_sq {
                mask.put_pixel(x, y, Luma([value]));
            }
        }
    }
}

/// A brush region: an optional restored mask plus strokes drawn on top.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Brush {
    pub strokes: Vec<Stroke>,
    /// Mask restored from the wire, if any.
    pub rle: Option<Vec<u32>>,
    /// Natural-pixel offset applied to the restored mask by moves.
    offset: (f64, f64),
}

impl Brush {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rle(rle: Vec<u32>) -> Self {
        Self {
            rle: Some(rle),
            ..Self::default()
        }
    }

    pub fn begin_stroke(&mut self, kind: StrokeKind, width: f64) {
        self.strokes.push(Stroke::new(kind, width));
    }

    /// Appends a natural-pixel point to the current stroke.
    pub fn add_point(&mut self, x: f64, y: f64) -> Result<(), RegionError> {
        let stroke = self
            .strokes
            .last_mut()
            .ok_or_else(|| RegionError::geometry("brush has no open stroke"))?;
        stroke.add_point(x, y);
        Ok(())
    }

    /// True once anything has been painted or restored.
    pub fn has_content(&self) -> bool {
        self.rle.is_some()
            || self
                .strokes
                .iter()
                .any(|s| s.kind == StrokeKind::Add && !s.points.is_empty())
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        for stroke in &mut self.strokes {
            for (i, v) in stroke.points.iter_mut().enumerate() {
                *v += if i % 2 == 0 { dx } else { dy };
            }
        }
        self.offset.0 += dx;
        self.offset.1 += dy;
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.rle = None;
        self.offset = (0.0, 0.0);
    }

    /// Whole-pixel shift of the restored mask.
    fn pixel_offset(&self) -> (i64, i64) {
        (self.offset.0.round() as i64, self.offset.1.round() as i64)
    }

    /// Checks the restored mask against the measured media. Unmeasured
    /// media passes.
    pub fn check_rle(&self, media: &MediaSize) -> Result<(), RegionError> {
        match &self.rle {
            Some(pairs) if media.is_measured() => {
                let (w, h) = natural_dims(media);
                rle::check_cover(pairs, w, h)
            }
            _ => Ok(()),
        }
    }

    /// Rasterises the mask at natural resolution.
    pub fn rasterize(&self, width: u32, height: u32) -> Result<GrayImage, RegionError> {
        let mut mask = match &self.rle {
            Some(pairs) => shifted(&rle::decode_mask(pairs, width, height)?, self.pixel_offset()),
            None => GrayImage::new(width, height),
        };
        for stroke in &self.strokes {
            stroke.stamp(&mut mask);
        }
        Ok(mask)
    }

    /// Hit test in natural pixels.
    pub fn contains(&self, x: f64, y: f64, media: &MediaSize) -> bool {
        if x < 0.0 || y < 0.0 {
            return false;
        }
        let (w, h) = natural_dims(media);
        let (px, py) = (x as u32, y as u32);
        if px >= w || py >= h {
            return false;
        }
        self.rasterize(w, h)
            .map(|mask| mask.get_pixel(px, py)[0] > 0)
            .unwrap_or(false)
    }
}

fn natural_dims(media: &MediaSize) -> (u32, u32) {
    (
        media.natural_width.round().max(0.0) as u32,
        media.natural_height.round().max(0.0) as u32,
    )
}

fn shifted(mask: &GrayImage, (dx, dy): (i64, i64)) -> GrayImage {
    if (dx, dy) == (0, 0) {
        return mask.clone();
    }
    let (w, h) = mask.dimensions();
    let mut out = GrayImage::new(w, h);
    for (x, y, pixel) in mask.enumerate_pixels() {
        let (nx, ny) = (x as i64 + dx, y as i64 + dy);
        if nx >= 0 && ny >= 0 && nx < w as i64 && ny < h as i64 {
            out.put_pixel(nx as u32, ny as u32, *pixel);
        }
    }
    out
}

impl Serializable for Brush {
    fn serialize(&self, _coordstype: CoordsType, media: &MediaSize) -> Result<Map<String, Value>, RegionError> {
        let rle = match &self.rle {
            Some(pairs) if self.strokes.is_empty() && self.pixel_offset() == (0, 0) => pairs.clone(),
            _ => {
                if !media.is_measured() {
                    return Err(RegionError::geometry(
                        "brush mask cannot be encoded before the media is measured",
                    ));
                }
                let (w, h) = natural_dims(media);
                rle::encode_mask(&self.rasterize(w, h)?)
            }
        };
        let mut value = Map::new();
        value.insert("format".into(), json!("rle"));
        value.insert("rle".into(), json!(rle));
        Ok(value)
    }
}
