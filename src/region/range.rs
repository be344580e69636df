//! Text and time ranges.

use serde_json::{json, Map, Value};

use super::capability::Serializable;
use crate::error::RegionError;
use crate::geom::{CoordsType, MediaSize};

/// A span of characters in a text object.
///
/// Offsets count Unicode scalar values and are authoritative; `text` is a
/// snapshot kept for display and load-time checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharacterRange {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl CharacterRange {
    /// Creates a range over `content`, taking the text snapshot from it.
    pub fn new(start: i64, end: i64, content: &str) -> Result<Self, RegionError> {
        let len = content.chars().count();
        let (start, end) = check_offsets(start, end, len)?;
        let text = content.chars().skip(start).take(end - start).collect();
        Ok(Self { start, end, text })
    }

    /// Creates a range from stored parts without checking them against content.
    pub fn from_parts(start: i64, end: i64, text: impl Into<String>) -> Result<Self, RegionError> {
        let (start, end) = check_offsets(start, end, usize::MAX)?;
        Ok(Self {
            start,
            end,
            text: text.into(),
        })
    }

    /// Checks the offsets against `content`; returns whether the stored
    /// snapshot still matches it.
    pub fn verify(&self, content: &str) -> Result<bool, RegionError> {
        let fresh = Self::new(self.start as i64, self.end as i64, content)?;
        Ok(fresh.text == self.text)
    }
}

fn check_offsets(start: i64, end: i64, len: usize) -> Result<(usize, usize), RegionError> {
    if start < 0 || end < 0 {
        return Err(RegionError::geometry(format!(
            "negative text offsets {start}..{end}"
        )));
    }
    let (start, end) = (start as usize, end as usize);
    if start > end {
        return Err(RegionError::geometry(format!("text range {start}..{end} is reversed")));
    }
    if end > len {
        return Err(RegionError::geometry(format!(
            "text range {start}..{end} exceeds {len} characters"
        )));
    }
    Ok((start, end))
}

impl Serializable for CharacterRange {
    fn serialize(&self, _coordstype: CoordsType, _media: &MediaSize) -> Result<Map<String, Value>, RegionError> {
        let mut value = Map::new();
        value.insert("start".into(), json!(self.start));
        value.insert("end".into(), json!(self.end));
        value.insert("text".into(), json!(self.text));
        Ok(value)
    }
}

/// A span of time (seconds) or rows. A zero-width range is an instant.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
    pub instant: bool,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Result<Self, RegionError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(RegionError::geometry("time range bounds must be finite"));
        }
        if start < 0.0 || end < start {
            return Err(RegionError::geometry(format!("invalid time range {start}..{end}")));
        }
        Ok(Self {
            start,
            end,
            instant: start == end,
        })
    }
}

impl Serializable for TimeRange {
    fn serialize(&self, _coordstype: CoordsType, _media: &MediaSize) -> Result<Map<String, Value>, RegionError> {
        let mut value = Map::new();
        value.insert("start".into(), json!(self.start));
        value.insert("end".into(), json!(self.end));
        value.insert("instant".into(), json!(self.instant));
        Ok(value)
    }
}
