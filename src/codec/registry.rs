//! Wire type tags mapped to shape decoders.
//!
//! The table is built once, on first use, and never changes afterwards.
//! Both the plain shape tag (`rectangle`) and its labels variant
//! (`rectanglelabels`) decode to the same shape.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde_json::{Map, Value};

use crate::config::ObjectKind;
use crate::error::RegionError;
use crate::geom::RegionId;
use crate::region::polygon::MIN_POINTS_TO_CLOSE;
use crate::region::rect::normalize_rotation;
use crate::region::{Brush, CharacterRange, KeyPoint, Polygon, Rect, Shape, ShapeKind, TimeRange};
use crate::store::LabeledObject;

/// Keypoint radius for entries without a width, in percent of the stage width.
const KEYPOINT_WIDTH_PERCENT: f64 = 1.0;

/// Builds a shape from the wire `value` of an entry targeting `object`.
pub type DecodeFn = fn(&Map<String, Value>, &LabeledObject, RegionId) -> Result<Shape, RegionError>;

/// How one wire type tag becomes a shape.
#[derive(Clone, Copy)]
pub struct ShapeFactory {
    /// Shape kind produced for image objects; ranges depend on the object.
    pub kind: ShapeKind,
    pub decode: DecodeFn,
}

impl std::fmt::Debug for ShapeFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapeFactory").field("kind", &self.kind).finish()
    }
}

fn registry() -> &'static BTreeMap<&'static str, ShapeFactory> {
    static REGISTRY: OnceLock<BTreeMap<&'static str, ShapeFactory>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let rect = ShapeFactory {
            kind: ShapeKind::Rectangle,
            decode: decode_rect,
        };
        let polygon = ShapeFactory {
            kind: ShapeKind::Polygon,
            decode: decode_polygon,
        };
        let keypoint = ShapeFactory {
            kind: ShapeKind::KeyPoint,
            decode: decode_keypoint,
        };
        let brush = ShapeFactory {
            kind: ShapeKind::Brush,
            decode: decode_brush,
        };
        let text = ShapeFactory {
            kind: ShapeKind::CharacterRange,
            decode: decode_range,
        };
        let time = ShapeFactory {
            kind: ShapeKind::TimeRange,
            decode: decode_range,
        };

        BTreeMap::from([
            ("rectangle", rect),
            ("rectanglelabels", rect),
            ("polygon", polygon),
            ("polygonlabels", polygon),
            ("keypoint", keypoint),
            ("keypointlabels", keypoint),
            ("brush", brush),
            ("brushlabels", brush),
            ("labels", text),
            ("hypertextlabels", text),
            ("timeserieslabels", time),
        ])
    })
}

/// Looks up the factory for a wire type tag.
pub fn lookup(result_type: &str) -> Option<&'static ShapeFactory> {
    registry().get(result_type)
}

/// Every registered type tag, sorted.
pub fn type_tags() -> impl Iterator<Item = &'static str> {
    registry().keys().copied()
}

/// Shape a `result_type` entry produces on `object`, if any.
pub fn shape_kind(result_type: &str, object: ObjectKind) -> Option<ShapeKind> {
    let factory = lookup(result_type)?;
    match factory.kind {
        ShapeKind::CharacterRange | ShapeKind::TimeRange => Some(range_kind(object)),
        kind => Some(kind),
    }
}

/// Decodes `value` with the factory registered for `result_type`.
pub fn decode(
    result_type: &str,
    value: &Map<String, Value>,
    object: &LabeledObject,
    id: RegionId,
) -> Result<Shape, RegionError> {
    let factory = lookup(result_type).ok_or_else(|| RegionError::UnsupportedResultType {
        result_type: result_type.to_string(),
    })?;
    (factory.decode)(value, object, id)
}

/// Fuzz-only entrypoint: decodes a JSON `value` object against a 64x64 image.
#[cfg(feature = "fuzzing")]
pub fn fuzz_decode_value(result_type: &str, bytes: &[u8]) -> Result<(), RegionError> {
    let value: Map<String, Value> =
        serde_json::from_slice(bytes).map_err(|source| RegionError::value(source.to_string()))?;
    let tag = crate::config::ObjectTag {
        name: "fuzz".into(),
        kind: ObjectKind::Image,
        value: "$image".into(),
    };
    let mut object = LabeledObject::new(&tag, None);
    object.media = crate::geom::MediaSize::natural(64.0, 64.0);
    let _ = decode(result_type, &value, &object, RegionId::new(0))?;
    Ok(())
}

fn range_kind(object: ObjectKind) -> ShapeKind {
    match object {
        ObjectKind::Audio | ObjectKind::TimeSeries => ShapeKind::TimeRange,
        ObjectKind::Image | ObjectKind::Text | ObjectKind::HyperText => ShapeKind::CharacterRange,
    }
}

// ============================================================================
// Decoders
// ============================================================================

fn decode_rect(value: &Map<String, Value>, _object: &LabeledObject, _id: RegionId) -> Result<Shape, RegionError> {
    let x = number(value, "x")?;
    let y = number(value, "y")?;
    let width = number(value, "width")?;
    let height = number(value, "height")?;
    let rotation = optional_number(value, "rotation")?.unwrap_or(0.0);
    if width <= 0.0 || height <= 0.0 {
        return Err(RegionError::geometry(format!(
            "rectangle has non-positive size {width}x{height}"
        )));
    }
    Ok(Shape::Rect(Rect::from_percent(
        x,
        y,
        width,
        height,
        normalize_rotation(rotation),
    )))
}

fn decode_polygon(value: &Map<String, Value>, _object: &LabeledObject, id: RegionId) -> Result<Shape, RegionError> {
    let raw = value
        .get("points")
        .and_then(Value::as_array)
        .ok_or_else(|| RegionError::value("polygon needs a 'points' list"))?;
    let points = raw
        .iter()
        .map(|point| {
            let pair = point.as_array().filter(|pair| pair.len() == 2);
            let coords = pair.map(|pair| (pair[0].as_f64(), pair[1].as_f64()));
            match coords {
                Some((Some(x), Some(y))) if x.is_finite() && y.is_finite() => Ok((x, y)),
                _ => Err(RegionError::value("polygon points must be [x, y] number pairs")),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    if points.len() < MIN_POINTS_TO_CLOSE {
        return Err(RegionError::geometry(format!(
            "polygon has {} point(s), needs at least {MIN_POINTS_TO_CLOSE}",
            points.len()
        )));
    }
    // persisted polygons are finished shapes
    Ok(Shape::Polygon(Polygon::from_percent(id, &points, true)))
}

fn decode_keypoint(value: &Map<String, Value>, _object: &LabeledObject, _id: RegionId) -> Result<Shape, RegionError> {
    let x = number(value, "x")?;
    let y = number(value, "y")?;
    let width = optional_number(value, "width")?.unwrap_or(KEYPOINT_WIDTH_PERCENT);
    if width < 0.0 {
        return Err(RegionError::geometry(format!("keypoint has negative width {width}")));
    }
    Ok(Shape::KeyPoint(KeyPoint::from_percent(x, y, width)))
}

fn decode_brush(value: &Map<String, Value>, object: &LabeledObject, _id: RegionId) -> Result<Shape, RegionError> {
    if let Some(format) = value.get("format").and_then(Value::as_str) {
        if format != "rle" {
            return Err(RegionError::value(format!("unsupported brush format '{format}'")));
        }
    }
    let raw = value
        .get("rle")
        .and_then(Value::as_array)
        .ok_or_else(|| RegionError::value("brush needs an 'rle' list"))?;
    let pairs = raw
        .iter()
        .map(|v| {
            v.as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| RegionError::value("rle values must be unsigned integers"))
        })
        .collect::<Result<Vec<u32>, _>>()?;
    if pairs.len() % 2 != 0 {
        return Err(RegionError::value(format!("rle has odd length {}", pairs.len())));
    }

    let brush = Brush::from_rle(pairs);
    brush.check_rle(&object.media)?;
    Ok(Shape::Brush(brush))
}

fn decode_range(value: &Map<String, Value>, object: &LabeledObject, _id: RegionId) -> Result<Shape, RegionError> {
    match range_kind(object.kind) {
        ShapeKind::TimeRange => {
            let start = number(value, "start")?;
            let end = number(value, "end")?;
            Ok(Shape::TimeRange(TimeRange::new(start, end)?))
        }
        _ => {
            let start = offset(value, "start")?;
            let end = offset(value, "end")?;
            let text = value.get("text").and_then(Value::as_str);
            let range = match (text, object.content()) {
                (Some(text), _) => CharacterRange::from_parts(start, end, text)?,
                (None, Some(content)) => CharacterRange::new(start, end, content)?,
                (None, None) => CharacterRange::from_parts(start, end, "")?,
            };
            Ok(Shape::CharacterRange(range))
        }
    }
}

// ============================================================================
// Field helpers
// ============================================================================

fn number(value: &Map<String, Value>, key: &str) -> Result<f64, RegionError> {
    optional_number(value, key)?.ok_or_else(|| RegionError::value(format!("missing '{key}'")))
}

fn optional_number(value: &Map<String, Value>, key: &str) -> Result<Option<f64>, RegionError> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_f64() {
            Some(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(RegionError::geometry(format!("'{key}' is not a finite number"))),
        },
    }
}

/// A text offset: a whole number, possibly written as a float.
fn offset(value: &Map<String, Value>, key: &str) -> Result<i64, RegionError> {
    if let Some(n) = value.get(key).and_then(Value::as_i64) {
        return Ok(n);
    }
    let n = number(value, key)?;
    if n.fract() != 0.0 {
        return Err(RegionError::geometry(format!("'{key}' offset {n} is not a whole number")));
    }
    Ok(n as i64)
}
