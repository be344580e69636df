//! The region model.
//!
//! A [`Region`] is one persisted annotation: shared bookkeeping (ids, origin,
//! selection, attached label states) plus a concrete [`Shape`]. Regions live
//! in the annotation's arena and refer to their owning object by name, never
//! by pointer.

pub mod brush;
pub mod capability;
pub mod keypoint;
pub mod polygon;
pub mod range;
pub mod rect;
pub mod rle;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use brush::{Brush, Stroke, StrokeKind};
pub use capability::{Classifiable, Highlightable, Resizable, Selectable, Serializable};
pub use keypoint::KeyPoint;
pub use polygon::{anchor_point, Polygon, PolygonPoint};
pub use range::{CharacterRange, TimeRange};
pub use rect::Rect;

use crate::error::RegionError;
use crate::geom::{CoordsType, MediaSize, RegionId};

/// Where a region came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    #[default]
    Manual,
    Prediction,
    /// A prediction the user has since edited.
    PredictionChanged,
}

/// A classification attached to a region by one control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelState {
    /// Name of the control that produced the state (`from_name`).
    pub control: String,
    /// Wire result type, e.g. `rectanglelabels` or `choices`.
    pub result_type: String,
    /// Selected option values, or free text for `textarea`.
    pub values: Vec<String>,
}

impl LabelState {
    pub fn new(control: impl Into<String>, result_type: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            control: control.into(),
            result_type: result_type.into(),
            values,
        }
    }

    /// Key under which the values are written in the wire `value` object.
    pub fn value_key(&self) -> &str {
        if self.result_type == "textarea" {
            "text"
        } else {
            &self.result_type
        }
    }
}

/// The concrete shape kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Rectangle,
    Polygon,
    KeyPoint,
    Brush,
    CharacterRange,
    TimeRange,
}

impl ShapeKind {
    /// Result type written when a region carries no label state.
    pub fn base_type(self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Polygon => "polygon",
            ShapeKind::KeyPoint => "keypoint",
            ShapeKind::Brush => "brush",
            ShapeKind::CharacterRange | ShapeKind::TimeRange => "labels",
        }
    }

    /// True for shapes drawn on a two-dimensional stage.
    pub fn is_spatial(self) -> bool {
        !matches!(self, ShapeKind::CharacterRange | ShapeKind::TimeRange)
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Polygon => "polygon",
            ShapeKind::KeyPoint => "keypoint",
            ShapeKind::Brush => "brush",
            ShapeKind::CharacterRange => "character range",
            ShapeKind::TimeRange => "time range",
        };
        f.write_str(name)
    }
}

/// Geometry of a region.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Rect(Rect),
    Polygon(Polygon),
    KeyPoint(KeyPoint),
    Brush(Brush),
    CharacterRange(CharacterRange),
    TimeRange(TimeRange),
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Rect(_) => ShapeKind::Rectangle,
            Shape::Polygon(_) => ShapeKind::Polygon,
            Shape::KeyPoint(_) => ShapeKind::KeyPoint,
            Shape::Brush(_) => ShapeKind::Brush,
            Shape::CharacterRange(_) => ShapeKind::CharacterRange,
            Shape::TimeRange(_) => ShapeKind::TimeRange,
        }
    }

    /// Whether the geometry is sealed enough to be persisted.
    pub fn is_complete(&self) -> bool {
        match self {
            Shape::Polygon(poly) => poly.closed,
            Shape::Brush(brush) => brush.has_content(),
            Shape::Rect(_) | Shape::KeyPoint(_) | Shape::CharacterRange(_) | Shape::TimeRange(_) => true,
        }
    }

    fn as_serializable(&self) -> &dyn Serializable {
        match self {
            Shape::Rect(s) => s,
            Shape::Polygon(s) => s,
            Shape::KeyPoint(s) => s,
            Shape::Brush(s) => s,
            Shape::CharacterRange(s) => s,
            Shape::TimeRange(s) => s,
        }
    }

    fn as_resizable(&mut self) -> Option<&mut dyn Resizable> {
        match self {
            Shape::Rect(s) => Some(s),
            Shape::Polygon(s) => Some(s),
            Shape::KeyPoint(s) => Some(s),
            Shape::Brush(_) | Shape::CharacterRange(_) | Shape::TimeRange(_) => None,
        }
    }

    /// Shape-specific fields of the wire `value` object.
    pub fn serialize(&self, coordstype: CoordsType, media: &MediaSize) -> Result<Map<String, Value>, RegionError> {
        self.as_serializable().serialize(coordstype, media)
    }

    /// Moves the geometry by a display-pixel offset.
    pub fn translate(&mut self, dx: f64, dy: f64, media: &MediaSize) -> Result<(), RegionError> {
        match self {
            Shape::Rect(rect) => rect.translate(dx, dy, media),
            Shape::Polygon(poly) => poly.translate(dx, dy, media),
            Shape::KeyPoint(point) => point.translate(dx, dy, media),
            Shape::Brush(brush) => {
                let (nx, ny) = media.stage_to_natural(dx, dy);
                brush.translate(nx, ny);
            }
            Shape::CharacterRange(_) | Shape::TimeRange(_) => {
                return Err(RegionError::geometry("ranges cannot be moved on a stage"));
            }
        }
        Ok(())
    }

    /// Hit test against a display point.
    pub fn contains(&self, x: f64, y: f64, media: &MediaSize) -> bool {
        match self {
            Shape::Rect(rect) => rect.contains(x, y),
            Shape::Polygon(poly) => poly.contains(x, y),
            Shape::KeyPoint(point) => point.contains(x, y),
            Shape::Brush(brush) => {
                let (nx, ny) = media.stage_to_natural(x, y);
                brush.contains(nx, ny, media)
            }
            Shape::CharacterRange(_) | Shape::TimeRange(_) => false,
        }
    }
}

/// One annotation region.
#[derive(Clone, Debug)]
pub struct Region {
    /// Arena key. Never reused.
    pub id: RegionId,
    /// Pairing id written as the wire `id`.
    pub pid: String,
    /// Name of the owning labeled object.
    pub object: String,
    /// Control the shape was drawn or restored with.
    pub control: String,
    pub coordstype: CoordsType,
    pub origin: Origin,
    pub score: Option<f64>,
    pub readonly: bool,
    pub shape: Shape,
    drawing: bool,
    selected: bool,
    highlighted: bool,
    states: Vec<LabelState>,
}

impl Region {
    pub fn new(
        id: RegionId,
        pid: impl Into<String>,
        object: impl Into<String>,
        control: impl Into<String>,
        coordstype: CoordsType,
        shape: Shape,
    ) -> Self {
        Self {
            id,
            pid: pid.into(),
            object: object.into(),
            control: control.into(),
            coordstype,
            origin: Origin::Manual,
            score: None,
            readonly: false,
            shape,
            drawing: false,
            selected: false,
            highlighted: false,
            states: Vec::new(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    /// True while a tool is still building this region.
    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub(crate) fn set_drawing(&mut self, drawing: bool) {
        self.drawing = drawing;
    }

    /// Complete regions are the only ones written to the wire.
    pub fn is_complete(&self) -> bool {
        !self.drawing && self.shape.is_complete()
    }

    /// Recomputes pixel geometry for the object's current display size.
    ///
    /// Does nothing until the media is measured. Afterwards the region is in
    /// pixel coordinates for good.
    pub fn update_image_size(&mut self, media: &MediaSize) {
        if !media.is_measured() {
            return;
        }
        if let Some(shape) = self.shape.as_resizable() {
            shape.update_image_size(self.coordstype, media);
            self.coordstype = CoordsType::Px;
        }
    }

    /// Records a user edit of the geometry.
    pub fn mark_changed(&mut self) {
        if self.origin == Origin::Prediction {
            self.origin = Origin::PredictionChanged;
        }
    }

    /// Fails if the region refuses edits.
    pub fn ensure_editable(&self) -> Result<(), RegionError> {
        if self.readonly {
            return Err(RegionError::RegionReadOnly {
                id: self.pid.clone(),
            });
        }
        Ok(())
    }

    /// Releases owned sub-entities ahead of removal from the arena.
    pub fn destroy(&mut self) {
        match &mut self.shape {
            Shape::Polygon(poly) => poly.destroy(),
            Shape::Brush(brush) => brush.clear(),
            _ => {}
        }
        self.states.clear();
        self.selected = false;
        self.highlighted = false;
    }

    /// Removes every attached state.
    pub fn clear_states(&mut self) {
        self.states.clear();
    }
}

impl Selectable for Region {
    fn is_selected(&self) -> bool {
        self.selected
    }

    fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }
}

impl Highlightable for Region {
    fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    fn set_highlight(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
    }
}

impl Classifiable for Region {
    fn states(&self) -> &[LabelState] {
        &self.states
    }

    fn attach_state(&mut self, state: LabelState) {
        match self.states.iter_mut().find(|s| s.control == state.control) {
            Some(existing) => *existing = state,
            None => self.states.push(state),
        }
    }

    fn detach_state(&mut self, control: &str) -> Option<LabelState> {
        let idx = self.states.iter().position(|s| s.control == control)?;
        Some(self.states.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_region() -> Region {
        Region::new(
            RegionId::new(1),
            "abc",
            "image",
            "tag",
            CoordsType::Perc,
            Shape::Rect(Rect::from_percent(10.0, 10.0, 20.0, 20.0, 0.0)),
        )
    }

    #[test]
    fn attach_replaces_same_control() {
        let mut region = rect_region();
        region.attach_state(LabelState::new("tag", "rectanglelabels", vec!["A".into()]));
        region.attach_state(LabelState::new("extra", "choices", vec!["x".into()]));
        region.attach_state(LabelState::new("tag", "rectanglelabels", vec!["B".into()]));
        assert_eq!(region.states().len(), 2);
        assert_eq!(region.label_values(), vec!["B", "x"]);
        assert!(region.detach_state("extra").is_some());
        assert!(region.detach_state("extra").is_none());
    }

    #[test]
    fn resolving_against_media_switches_to_pixels() {
        let mut region = rect_region();
        region.update_image_size(&MediaSize::default());
        assert_eq!(region.coordstype, CoordsType::Perc);

        region.update_image_size(&MediaSize::natural(200.0, 100.0));
        assert_eq!(region.coordstype, CoordsType::Px);
        let Shape::Rect(rect) = &region.shape else {
            panic!("expected rect");
        };
        assert_eq!((rect.x, rect.y), (20.0, 10.0));
    }

    #[test]
    fn prediction_becomes_changed_on_edit() {
        let mut region = rect_region();
        region.origin = Origin::Prediction;
        region.mark_changed();
        assert_eq!(region.origin, Origin::PredictionChanged);
        region.mark_changed();
        assert_eq!(region.origin, Origin::PredictionChanged);
    }

    #[test]
    fn drawing_regions_are_incomplete() {
        let mut region = rect_region();
        region.set_drawing(true);
        assert!(!region.is_complete());
        region.set_drawing(false);
        assert!(region.is_complete());
    }

    #[test]
    fn textarea_values_use_text_key() {
        let state = LabelState::new("notes", "textarea", vec!["hi".into()]);
        assert_eq!(state.value_key(), "text");
        let state = LabelState::new("tag", "labels", vec![]);
        assert_eq!(state.value_key(), "labels");
    }

    #[test]
    fn origin_serializes_kebab_case() {
        let json = serde_json::to_string(&Origin::PredictionChanged).unwrap();
        assert_eq!(json, "\"prediction-changed\"");
    }
}
