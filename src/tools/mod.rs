//! Interactive drawing tools.
//!
//! Every labeled object gets a [`ToolManager`]: a registry of the tools its
//! controls allow, with at most one selected. A tool is a small state
//! machine (`Viewing` or `Drawing`) driven by [`ToolEvent`]s. Tools never
//! keep a handle to the shape they are building; the shape in progress is
//! always the object's last region with its drawing flag set.

mod brush;
mod dispatch;
mod floodfill;
mod keypoint;
mod polygon;
mod rect;

use std::collections::BTreeMap;

use log::debug;

use crate::config::{ControlTag, LabelConfig, ObjectTag};
use crate::error::RegionError;
use crate::geom::{CoordsType, IdGenerator, RegionId};
use crate::region::{Classifiable, LabelState, Region, Shape, ShapeKind};
use crate::store::LabeledObject;

/// The tools a labeled object can offer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolKind {
    Rectangle,
    Polygon,
    KeyPoint,
    Brush,
    Eraser,
    FloodFill,
}

impl ToolKind {
    /// The primary drawing tool for a shape.
    pub fn for_shape(shape: ShapeKind) -> Option<Self> {
        match shape {
            ShapeKind::Rectangle => Some(Self::Rectangle),
            ShapeKind::Polygon => Some(Self::Polygon),
            ShapeKind::KeyPoint => Some(Self::KeyPoint),
            ShapeKind::Brush => Some(Self::Brush),
            ShapeKind::CharacterRange | ShapeKind::TimeRange => None,
        }
    }

    /// The shape this tool creates or edits.
    pub fn shape(self) -> ShapeKind {
        match self {
            Self::Rectangle => ShapeKind::Rectangle,
            Self::Polygon | Self::FloodFill => ShapeKind::Polygon,
            Self::KeyPoint => ShapeKind::KeyPoint,
            Self::Brush | Self::Eraser => ShapeKind::Brush,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Polygon => "polygon",
            Self::KeyPoint => "keypoint",
            Self::Brush => "brush",
            Self::Eraser => "eraser",
            Self::FloodFill => "floodfill",
        }
    }
}

/// A pointer or keyboard event in display pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToolEvent {
    MouseDown { x: f64, y: f64 },
    MouseMove { x: f64, y: f64 },
    MouseUp { x: f64, y: f64 },
    Click { x: f64, y: f64 },
    /// Cancel key: finish or discard the shape in progress.
    Cancel,
}

/// What handling an event did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolOutcome {
    /// Nothing happened.
    Idle,
    /// A new region is being drawn.
    Started(RegionId),
    /// The region in progress changed.
    Updated(RegionId),
    /// The region was finished and is now persistable.
    Committed(RegionId),
    /// A polygon was sealed; the region becomes selected.
    Closed(RegionId),
    /// The region in progress was thrown away.
    Discarded,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToolMode {
    #[default]
    Viewing,
    Drawing,
}

/// One tool instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Tool {
    pub kind: ToolKind,
    pub mode: ToolMode,
    /// Pointer-down position of the current drag.
    anchor: Option<(f64, f64)>,
}

impl Tool {
    fn new(kind: ToolKind) -> Self {
        Self {
            kind,
            mode: ToolMode::Viewing,
            anchor: None,
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.mode == ToolMode::Drawing
    }

    fn reset(&mut self) {
        self.mode = ToolMode::Viewing;
        self.anchor = None;
    }
}

/// The tools of one labeled object.
#[derive(Clone, Debug, Default)]
pub struct ToolManager {
    tools: BTreeMap<ToolKind, Tool>,
    selected: Option<ToolKind>,
}

impl ToolManager {
    /// Registers one tool per drawing shape the object's controls allow.
    pub fn for_object(config: &LabelConfig, object: &ObjectTag) -> Self {
        let mut manager = Self::default();
        for control in config.controls_for(&object.name) {
            let Some(shape) = control.kind.shape_for(object.kind) else {
                continue;
            };
            let kinds: &[ToolKind] = match shape {
                ShapeKind::Rectangle => &[ToolKind::Rectangle],
                ShapeKind::Polygon => &[ToolKind::Polygon, ToolKind::FloodFill],
                ShapeKind::KeyPoint => &[ToolKind::KeyPoint],
                ShapeKind::Brush => &[ToolKind::Brush, ToolKind::Eraser],
                ShapeKind::CharacterRange | ShapeKind::TimeRange => &[],
            };
            for kind in kinds {
                manager.tools.entry(*kind).or_insert_with(|| Tool::new(*kind));
            }
        }
        manager
    }

    pub fn has(&self, kind: ToolKind) -> bool {
        self.tools.contains_key(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ToolKind> + '_ {
        self.tools.keys().copied()
    }

    pub fn selected(&self) -> Option<ToolKind> {
        self.selected
    }

    pub fn get(&self, kind: ToolKind) -> Option<&Tool> {
        self.tools.get(&kind)
    }

    fn select(&mut self, kind: ToolKind) -> Result<(), RegionError> {
        if !self.has(kind) {
            return Err(RegionError::InvalidArgument(format!(
                "tool '{}' is not available here",
                kind.name()
            )));
        }
        self.selected = Some(kind);
        Ok(())
    }

    fn selected_tool_mut(&mut self) -> Option<&mut Tool> {
        let kind = self.selected?;
        self.tools.get_mut(&kind)
    }

    fn reset_all(&mut self) {
        for tool in self.tools.values_mut() {
            tool.reset();
        }
    }
}

/// Split borrows of the annotation handed to a tool handler.
pub(crate) struct ToolContext<'a> {
    pub object: &'a mut LabeledObject,
    pub regions: &'a mut BTreeMap<RegionId, Region>,
    pub ids: &'a mut IdGenerator,
    pub config: &'a LabelConfig,
    pub active_labels: &'a BTreeMap<String, Vec<String>>,
    pub selected: Option<RegionId>,
}

impl<'a> ToolContext<'a> {
    /// The region a tool is still drawing on this object, if any.
    pub fn in_progress(&self) -> Option<RegionId> {
        let id = self.object.last_region()?;
        self.regions.get(&id).filter(|r| r.is_drawing()).map(|r| r.id)
    }

    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.get_mut(&id)
    }

    /// Picks the control a new `shape` would be labeled with.
    ///
    /// A labels control with active labels wins; otherwise an option-less
    /// drawing control for the shape. `None` means the tool has nothing to
    /// draw with.
    pub fn resolve_control(&self, shape: ShapeKind) -> Option<(&'a ControlTag, Vec<String>)> {
        let config: &'a LabelConfig = self.config;
        let kind = self.object.kind;
        let mut bare = None;
        let targeting = config.controls.iter().filter(|c| c.targets(&self.object.name));
        for control in targeting {
            if control.kind.shape_for(kind) != Some(shape) {
                continue;
            }
            if control.kind.is_labels() {
                match self.active_labels.get(&control.name) {
                    Some(values) if !values.is_empty() => return Some((control, values.clone())),
                    _ => {}
                }
            } else if bare.is_none() {
                bare = Some((control, Vec::new()));
            }
        }
        bare
    }

    /// Creates a region in drawing state as the object's last region.
    /// `build` receives the new id so sub-entities can point back at it.
    pub fn create_region(
        &mut self,
        control: &ControlTag,
        values: Vec<String>,
        build: impl FnOnce(RegionId) -> Shape,
    ) -> RegionId {
        let id = self.ids.next_region_id();
        let shape = build(id);
        let mut region = Region::new(
            id,
            self.ids.new_pid(),
            self.object.name.clone(),
            control.name.clone(),
            CoordsType::Px,
            shape,
        );
        if control.kind.is_labels() {
            region.attach_state(LabelState::new(&control.name, control.result_type(), values));
        }
        region.set_drawing(true);
        self.regions.insert(id, region);
        self.object.push_region(id);
        debug!("{}: started {} region {id}", self.object.name, self.regions[&id].kind());
        id
    }

    /// Removes a region that never made it out of drawing.
    pub fn discard(&mut self, id: RegionId) {
        self.object.remove_region(id);
        if let Some(mut region) = self.regions.remove(&id) {
            region.destroy();
        }
        debug!("{}: discarded region {id}", self.object.name);
    }

    /// Ends drawing on a region.
    pub fn commit(&mut self, id: RegionId) {
        if let Some(region) = self.regions.get_mut(&id) {
            region.set_drawing(false);
        }
    }

    /// Labels of the region in progress, for the cross-label rule.
    pub fn labels_of(&self, id: RegionId) -> Vec<String> {
        self.regions
            .get(&id)
            .map(|r| r.label_values().into_iter().map(ToOwned::to_owned).collect())
            .unwrap_or_default()
    }
}

/// Finishes whatever shape is in progress: commit it when it is usable,
/// discard it otherwise.
pub(crate) fn finalize(ctx: &mut ToolContext<'_>) -> ToolOutcome {
    let Some(id) = ctx.in_progress() else {
        return ToolOutcome::Idle;
    };
    let Some(region) = ctx.region_mut(id) else {
        return ToolOutcome::Idle;
    };
    let outcome = match &mut region.shape {
        Shape::Rect(rect) if rect.is_undersized() => None,
        Shape::Polygon(poly) => match poly.close() {
            Ok(()) => Some(ToolOutcome::Closed(id)),
            Err(_) => None,
        },
        Shape::Brush(brush) if !brush.has_content() => None,
        _ => Some(ToolOutcome::Committed(id)),
    };
    match outcome {
        Some(outcome) => {
            ctx.commit(id);
            outcome
        }
        None => {
            ctx.discard(id);
            ToolOutcome::Discarded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_follows_controls() {
        let config = LabelConfig::parse(
            r#"<View><Image name="img" value="$image"/>
               <PolygonLabels name="poly" toName="img"><Label value="A"/></PolygonLabels>
               <Brush name="mask" toName="img"/></View>"#,
        )
        .unwrap();
        let manager = ToolManager::for_object(&config, &config.objects[0]);
        let kinds: Vec<_> = manager.kinds().collect();
        assert_eq!(
            kinds,
            vec![ToolKind::Polygon, ToolKind::Brush, ToolKind::Eraser, ToolKind::FloodFill]
        );
        assert!(!manager.has(ToolKind::Rectangle));
    }

    #[test]
    fn tool_shapes() {
        assert_eq!(ToolKind::FloodFill.shape(), ShapeKind::Polygon);
        assert_eq!(ToolKind::for_shape(ShapeKind::Brush), Some(ToolKind::Brush));
        assert_eq!(ToolKind::for_shape(ShapeKind::TimeRange), None);
    }
}
