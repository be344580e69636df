//! Edits outside the drawing state machine.

use log::{debug, info, warn};

use super::Annotation;
use crate::config::{ChoiceMode, ControlKind};
use crate::error::RegionError;
use crate::geom::{CoordsType, MediaSize, RegionId};
use crate::region::{CharacterRange, Classifiable, LabelState, Region, Shape, ShapeKind, TimeRange};
use crate::tools::ToolKind;

impl Annotation {
    // ========================================================================
    // Labels
    // ========================================================================

    /// Activates an option of a control.
    ///
    /// The drawing tool for the control's shape becomes the selected tool on
    /// every object it targets, and a selected region of that shape is
    /// relabeled.
    pub fn select_label(&mut self, control: &str, value: &str) -> Result<(), RegionError> {
        let tag = self
            .config
            .control(control)
            .ok_or_else(|| RegionError::UnknownControl { name: control.to_string() })?
            .clone();
        if !tag.has_option(value) {
            return Err(RegionError::UnknownLabel {
                control: control.to_string(),
                label: value.to_string(),
            });
        }

        let active = self.active_labels.entry(control.to_string()).or_default();
        match tag.choice {
            ChoiceMode::Single => *active = vec![value.to_string()],
            ChoiceMode::Multiple => {
                if !active.iter().any(|v| v == value) {
                    active.push(value.to_string());
                }
            }
        }
        let values = active.clone();
        debug!("{control}: active labels {values:?}");

        for object in &tag.to_name {
            let Some(kind) = self.objects.get(object).map(|o| o.kind) else {
                continue;
            };
            if let Some(tool) = tag.kind.shape_for(kind).and_then(ToolKind::for_shape) {
                self.select_tool(object, tool)?;
            }
        }

        if let Some(selected) = self.selected() {
            if !self.read_only {
                self.relabel(selected, &tag.name, values)?;
            }
        }
        Ok(())
    }

    /// Deactivates an option of a control.
    pub fn unselect_label(&mut self, control: &str, value: &str) {
        if let Some(active) = self.active_labels.get_mut(control) {
            active.retain(|v| v != value);
        }
    }

    pub fn clear_active_labels(&mut self) {
        self.active_labels.clear();
    }

    /// Replaces the labels state of `control` on a region when the control
    /// applies to it.
    fn relabel(&mut self, id: RegionId, control: &str, values: Vec<String>) -> Result<(), RegionError> {
        let Some(tag) = self.config.control(control) else {
            return Ok(());
        };
        let region = self.region_ref(id)?;
        let Some(object) = self.objects.get(&region.object) else {
            return Ok(());
        };
        let applies = tag.targets(&region.object)
            && tag.kind.is_labels()
            && tag.kind.shape_for(object.kind) == Some(region.kind());
        if !applies {
            return Ok(());
        }
        let state = LabelState::new(control, tag.result_type(), values);
        let region = self.editable_region(id)?;
        region.attach_state(state);
        info!("relabeled region {}", region.pid);
        Ok(())
    }

    /// Attaches a per-region classification (`Choices` or `TextArea`).
    pub fn classify(&mut self, id: RegionId, control: &str, values: Vec<String>) -> Result<(), RegionError> {
        let tag = self
            .config
            .control(control)
            .ok_or_else(|| RegionError::UnknownControl { name: control.to_string() })?;
        if !tag.kind.is_classification() {
            return Err(RegionError::InvalidArgument(format!(
                "control '{control}' does not classify regions"
            )));
        }
        let object = self.region_ref(id)?.object.clone();
        if !tag.targets(&object) {
            return Err(RegionError::UnknownObject { name: object });
        }
        if tag.kind == ControlKind::Choices {
            if let Some(bad) = values.iter().find(|v| !tag.has_option(v)) {
                return Err(RegionError::UnknownLabel {
                    control: control.to_string(),
                    label: bad.clone(),
                });
            }
            if tag.choice == ChoiceMode::Single && values.len() > 1 {
                return Err(RegionError::value(format!(
                    "control '{control}' accepts a single choice"
                )));
            }
        }
        if values.is_empty() && !tag.accepts_empty() {
            return Err(RegionError::EmptyLabels {
                control: control.to_string(),
            });
        }
        let state = LabelState::new(control, tag.result_type(), values);
        self.editable_region(id)?.attach_state(state);
        Ok(())
    }

    /// Detaches the state of `control` from a region.
    pub fn unclassify(&mut self, id: RegionId, control: &str) -> Result<Option<LabelState>, RegionError> {
        Ok(self.editable_region(id)?.detach_state(control))
    }

    // ========================================================================
    // Geometry edits
    // ========================================================================

    /// Moves a region by a display-pixel offset.
    pub fn move_region(&mut self, id: RegionId, dx: f64, dy: f64) -> Result<(), RegionError> {
        let media = self.measured_media_of(id)?;
        let region = self.editable_region(id)?;
        region.shape.translate(dx, dy, &media)?;
        region.mark_changed();
        Ok(())
    }

    /// Sets a rectangle's position, size and rotation in display pixels.
    pub fn set_rect_geometry(
        &mut self,
        id: RegionId,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rotation: f64,
    ) -> Result<(), RegionError> {
        if !(width > 0.0 && height > 0.0) || !x.is_finite() || !y.is_finite() {
            return Err(RegionError::geometry(format!(
                "invalid rectangle {x},{y} {width}x{height}"
            )));
        }
        let media = self.measured_media_of(id)?;
        let region = self.editable_region(id)?;
        let Shape::Rect(rect) = &mut region.shape else {
            return Err(RegionError::geometry("region is not a rectangle"));
        };
        rect.set_position(x, y, width, height, rotation, &media);
        region.mark_changed();
        Ok(())
    }

    /// Applies a live transform scale; call [`commit_scale`](Self::commit_scale)
    /// when the transform ends.
    pub fn scale_region(&mut self, id: RegionId, scale_x: f64, scale_y: f64) -> Result<(), RegionError> {
        let region = self.editable_region(id)?;
        let Shape::Rect(rect) = &mut region.shape else {
            return Err(RegionError::geometry("only rectangles can be scaled"));
        };
        rect.set_scale(scale_x, scale_y);
        Ok(())
    }

    pub fn commit_scale(&mut self, id: RegionId) -> Result<(), RegionError> {
        let media = self.measured_media_of(id)?;
        let region = self.editable_region(id)?;
        let Shape::Rect(rect) = &mut region.shape else {
            return Err(RegionError::geometry("only rectangles can be scaled"));
        };
        rect.commit_scale(&media);
        region.mark_changed();
        Ok(())
    }

    pub fn move_point(&mut self, id: RegionId, index: usize, x: f64, y: f64) -> Result<(), RegionError> {
        let media = self.measured_media_of(id)?;
        let region = self.editable_region(id)?;
        let Shape::Polygon(poly) = &mut region.shape else {
            return Err(RegionError::geometry("region is not a polygon"));
        };
        poly.move_point(index, x, y, &media)?;
        region.mark_changed();
        Ok(())
    }

    /// Inserts a point on an edge, projected from the cursor. Returns the
    /// new point's index.
    pub fn insert_point(&mut self, id: RegionId, edge: usize, x: f64, y: f64) -> Result<usize, RegionError> {
        let media = self.measured_media_of(id)?;
        let region = self.editable_region(id)?;
        let Shape::Polygon(poly) = &mut region.shape else {
            return Err(RegionError::geometry("region is not a polygon"));
        };
        let index = poly.insert_on_edge(edge, (x, y), &media)?;
        region.mark_changed();
        Ok(index)
    }

    pub fn remove_point(&mut self, id: RegionId, index: usize) -> Result<(), RegionError> {
        let region = self.editable_region(id)?;
        let Shape::Polygon(poly) = &mut region.shape else {
            return Err(RegionError::geometry("region is not a polygon"));
        };
        poly.remove_point(index)?;
        region.mark_changed();
        Ok(())
    }

    /// Deletes a region together with its relations.
    pub fn delete_region(&mut self, id: RegionId) -> Result<(), RegionError> {
        self.editable_region(id)?;
        self.remove_region(id);
        Ok(())
    }

    /// Deletes every region of the annotation.
    pub fn delete_all_regions(&mut self) -> Result<usize, RegionError> {
        self.ensure_writable()?;
        let ids: Vec<RegionId> = self
            .regions
            .values()
            .filter(|r| !r.readonly)
            .map(|r| r.id)
            .collect();
        for id in &ids {
            self.remove_region(*id);
        }
        Ok(ids.len())
    }

    // ========================================================================
    // Ranges
    // ========================================================================

    /// Creates a range region on a text, audio or time-series object from
    /// externally supplied offsets, labeled with the active labels of the
    /// first matching control.
    pub fn add_range(&mut self, object: &str, start: f64, end: f64) -> Result<RegionId, RegionError> {
        self.ensure_writable()?;
        let obj = self.object(object)?;
        let kind = obj.kind;

        let mut fallback = None;
        let mut chosen = None;
        for tag in self.config.controls_for(object) {
            let Some(shape) = tag.kind.shape_for(kind) else {
                continue;
            };
            if shape.is_spatial() {
                continue;
            }
            let values = self.active_labels(&tag.name).to_vec();
            if !values.is_empty() {
                chosen = Some((tag.clone(), shape, values));
                break;
            }
            if tag.accepts_empty() && fallback.is_none() {
                fallback = Some((tag.clone(), shape, Vec::new()));
            }
        }
        let Some((tag, shape_kind, values)) = chosen.or(fallback) else {
            warn!("{object}: no active labels for a range");
            return Err(RegionError::EmptyLabels {
                control: object.to_string(),
            });
        };

        let shape = match shape_kind {
            ShapeKind::CharacterRange => {
                if start.fract() != 0.0 || end.fract() != 0.0 {
                    return Err(RegionError::geometry("text offsets must be whole numbers"));
                }
                let content = obj.content().unwrap_or_default();
                Shape::CharacterRange(CharacterRange::new(start as i64, end as i64, content)?)
            }
            _ => Shape::TimeRange(TimeRange::new(start, end)?),
        };

        let id = self.ids.next_region_id();
        let mut region = Region::new(id, self.ids.new_pid(), object, &tag.name, CoordsType::Px, shape);
        region.attach_state(LabelState::new(&tag.name, tag.result_type(), values));
        self.insert_region(region)?;
        info!("{object}: added {shape_kind} region {id}");
        Ok(id)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Topmost region of `object` under a display point.
    pub fn hit_test(&self, object: &str, x: f64, y: f64) -> Result<Option<RegionId>, RegionError> {
        let obj = self.object(object)?;
        Ok(obj
            .regions
            .iter()
            .rev()
            .filter_map(|id| self.regions.get(id))
            .find(|r| !r.is_drawing() && r.shape.contains(x, y, &obj.media))
            .map(|r| r.id))
    }

    /// Selects the topmost region under a point, or clears the selection.
    pub fn click_at(&mut self, object: &str, x: f64, y: f64) -> Result<Option<RegionId>, RegionError> {
        match self.hit_test(object, x, y)? {
            Some(id) => {
                self.on_click_region(id)?;
                Ok(Some(id))
            }
            None => {
                self.unselect_all();
                Ok(None)
            }
        }
    }

    /// Media of a region's object. Display-pixel edits need it measured.
    fn measured_media_of(&self, id: RegionId) -> Result<MediaSize, RegionError> {
        let region = self.region_ref(id)?;
        let media = self.object(&region.object)?.media;
        if !media.is_measured() {
            return Err(RegionError::MediaNotMeasured {
                object: region.object.clone(),
            });
        }
        Ok(media)
    }
}
