//! Restoring an annotation from a wire result list.
//!
//! Loading is skip-and-continue: an entry that names an unknown control,
//! object or label, or that carries invalid geometry, is reported and
//! skipped while the rest of the list still loads.

use log::{info, warn};
use serde_json::{Map, Value};

use super::registry;
use super::report::{IssueContext, LoadIssue, LoadReport};
use super::wire::{string_list, RelationEntry, ResultEntry, RELATION_TYPE};
use crate::config::{ChoiceMode, ControlKind, ControlTag};
use crate::error::{ErrorKind, RegionError};
use crate::geom::{CoordsType, RegionId};
use crate::region::{Classifiable, LabelState, Region, Shape};
use crate::store::Annotation;

/// Wire keys that identify a region's geometry.
const GEOMETRY_KEYS: [&str; 8] = ["x", "y", "width", "height", "points", "start", "end", "rle"];

/// Relative tolerance used when matching geometry.
const GEOMETRY_TOLERANCE: f64 = 1e-6;

/// What happened to one wire entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Applied {
    /// A new region was created.
    Created(RegionId),
    /// The entry's state was attached to an existing region.
    Merged(RegionId),
    /// The entry is kept verbatim and written back unchanged.
    Kept,
}

impl Annotation {
    /// Loads a wire result list into this annotation.
    ///
    /// Region entries are applied first; relation entries are resolved in a
    /// second pass so they may refer to regions listed after them. Skipped
    /// entries are recorded in the returned report and in
    /// [`errors`](Annotation::errors).
    pub fn deserialize(&mut self, entries: &[Value]) -> LoadReport {
        let mut report = LoadReport::new();
        let mut relations = Vec::new();

        for (index, raw) in entries.iter().enumerate() {
            let pid = raw.get("id").and_then(Value::as_str);
            let context = IssueContext::entry(index, pid);
            if raw.get("type").and_then(Value::as_str) == Some(RELATION_TYPE) {
                relations.push((index, raw));
                continue;
            }
            match self.apply_entry(raw, &context, &mut report) {
                Ok(_) => report.loaded += 1,
                Err(err) => self.reject(&mut report, context, &err),
            }
        }

        for (index, raw) in relations {
            let context = IssueContext::entry(index, None);
            match self.apply_relation(raw, &context, &mut report) {
                Ok(()) => report.loaded += 1,
                Err(err) => self.reject(&mut report, context, &err),
            }
        }

        info!(
            "loaded {} entr(ies), {} skipped, {} region(s) in total",
            report.loaded,
            report.error_count(),
            self.regions.len()
        );
        report
    }

    /// Restores a single region entry.
    ///
    /// Returns the region the entry created or merged into, or `None` when
    /// the entry is kept verbatim. Warnings are logged; use
    /// [`deserialize`](Self::deserialize) to collect them.
    pub fn from_state_json(&mut self, entry: &Value) -> Result<Option<RegionId>, RegionError> {
        let pid = entry.get("id").and_then(Value::as_str);
        let context = IssueContext::entry(0, pid);
        let mut report = LoadReport::new();
        let applied = self.apply_entry(entry, &context, &mut report)?;
        for issue in &report.issues {
            warn!("{issue}");
        }
        Ok(applied.region())
    }

    fn reject(&mut self, report: &mut LoadReport, context: IssueContext, err: &RegionError) {
        warn!("skipping {context}: {err}");
        self.errors.push(format!("{context}: {err}"));
        report.skip(context, err);
    }

    // ========================================================================
    // Region entries
    // ========================================================================

    fn apply_entry(
        &mut self,
        raw: &Value,
        context: &IssueContext,
        report: &mut LoadReport,
    ) -> Result<Applied, RegionError> {
        let entry: ResultEntry =
            serde_json::from_value(raw.clone()).map_err(|source| RegionError::value(source.to_string()))?;

        let control = self
            .config
            .control(&entry.from_name)
            .cloned()
            .ok_or_else(|| RegionError::UnknownControl {
                name: entry.from_name.clone(),
            })?;
        let object_kind = self.object(&entry.to_name)?.kind;
        if !control.targets(&entry.to_name) {
            return Err(RegionError::value(format!(
                "control '{}' does not target '{}'",
                control.name, entry.to_name
            )));
        }
        self.adopt_original_size(&entry)?;

        if control.kind.is_classification() {
            return self.apply_classification(raw, &entry, &control, report, context);
        }

        let shape_kind = control
            .kind
            .shape_for(object_kind)
            .ok_or_else(|| RegionError::UnsupportedResultType {
                result_type: entry.result_type.clone(),
            })?;
        match registry::shape_kind(&entry.result_type, object_kind) {
            Some(kind) if kind == shape_kind => {}
            _ => {
                return Err(RegionError::UnsupportedResultType {
                    result_type: entry.result_type.clone(),
                })
            }
        }

        let state = if control.kind.is_labels() {
            let values = label_values(&entry, &control)?;
            Some(LabelState::new(&control.name, control.result_type(), values))
        } else {
            None
        };

        let shape = self.decode_shape(&entry, report, context)?;
        let matched = match entry.id.as_deref() {
            Some(pid) => self.find_by_pid(&entry.to_name, pid, &shape),
            None => self.find_by_geometry(&entry.to_name, &shape),
        };
        if let Some(id) = matched {
            if let Some(state) = state {
                if let Some(region) = self.regions.get_mut(&id) {
                    region.attach_state(state);
                }
            }
            return Ok(Applied::Merged(id));
        }
        let id = self.create_from_entry(&entry, &control.name, shape, state)?;
        Ok(Applied::Created(id))
    }

    /// Per-region `Choices` / `TextArea` entries attach to the region they
    /// describe. Entries without geometry classify the whole object and are
    /// kept verbatim.
    fn apply_classification(
        &mut self,
        raw: &Value,
        entry: &ResultEntry,
        control: &ControlTag,
        report: &mut LoadReport,
        context: &IssueContext,
    ) -> Result<Applied, RegionError> {
        let values = classification_values(entry, control)?;
        let has_geometry = GEOMETRY_KEYS.iter().any(|key| entry.value.contains_key(*key));
        let by_pid = entry
            .id
            .as_deref()
            .and_then(|pid| self.region_by_pid(pid))
            .filter(|r| r.object == entry.to_name)
            .map(|r| r.id);

        let target = match (by_pid, has_geometry) {
            (Some(id), _) => Some(id),
            (None, false) => None,
            (None, true) => {
                let shape = self.decode_shape_inferred(entry, report, context)?;
                match self.find_by_geometry(&entry.to_name, &shape) {
                    Some(id) => Some(id),
                    None => Some(self.create_from_entry(entry, &control.name, shape, None)?),
                }
            }
        };

        let Some(id) = target else {
            self.passthrough.push(raw.clone());
            return Ok(Applied::Kept);
        };
        if let Some(region) = self.regions.get_mut(&id) {
            region.attach_state(LabelState::new(&control.name, control.result_type(), values));
        }
        Ok(Applied::Merged(id))
    }

    fn decode_shape(
        &self,
        entry: &ResultEntry,
        report: &mut LoadReport,
        context: &IssueContext,
    ) -> Result<Shape, RegionError> {
        let object = self.object(&entry.to_name)?;
        let shape = registry::decode(&entry.result_type, &entry.value, object, RegionId::new(0))?;
        if let (Shape::CharacterRange(range), Some(content)) = (&shape, object.content()) {
            if !range.verify(content)? {
                report.add(LoadIssue::warning(
                    ErrorKind::Range,
                    format!(
                        "text snapshot '{}' does not match content at {}..{}",
                        range.text, range.start, range.end
                    ),
                    context.clone(),
                ));
            }
        }
        Ok(shape)
    }

    /// Decodes the geometry of a classification entry, picking the shape
    /// from the fields present.
    fn decode_shape_inferred(
        &self,
        entry: &ResultEntry,
        report: &mut LoadReport,
        context: &IssueContext,
    ) -> Result<Shape, RegionError> {
        let value = &entry.value;
        let tag = if value.contains_key("points") {
            "polygon"
        } else if value.contains_key("rle") {
            "brush"
        } else if value.contains_key("width") && value.contains_key("height") {
            "rectangle"
        } else if value.contains_key("x") {
            "keypoint"
        } else {
            "labels"
        };
        let inferred = ResultEntry {
            result_type: tag.to_string(),
            ..entry.clone()
        };
        self.decode_shape(&inferred, report, context)
    }

    /// The region of `object` with this pairing id and the same shape kind.
    fn find_by_pid(&self, object: &str, pid: &str, shape: &Shape) -> Option<RegionId> {
        self.regions_of(object)
            .find(|r| r.pid == pid && r.kind() == shape.kind())
            .map(|r| r.id)
    }

    /// A complete region of `object` with the same geometry.
    fn find_by_geometry(&self, object: &str, shape: &Shape) -> Option<RegionId> {
        let media = self.objects.get(object)?.media;
        let wanted = shape.serialize(CoordsType::Perc, &media).ok()?;
        self.regions_of(object)
            .filter(|r| r.kind() == shape.kind() && r.is_complete())
            .find(|r| {
                r.shape
                    .serialize(r.coordstype, &media)
                    .map(|have| same_geometry(&wanted, &have))
                    .unwrap_or(false)
            })
            .map(|r| r.id)
    }

    fn create_from_entry(
        &mut self,
        entry: &ResultEntry,
        control: &str,
        shape: Shape,
        state: Option<LabelState>,
    ) -> Result<RegionId, RegionError> {
        let id = self.ids.next_region_id();
        let shape = match shape {
            Shape::Polygon(mut poly) => {
                poly.region = id;
                for point in &mut poly.points {
                    point.region = id;
                }
                Shape::Polygon(poly)
            }
            other => other,
        };
        let pid = entry.id.clone().unwrap_or_else(|| self.ids.new_pid());
        let mut region = Region::new(id, pid, &entry.to_name, control, CoordsType::Perc, shape);
        region.origin = entry.origin;
        region.score = entry.score;
        region.readonly = entry.readonly;
        if let Some(state) = state {
            region.attach_state(state);
        }

        let media = self.object(&entry.to_name)?.media;
        region.update_image_size(&media);
        info!("{}: restored {} region {}", entry.to_name, region.kind(), region.pid);
        self.insert_region(region)
    }

    /// Takes the natural image size from the entry when the host has not
    /// measured the media yet.
    fn adopt_original_size(&mut self, entry: &ResultEntry) -> Result<(), RegionError> {
        let (Some(width), Some(height)) = (entry.original_width, entry.original_height) else {
            return Ok(());
        };
        let object = self.object(&entry.to_name)?;
        if object.kind.is_visual() && object.media.natural_width <= 1.0 && width > 1 && height > 1 {
            self.set_natural_size(&entry.to_name, width as f64, height as f64)?;
        }
        Ok(())
    }

    // ========================================================================
    // Relation entries
    // ========================================================================

    fn apply_relation(&mut self, raw: &Value, context: &IssueContext, report: &mut LoadReport) -> Result<(), RegionError> {
        let entry: RelationEntry =
            serde_json::from_value(raw.clone()).map_err(|source| RegionError::value(source.to_string()))?;
        let from = self.resolve_pid(&entry.from_id)?;
        let to = self.resolve_pid(&entry.to_id)?;

        if let Some(control) = self.config.relations() {
            if let Some(label) = entry.labels.iter().find(|l| !control.has_option(l)) {
                return Err(RegionError::UnknownLabel {
                    control: control.name.clone(),
                    label: label.clone(),
                });
            }
        }

        if !self.relations.add(from, to) {
            report.add(LoadIssue::warning(
                ErrorKind::Reference,
                format!("duplicate or self relation {} -> {}", entry.from_id, entry.to_id),
                context.clone(),
            ));
            return Ok(());
        }
        if let Some(relation) = self.relations.find_mut(from, to) {
            relation.direction = entry.direction;
            relation.labels = entry.labels;
        }
        Ok(())
    }

    fn resolve_pid(&self, pid: &str) -> Result<RegionId, RegionError> {
        self.region_by_pid(pid)
            .map(|r| r.id)
            .ok_or_else(|| RegionError::UnknownRegion { id: pid.to_string() })
    }
}

/// Selected labels of a labels-control entry, checked against the options.
fn label_values(entry: &ResultEntry, control: &ControlTag) -> Result<Vec<String>, RegionError> {
    let values = string_list(&entry.value, &entry.result_type)
        .or_else(|| string_list(&entry.value, control.result_type()))
        .transpose()
        .map_err(RegionError::value)?
        .unwrap_or_default();
    check_options(&values, control)?;
    if values.is_empty() && !control.accepts_empty() {
        return Err(RegionError::EmptyLabels {
            control: control.name.clone(),
        });
    }
    Ok(values)
}

fn classification_values(entry: &ResultEntry, control: &ControlTag) -> Result<Vec<String>, RegionError> {
    let key = if control.kind == ControlKind::TextArea { "text" } else { "choices" };
    let values = string_list(&entry.value, key)
        .transpose()
        .map_err(RegionError::value)?
        .unwrap_or_default();
    if control.kind == ControlKind::Choices {
        check_options(&values, control)?;
        if control.choice == ChoiceMode::Single && values.len() > 1 {
            return Err(RegionError::value(format!(
                "control '{}' allows a single choice, got {}",
                control.name,
                values.len()
            )));
        }
        if values.is_empty() && !control.accepts_empty() {
            return Err(RegionError::EmptyLabels {
                control: control.name.clone(),
            });
        }
    }
    Ok(values)
}

fn check_options(values: &[String], control: &ControlTag) -> Result<(), RegionError> {
    match values.iter().find(|v| !control.has_option(v)) {
        Some(label) => Err(RegionError::UnknownLabel {
            control: control.name.clone(),
            label: label.clone(),
        }),
        None => Ok(()),
    }
}

fn same_geometry(wanted: &Map<String, Value>, have: &Map<String, Value>) -> bool {
    GEOMETRY_KEYS
        .iter()
        .all(|key| match (wanted.get(*key), have.get(*key)) {
            (None, None) => true,
            (Some(a), Some(b)) => approx_eq(a, b),
            _ => false,
        })
}

fn approx_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => (x - y).abs() <= GEOMETRY_TOLERANCE * x.abs().max(y.abs()).max(1.0),
            _ => false,
        },
        (Value::Array(x), Value::Array(y)) => x.len() == y.len() && x.iter().zip(y).all(|(x, y)| approx_eq(x, y)),
        _ => a == b,
    }
}

impl Applied {
    /// The region the entry ended up on.
    pub fn region(&self) -> Option<RegionId> {
        match self {
            Applied::Created(id) | Applied::Merged(id) => Some(*id),
            Applied::Kept => None,
        }
    }
}
