//! The annotation store.
//!
//! [`Annotation`] owns everything one annotation session needs: the parsed
//! configuration, one [`LabeledObject`] per object tag, the region arena,
//! relations, per-object tool registries and the modal state (active labels,
//! relation mode, highlighted node, read-only flag).
//!
//! Regions are addressed by [`RegionId`] everywhere. Objects list the ids of
//! their regions; regions name their object. Nothing holds a pointer into
//! the arena, so deleting a region can never leave a dangling reference.

mod editing;
mod object;
mod relation;
mod selection;

pub use object::LabeledObject;
pub use relation::{Direction, Relation, RelationStore};

use std::collections::BTreeMap;

use image::RgbaImage;
use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::config::LabelConfig;
use crate::error::RegionError;
use crate::geom::{IdGenerator, RegionId};
use crate::region::{Region, Selectable, Shape};
use crate::tools::ToolManager;

/// One annotation over a task's objects.
#[derive(Debug)]
pub struct Annotation {
    pub(crate) config: LabelConfig,
    pub(crate) objects: BTreeMap<String, LabeledObject>,
    pub(crate) regions: BTreeMap<RegionId, Region>,
    pub(crate) ids: IdGenerator,
    pub(crate) relations: RelationStore,
    pub(crate) tools: BTreeMap<String, ToolManager>,
    /// Selected option values per control.
    pub(crate) active_labels: BTreeMap<String, Vec<String>>,
    pub(crate) relation_mode: bool,
    pub(crate) highlighted: Option<RegionId>,
    pub(crate) read_only: bool,
    /// Latest requested display size per object, applied by `run_deferred`.
    pub(crate) pending_resize: BTreeMap<String, (f64, f64)>,
    /// Wire entries that are not about regions, kept verbatim.
    pub(crate) passthrough: Vec<Value>,
    /// User-visible error messages from the last load.
    pub(crate) errors: Vec<String>,
}

impl Annotation {
    /// Creates an empty annotation. `data` is the task's data map; object
    /// tags resolve their `$key` references against it.
    pub fn new(config: LabelConfig, data: &Map<String, Value>) -> Self {
        let mut objects = BTreeMap::new();
        let mut tools = BTreeMap::new();
        for tag in &config.objects {
            let source = data.get(tag.data_key()).and_then(Value::as_str).map(ToOwned::to_owned);
            objects.insert(tag.name.clone(), LabeledObject::new(tag, source));
            tools.insert(tag.name.clone(), ToolManager::for_object(&config, tag));
        }
        Self {
            config,
            objects,
            regions: BTreeMap::new(),
            ids: IdGenerator::new(),
            relations: RelationStore::new(),
            tools,
            active_labels: BTreeMap::new(),
            relation_mode: false,
            highlighted: None,
            read_only: false,
            pending_resize: BTreeMap::new(),
            passthrough: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    pub fn object(&self, name: &str) -> Result<&LabeledObject, RegionError> {
        self.objects.get(name).ok_or_else(|| RegionError::UnknownObject {
            name: name.to_string(),
        })
    }

    pub fn objects(&self) -> impl Iterator<Item = &LabeledObject> {
        self.objects.values()
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&id)
    }

    /// Finds a region by its pairing id.
    pub fn region_by_pid(&self, pid: &str) -> Option<&Region> {
        self.regions.values().find(|r| r.pid == pid)
    }

    /// All regions, in object order and then creation order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.objects
            .values()
            .flat_map(|o| o.regions.iter())
            .filter_map(|id| self.regions.get(id))
    }

    pub fn regions_of<'a>(&'a self, object: &str) -> impl Iterator<Item = &'a Region> + 'a {
        self.objects
            .get(object)
            .into_iter()
            .flat_map(|o| o.regions.iter())
            .filter_map(|id| self.regions.get(id))
    }

    pub fn relations(&self) -> &RelationStore {
        &self.relations
    }

    /// The currently selected region, if any.
    pub fn selected(&self) -> Option<RegionId> {
        self.regions.values().find(|r| r.is_selected()).map(|r| r.id)
    }

    /// The currently inspected node.
    pub fn highlighted(&self) -> Option<RegionId> {
        self.highlighted
    }

    pub fn is_relation_mode(&self) -> bool {
        self.relation_mode
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Messages a host would show in an error modal.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Values currently selected on `control`.
    pub fn active_labels(&self, control: &str) -> &[String] {
        self.active_labels.get(control).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tools(&self, object: &str) -> Option<&ToolManager> {
        self.tools.get(object)
    }

    // ========================================================================
    // Media size
    // ========================================================================

    /// Records the intrinsic media size. The display size defaults to it.
    pub fn set_natural_size(&mut self, object: &str, width: f64, height: f64) -> Result<(), RegionError> {
        let obj = self.object_mut(object)?;
        obj.media.natural_width = width;
        obj.media.natural_height = height;
        if obj.media.stage_width <= 0.0 || obj.media.stage_height <= 0.0 {
            obj.media.stage_width = width;
            obj.media.stage_height = height;
        }
        debug!("{object}: natural size {width}x{height}");
        self.refresh_geometry(object);
        Ok(())
    }

    /// Sets the display size immediately.
    pub fn set_stage_size(&mut self, object: &str, width: f64, height: f64) -> Result<(), RegionError> {
        let obj = self.object_mut(object)?;
        obj.media.stage_width = width;
        obj.media.stage_height = height;
        self.refresh_geometry(object);
        Ok(())
    }

    /// Schedules a display resize. Repeated calls before
    /// [`run_deferred`](Self::run_deferred) keep only the latest size.
    pub fn resize_stage(&mut self, object: &str, width: f64, height: f64) -> Result<(), RegionError> {
        self.object(object)?;
        self.pending_resize.insert(object.to_string(), (width, height));
        Ok(())
    }

    /// Applies scheduled work. Returns the number of objects resized.
    pub fn run_deferred(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_resize);
        let mut applied = 0;
        for (object, (width, height)) in pending {
            if self.set_stage_size(&object, width, height).is_ok() {
                applied += 1;
            }
        }
        applied
    }

    /// Supplies decoded pixels for flood fill. Sets the natural size when it
    /// is not known yet.
    pub fn set_pixels(&mut self, object: &str, pixels: RgbaImage) -> Result<(), RegionError> {
        let (w, h) = pixels.dimensions();
        let measured = {
            let obj = self.object_mut(object)?;
            obj.pixels = Some(pixels);
            obj.media.natural_width > 1.0
        };
        if !measured {
            self.set_natural_size(object, w as f64, h as f64)?;
        }
        Ok(())
    }

    /// Recomputes pixel geometry after a size change. Restored brush masks
    /// that do not cover the measured media are dropped and reported.
    fn refresh_geometry(&mut self, object: &str) {
        let Some(obj) = self.objects.get(object) else {
            return;
        };
        let media = obj.media;
        let mut invalid = Vec::new();
        for id in &obj.regions {
            let Some(region) = self.regions.get_mut(id) else {
                continue;
            };
            region.update_image_size(&media);
            if let Shape::Brush(brush) = &region.shape {
                if let Err(err) = brush.check_rle(&media) {
                    invalid.push((*id, err));
                }
            }
        }

        for (id, err) in invalid {
            if let Some(region) = self.remove_region(id) {
                warn!("{object}: dropping brush {}: {err}", region.pid);
                self.errors.push(format!("{object}: brush {}: {err}", region.pid));
            }
        }
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    pub(crate) fn object_mut(&mut self, name: &str) -> Result<&mut LabeledObject, RegionError> {
        self.objects.get_mut(name).ok_or_else(|| RegionError::UnknownObject {
            name: name.to_string(),
        })
    }

    pub(crate) fn ensure_writable(&self) -> Result<(), RegionError> {
        if self.read_only {
            return Err(RegionError::ReadOnly);
        }
        Ok(())
    }

    pub(crate) fn region_ref(&self, id: RegionId) -> Result<&Region, RegionError> {
        self.regions.get(&id).ok_or_else(|| RegionError::UnknownRegion { id: id.to_string() })
    }

    /// A region that may be edited right now.
    pub(crate) fn editable_region(&mut self, id: RegionId) -> Result<&mut Region, RegionError> {
        self.ensure_writable()?;
        let region = self
            .regions
            .get_mut(&id)
            .ok_or_else(|| RegionError::UnknownRegion { id: id.to_string() })?;
        region.ensure_editable()?;
        Ok(region)
    }

    /// Adds a region to the arena and its object.
    pub(crate) fn insert_region(&mut self, region: Region) -> Result<RegionId, RegionError> {
        let id = region.id;
        self.object_mut(&region.object)?.push_region(id);
        self.regions.insert(id, region);
        Ok(id)
    }

    /// Removes a region with everything that points at it.
    pub(crate) fn remove_region(&mut self, id: RegionId) -> Option<Region> {
        let mut region = self.regions.remove(&id)?;
        if let Some(obj) = self.objects.get_mut(&region.object) {
            obj.remove_region(id);
        }
        let dropped = self.relations.remove_region(id);
        if self.highlighted == Some(id) {
            self.highlighted = None;
        }
        region.destroy();
        info!("removed region {} ({} relation(s) dropped)", region.pid, dropped);
        Some(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::CoordsType;
    use crate::region::{Rect, Shape};

    fn annotation() -> Annotation {
        let config = LabelConfig::parse(
            r#"<View><Image name="img" value="$image"/>
               <RectangleLabels name="tag" toName="img"><Label value="A"/></RectangleLabels></View>"#,
        )
        .unwrap();
        let data = serde_json::json!({ "image": "http://example.com/a.jpg" });
        Annotation::new(config, data.as_object().unwrap())
    }

    fn add_rect(ann: &mut Annotation) -> RegionId {
        let id = ann.ids.next_region_id();
        let region = Region::new(
            id,
            ann.ids.new_pid(),
            "img",
            "tag",
            CoordsType::Perc,
            Shape::Rect(Rect::from_percent(10.0, 10.0, 50.0, 50.0, 0.0)),
        );
        ann.insert_region(region).unwrap()
    }

    #[test]
    fn objects_resolve_data_references() {
        let ann = annotation();
        let obj = ann.object("img").unwrap();
        assert_eq!(obj.source.as_deref(), Some("http://example.com/a.jpg"));
        assert!(ann.object("missing").is_err());
    }

    #[test]
    fn deferred_resize_keeps_latest_size() {
        let mut ann = annotation();
        ann.set_natural_size("img", 200.0, 100.0).unwrap();
        let id = add_rect(&mut ann);
        ann.refresh_geometry("img");

        ann.resize_stage("img", 50.0, 25.0).unwrap();
        ann.resize_stage("img", 400.0, 200.0).unwrap();
        assert_eq!(ann.run_deferred(), 1);
        assert_eq!(ann.run_deferred(), 0);

        let Shape::Rect(rect) = &ann.region(id).unwrap().shape else {
            panic!("expected rect");
        };
        assert_eq!((rect.x, rect.width), (40.0, 200.0));
    }

    #[test]
    fn read_only_refuses_edits() {
        let mut ann = annotation();
        let id = add_rect(&mut ann);
        ann.set_read_only(true);
        assert!(matches!(ann.editable_region(id), Err(RegionError::ReadOnly)));
    }

    #[test]
    fn removing_clears_object_list() {
        let mut ann = annotation();
        let id = add_rect(&mut ann);
        assert!(ann.remove_region(id).is_some());
        assert_eq!(ann.regions_of("img").count(), 0);
        assert!(ann.remove_region(id).is_none());
    }
}
