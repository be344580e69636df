//! Selection, highlighting and relation mode.

use log::{debug, info};

use super::Annotation;
use crate::error::RegionError;
use crate::geom::RegionId;
use crate::region::{Highlightable, Selectable};

impl Annotation {
    /// Selects a region.
    ///
    /// Any other selected region is unselected first and an unfinished shape
    /// on the region's object is finalized. The region becomes the
    /// highlighted node.
    pub fn select_region(&mut self, id: RegionId) -> Result<(), RegionError> {
        let object = self.region_ref(id)?.object.clone();
        if !self.read_only {
            self.finish_drawing(&object)?;
        }
        // finishing may have discarded the region itself
        self.region_ref(id)?;

        for region in self.regions.values_mut() {
            region.set_selected(false);
        }
        if let Some(region) = self.regions.get_mut(&id) {
            region.set_selected(true);
        }
        self.set_highlighted_node(Some(id));
        debug!("selected region {id}");
        Ok(())
    }

    /// Unselects a region. Leaves relation mode first if it is active.
    pub fn unselect_region(&mut self, id: RegionId) -> Result<(), RegionError> {
        if self.relation_mode {
            self.stop_relation_mode();
        }
        let region = self
            .regions
            .get_mut(&id)
            .ok_or_else(|| RegionError::UnknownRegion { id: id.to_string() })?;
        region.set_selected(false);
        if self.highlighted == Some(id) {
            self.set_highlighted_node(None);
        }
        Ok(())
    }

    pub fn unselect_all(&mut self) {
        for region in self.regions.values_mut() {
            region.set_selected(false);
        }
        self.set_highlighted_node(None);
    }

    /// Handles a click on a region.
    ///
    /// In relation mode this links the selected region to the clicked one,
    /// leaves relation mode and clears the selection. Otherwise selection is
    /// toggled.
    pub fn on_click_region(&mut self, id: RegionId) -> Result<(), RegionError> {
        self.region_ref(id)?;
        if self.relation_mode {
            if let Some(from) = self.selected() {
                if self.relations.add(from, id) {
                    info!("linked region {from} -> {id}");
                }
            }
            self.stop_relation_mode();
            self.unselect_all();
            return Ok(());
        }

        if self.region_ref(id)?.is_selected() {
            self.unselect_region(id)
        } else {
            self.select_region(id)
        }
    }

    /// Hover or candidate highlight. Never persisted.
    pub fn set_highlight(&mut self, id: RegionId, highlighted: bool) -> Result<(), RegionError> {
        let region = self
            .regions
            .get_mut(&id)
            .ok_or_else(|| RegionError::UnknownRegion { id: id.to_string() })?;
        region.set_highlight(highlighted);
        Ok(())
    }

    /// Enters relation mode. Needs a selected region to link from.
    pub fn start_relation_mode(&mut self) -> Result<(), RegionError> {
        self.ensure_writable()?;
        if self.selected().is_none() {
            return Err(RegionError::InvalidArgument(
                "relation mode needs a selected region".into(),
            ));
        }
        self.relation_mode = true;
        Ok(())
    }

    pub fn stop_relation_mode(&mut self) {
        self.relation_mode = false;
        for region in self.regions.values_mut() {
            region.set_highlight(false);
        }
    }

    /// Sets the single highlighted node, clearing the previous one.
    fn set_highlighted_node(&mut self, id: Option<RegionId>) {
        if let Some(previous) = self.highlighted.take() {
            if let Some(region) = self.regions.get_mut(&previous) {
                region.set_highlight(false);
            }
        }
        if let Some(id) = id {
            if let Some(region) = self.regions.get_mut(&id) {
                region.set_highlight(true);
            }
        }
        self.highlighted = id;
    }
}
