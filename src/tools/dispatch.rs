//! Routing events from the host to the selected tool of an object.

use log::{debug, info};

use super::{brush, finalize, floodfill, keypoint, polygon, rect, ToolContext, ToolEvent, ToolKind, ToolOutcome};
use crate::error::RegionError;
use crate::store::Annotation;

impl Annotation {
    /// Makes `kind` the selected tool of `object`.
    ///
    /// Switching to a different tool finishes the shape in progress first.
    pub fn select_tool(&mut self, object: &str, kind: ToolKind) -> Result<(), RegionError> {
        let manager = self
            .tools
            .get(object)
            .ok_or_else(|| RegionError::UnknownObject { name: object.to_string() })?;
        if !manager.has(kind) {
            return Err(RegionError::InvalidArgument(format!(
                "tool '{}' is not available on '{object}'",
                kind.name()
            )));
        }
        if manager.selected() != Some(kind) && !self.read_only {
            self.finish_drawing(object)?;
        }
        if let Some(manager) = self.tools.get_mut(object) {
            manager.select(kind)?;
        }
        debug!("{object}: selected tool {}", kind.name());
        Ok(())
    }

    /// Feeds one event to the selected tool of `object`.
    pub fn handle_event(&mut self, object: &str, event: ToolEvent) -> Result<ToolOutcome, RegionError> {
        self.ensure_writable()?;
        let selected = self.selected();
        let obj = self
            .objects
            .get_mut(object)
            .ok_or_else(|| RegionError::UnknownObject { name: object.to_string() })?;
        let Some(tool) = self.tools.get_mut(object).and_then(|m| m.selected_tool_mut()) else {
            debug!("{object}: event without a selected tool");
            return Ok(ToolOutcome::Idle);
        };
        if !obj.media.is_measured() {
            return Err(RegionError::MediaNotMeasured {
                object: object.to_string(),
            });
        }

        let mut ctx = ToolContext {
            object: obj,
            regions: &mut self.regions,
            ids: &mut self.ids,
            config: &self.config,
            active_labels: &self.active_labels,
            selected,
        };
        let outcome = match (event, tool.kind) {
            (ToolEvent::Cancel, _) => {
                tool.reset();
                finalize(&mut ctx)
            }
            (_, ToolKind::Rectangle) => rect::handle(tool, &mut ctx, event)?,
            (_, ToolKind::Polygon) => polygon::handle(tool, &mut ctx, event)?,
            (_, ToolKind::KeyPoint) => keypoint::handle(tool, &mut ctx, event)?,
            (_, ToolKind::Brush | ToolKind::Eraser) => brush::handle(tool, &mut ctx, event)?,
            (_, ToolKind::FloodFill) => floodfill::handle(tool, &mut ctx, event)?,
        };

        self.after_outcome(object, outcome)?;
        Ok(outcome)
    }

    /// Finishes the shape in progress on `object`: undersized shapes are
    /// dropped, open polygons are closed.
    pub fn finish_drawing(&mut self, object: &str) -> Result<ToolOutcome, RegionError> {
        self.ensure_writable()?;
        let selected = self.selected();
        let obj = self
            .objects
            .get_mut(object)
            .ok_or_else(|| RegionError::UnknownObject { name: object.to_string() })?;
        if let Some(manager) = self.tools.get_mut(object) {
            manager.reset_all();
        }
        let mut ctx = ToolContext {
            object: obj,
            regions: &mut self.regions,
            ids: &mut self.ids,
            config: &self.config,
            active_labels: &self.active_labels,
            selected,
        };
        let outcome = finalize(&mut ctx);
        self.after_outcome(object, outcome)?;
        Ok(outcome)
    }

    fn after_outcome(&mut self, object: &str, outcome: ToolOutcome) -> Result<(), RegionError> {
        match outcome {
            ToolOutcome::Committed(id) => {
                info!("{object}: committed region {id}");
            }
            ToolOutcome::Closed(id) => {
                info!("{object}: closed region {id}");
                self.select_region(id)?;
            }
            ToolOutcome::Discarded => {
                info!("{object}: discarded unfinished region");
            }
            ToolOutcome::Idle | ToolOutcome::Started(_) | ToolOutcome::Updated(_) => {}
        }
        Ok(())
    }
}
