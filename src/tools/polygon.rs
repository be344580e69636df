//! Click-to-place polygons.
//!
//! Each click adds a vertex; a click near the first vertex seals the
//! polygon. Selecting a different label between clicks seals the open
//! polygon and starts a new one.

use log::debug;

use super::{finalize, Tool, ToolContext, ToolEvent, ToolMode, ToolOutcome};
use crate::error::RegionError;
use crate::region::{Polygon, Shape, ShapeKind};

pub(super) fn handle(tool: &mut Tool, ctx: &mut ToolContext<'_>, event: ToolEvent) -> Result<ToolOutcome, RegionError> {
    let ToolEvent::Click { x, y } = event else {
        return Ok(ToolOutcome::Idle);
    };
    let media = ctx.object.media;
    let (x, y) = media.clamp_to_stage(x, y);
    let resolved = ctx.resolve_control(ShapeKind::Polygon);

    if let Some(id) = ctx.in_progress() {
        let labels_changed = match &resolved {
            Some((_, values)) => !values.is_empty() && *values != ctx.labels_of(id),
            None => false,
        };
        if !labels_changed {
            if let Some(Shape::Polygon(poly)) = ctx.region_mut(id).map(|r| &mut r.shape) {
                if poly.can_close(x, y) {
                    poly.close()?;
                    ctx.commit(id);
                    tool.reset();
                    debug!("{}: closed polygon {id}", ctx.object.name);
                    return Ok(ToolOutcome::Closed(id));
                }
                poly.add_point(x, y, &media);
                return Ok(ToolOutcome::Updated(id));
            }
        }
        debug!("{}: sealing unfinished region {id} before a new one", ctx.object.name);
        finalize(ctx);
    }

    let Some((control, values)) = resolved else {
        debug!("{}: no active label for a polygon", ctx.object.name);
        tool.reset();
        return Ok(ToolOutcome::Idle);
    };
    let id = ctx.create_region(control, values, |id| {
        let mut poly = Polygon::new(id);
        poly.add_point(x, y, &media);
        Shape::Polygon(poly)
    });
    tool.mode = ToolMode::Drawing;
    Ok(ToolOutcome::Started(id))
}
