//! Click-to-fill polygons from similar-coloured pixels.

use log::{debug, warn};

use super::{finalize, Tool, ToolContext, ToolEvent, ToolOutcome};
use crate::error::RegionError;
use crate::geom::floodfill::fill_outline;
use crate::region::{Polygon, Shape, ShapeKind};

/// Colour tolerance used when the control sets no `threshold`.
pub const DEFAULT_THRESHOLD: f64 = 10.0;

pub(super) fn handle(tool: &mut Tool, ctx: &mut ToolContext<'_>, event: ToolEvent) -> Result<ToolOutcome, RegionError> {
    let ToolEvent::Click { x, y } = event else {
        return Ok(ToolOutcome::Idle);
    };
    let Some((control, values)) = ctx.resolve_control(ShapeKind::Polygon) else {
        debug!("{}: no active label for a fill", ctx.object.name);
        return Ok(ToolOutcome::Idle);
    };
    let media = ctx.object.media;
    let Some(pixels) = ctx.object.pixels.as_ref() else {
        warn!("{}: flood fill without pixel data", ctx.object.name);
        return Ok(ToolOutcome::Idle);
    };

    let (x, y) = media.clamp_to_stage(x, y);
    let (nx, ny) = media.stage_to_natural(x, y);
    let threshold = control.threshold.unwrap_or(DEFAULT_THRESHOLD);
    let Some(outline) = fill_outline(pixels, nx.floor() as u32, ny.floor() as u32, threshold) else {
        debug!("{}: fill at ({nx:.0}, {ny:.0}) produced no outline", ctx.object.name);
        return Ok(ToolOutcome::Idle);
    };

    finalize(ctx);
    let id = ctx.create_region(control, values, |id| {
        let mut poly = Polygon::new(id);
        for (px, py) in &outline {
            let (sx, sy) = media.natural_to_stage(*px, *py);
            poly.add_point(sx, sy, &media);
        }
        poly.closed = true;
        Shape::Polygon(poly)
    });
    ctx.commit(id);
    tool.reset();
    debug!("{}: filled polygon {id} with {} points", ctx.object.name, outline.len());
    Ok(ToolOutcome::Closed(id))
}
