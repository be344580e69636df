//! Click-to-place keypoints.

use log::debug;

use super::{finalize, Tool, ToolContext, ToolEvent, ToolOutcome};
use crate::error::RegionError;
use crate::region::keypoint::DEFAULT_WIDTH;
use crate::region::{KeyPoint, Shape, ShapeKind};

pub(super) fn handle(tool: &mut Tool, ctx: &mut ToolContext<'_>, event: ToolEvent) -> Result<ToolOutcome, RegionError> {
    let ToolEvent::Click { x, y } = event else {
        return Ok(ToolOutcome::Idle);
    };
    let Some((control, values)) = ctx.resolve_control(ShapeKind::KeyPoint) else {
        debug!("{}: no active label for a keypoint", ctx.object.name);
        return Ok(ToolOutcome::Idle);
    };
    finalize(ctx);

    let media = ctx.object.media;
    let (x, y) = media.clamp_to_stage(x, y);
    let width = control.stroke_width.unwrap_or(DEFAULT_WIDTH);
    let id = ctx.create_region(control, values, |_| {
        Shape::KeyPoint(KeyPoint::from_pixels(x, y, width, &media))
    });
    ctx.commit(id);
    tool.reset();
    Ok(ToolOutcome::Committed(id))
}
