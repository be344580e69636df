//! Drag-to-draw rectangles.

use log::debug;

use super::{finalize, Tool, ToolContext, ToolEvent, ToolMode, ToolOutcome};
use crate::error::RegionError;
use crate::geom::RegionId;
use crate::region::{Rect, Shape, ShapeKind};

pub(super) fn handle(tool: &mut Tool, ctx: &mut ToolContext<'_>, event: ToolEvent) -> Result<ToolOutcome, RegionError> {
    let media = ctx.object.media;
    match event {
        ToolEvent::MouseDown { x, y } => {
            let Some((control, values)) = ctx.resolve_control(ShapeKind::Rectangle) else {
                debug!("{}: no active label for a rectangle", ctx.object.name);
                return Ok(ToolOutcome::Idle);
            };
            finalize(ctx);
            let (x, y) = media.clamp_to_stage(x, y);
            let id = ctx.create_region(control, values, |_| {
                Shape::Rect(Rect::from_pixels(x, y, 0.0, 0.0, &media))
            });
            tool.mode = ToolMode::Drawing;
            tool.anchor = Some((x, y));
            Ok(ToolOutcome::Started(id))
        }
        ToolEvent::MouseMove { x, y } => {
            let Some(id) = drag_to(tool, ctx, x, y) else {
                return Ok(ToolOutcome::Idle);
            };
            Ok(ToolOutcome::Updated(id))
        }
        ToolEvent::MouseUp { x, y } => {
            let Some(id) = drag_to(tool, ctx, x, y) else {
                return Ok(ToolOutcome::Idle);
            };
            tool.reset();
            let undersized = matches!(
                ctx.regions.get(&id).map(|r| &r.shape),
                Some(Shape::Rect(rect)) if rect.is_undersized()
            );
            if undersized {
                ctx.discard(id);
                return Ok(ToolOutcome::Discarded);
            }
            ctx.commit(id);
            Ok(ToolOutcome::Committed(id))
        }
        ToolEvent::Click { .. } | ToolEvent::Cancel => Ok(ToolOutcome::Idle),
    }
}

/// Stretches the rectangle in progress from the anchor to the pointer.
fn drag_to(tool: &mut Tool, ctx: &mut ToolContext<'_>, x: f64, y: f64) -> Option<RegionId> {
    if !tool.is_drawing() {
        return None;
    }
    let Some(id) = ctx.in_progress() else {
        tool.reset();
        return None;
    };
    let (ax, ay) = tool.anchor?;
    let media = ctx.object.media;
    let (cx, cy) = media.clamp_to_stage(x, y);
    let region = ctx.region_mut(id)?;
    let Shape::Rect(rect) = &mut region.shape else {
        return None;
    };
    rect.set_position(ax.min(cx), ay.min(cy), (cx - ax).abs(), (cy - ay).abs(), 0.0, &media);
    Some(id)
}
