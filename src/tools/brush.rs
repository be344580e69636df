//! Freehand brush and eraser.
//!
//! A stroke runs from pointer-down to pointer-up. Painting while a brush
//! region is selected adds strokes to that region; the eraser only ever
//! works on the selected brush region.

use log::debug;

use super::{finalize, Tool, ToolContext, ToolEvent, ToolKind, ToolMode, ToolOutcome};
use crate::error::RegionError;
use crate::geom::RegionId;
use crate::region::brush::DEFAULT_STROKE_WIDTH;
use crate::region::{Brush, Shape, ShapeKind, StrokeKind};

pub(super) fn handle(tool: &mut Tool, ctx: &mut ToolContext<'_>, event: ToolEvent) -> Result<ToolOutcome, RegionError> {
    let media = ctx.object.media;
    match event {
        ToolEvent::MouseDown { x, y } => {
            let (x, y) = media.clamp_to_stage(x, y);
            let (nx, ny) = media.stage_to_natural(x, y);
            let kind = match tool.kind {
                ToolKind::Eraser => StrokeKind::Eraser,
                _ => StrokeKind::Add,
            };

            let (id, started) = match continue_target(tool.kind, ctx) {
                Some(id) => {
                    // the continued region becomes the object's last one
                    ctx.object.remove_region(id);
                    ctx.object.push_region(id);
                    (id, false)
                }
                None if kind == StrokeKind::Eraser => {
                    debug!("{}: eraser needs a selected brush region", ctx.object.name);
                    return Ok(ToolOutcome::Idle);
                }
                None => {
                    let Some((control, values)) = ctx.resolve_control(ShapeKind::Brush) else {
                        debug!("{}: no active label for a brush", ctx.object.name);
                        return Ok(ToolOutcome::Idle);
                    };
                    finalize(ctx);
                    (ctx.create_region(control, values, |_| Shape::Brush(Brush::new())), true)
                }
            };

            let width = stroke_width(ctx, id) / media.scale_x();
            let Some(region) = ctx.region_mut(id) else {
                return Ok(ToolOutcome::Idle);
            };
            region.set_drawing(true);
            if let Shape::Brush(brush) = &mut region.shape {
                brush.begin_stroke(kind, width);
                brush.add_point(nx, ny)?;
            }
            tool.mode = ToolMode::Drawing;
            Ok(if started {
                ToolOutcome::Started(id)
            } else {
                region.mark_changed();
                ToolOutcome::Updated(id)
            })
        }
        ToolEvent::MouseMove { x, y } => match paint_to(tool, ctx, x, y)? {
            Some(id) => Ok(ToolOutcome::Updated(id)),
            None => Ok(ToolOutcome::Idle),
        },
        ToolEvent::MouseUp { x, y } => {
            let Some(id) = paint_to(tool, ctx, x, y)? else {
                return Ok(ToolOutcome::Idle);
            };
            tool.reset();
            let has_content = matches!(
                ctx.regions.get(&id).map(|r| &r.shape),
                Some(Shape::Brush(brush)) if brush.has_content()
            );
            if !has_content {
                ctx.discard(id);
                return Ok(ToolOutcome::Discarded);
            }
            ctx.commit(id);
            Ok(ToolOutcome::Committed(id))
        }
        ToolEvent::Click { .. } | ToolEvent::Cancel => Ok(ToolOutcome::Idle),
    }
}

/// The selected, editable brush region of this object that a new stroke
/// should go to. A brush with different active labels starts afresh.
fn continue_target(kind: ToolKind, ctx: &ToolContext<'_>) -> Option<RegionId> {
    let id = ctx.selected?;
    let region = ctx.regions.get(&id)?;
    if region.object != ctx.object.name || region.kind() != ShapeKind::Brush || region.readonly {
        return None;
    }
    if kind == ToolKind::Brush {
        if let Some((_, values)) = ctx.resolve_control(ShapeKind::Brush) {
            if !values.is_empty() && values != ctx.labels_of(id) {
                return None;
            }
        }
    }
    Some(id)
}

/// Stroke width in display pixels from the region's control.
fn stroke_width(ctx: &ToolContext<'_>, id: RegionId) -> f64 {
    ctx.regions
        .get(&id)
        .and_then(|r| ctx.config.control(&r.control))
        .and_then(|c| c.stroke_width)
        .unwrap_or(DEFAULT_STROKE_WIDTH)
}

fn paint_to(tool: &mut Tool, ctx: &mut ToolContext<'_>, x: f64, y: f64) -> Result<Option<RegionId>, RegionError> {
    if !tool.is_drawing() {
        return Ok(None);
    }
    let Some(id) = ctx.in_progress() else {
        tool.reset();
        return Ok(None);
    };
    let media = ctx.object.media;
    let (x, y) = media.clamp_to_stage(x, y);
    let (nx, ny) = media.stage_to_natural(x, y);
    if let Some(Shape::Brush(brush)) = ctx.region_mut(id).map(|r| &mut r.shape) {
        brush.add_point(nx, ny)?;
    }
    Ok(Some(id))
}
