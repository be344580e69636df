use image::{Rgba, RgbaImage};
use regionkit::geom::floodfill::fill_outline;
use regionkit::region::Classifiable;
use regionkit::{ShapeKind, ToolEvent, ToolKind, ToolOutcome};
use serde_json::json;

mod common;

const BACKGROUND: Rgba<u8> = Rgba([250, 250, 250, 255]);
const BLOCK: Rgba<u8> = Rgba([30, 90, 200, 255]);

/// A 40x40 image with a uniform block covering x 10..30, y 5..15.
fn block_image() -> RgbaImage {
    let mut img = RgbaImage::from_pixel(40, 40, BACKGROUND);
    for y in 5..15 {
        for x in 10..30 {
            img.put_pixel(x, y, BLOCK);
        }
    }
    img
}

/// Even-odd test against a polygon given as vertices.
fn inside(outline: &[(f64, f64)], x: f64, y: f64) -> bool {
    let mut hit = false;
    let mut j = outline.len() - 1;
    for i in 0..outline.len() {
        let (xi, yi) = outline[i];
        let (xj, yj) = outline[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            hit = !hit;
        }
        j = i;
    }
    hit
}

#[test]
fn uniform_block_becomes_a_closed_outline() {
    let img = block_image();
    let outline = fill_outline(&img, 17, 9, 10.0).expect("outline");
    assert!(outline.len() >= 3);
    assert_eq!(outline, vec![(10.0, 5.0), (30.0, 5.0), (30.0, 15.0), (10.0, 15.0)]);
    assert!(inside(&outline, 17.5, 9.5));
    assert!(!inside(&outline, 5.5, 9.5));
}

#[test]
fn noisy_block_within_threshold_is_one_area() {
    let mut img = block_image();
    img.put_pixel(20, 10, Rgba([36, 84, 206, 255]));
    let outline = fill_outline(&img, 12, 6, 10.0).expect("outline");
    assert_eq!(outline.len(), 4);

    // a stricter threshold leaves a hole, which the outer border ignores
    let strict = fill_outline(&img, 12, 6, 0.0).expect("outline");
    assert_eq!(strict, outline);
}

#[test]
fn fill_tool_commits_a_polygon() {
    let mut ann = common::image_annotation(common::SHAPES_CONFIG, 40.0, 40.0);
    ann.set_pixels("img", block_image()).unwrap();
    ann.select_label("outline", "Lake").unwrap();
    ann.select_tool("img", ToolKind::FloodFill).unwrap();

    let outcome = ann.handle_event("img", ToolEvent::Click { x: 15.0, y: 10.0 }).unwrap();
    let ToolOutcome::Closed(id) = outcome else {
        panic!("expected a filled polygon, got {outcome:?}");
    };
    let region = ann.region(id).unwrap();
    assert_eq!(region.kind(), ShapeKind::Polygon);
    assert_eq!(region.label_values(), vec!["Lake"]);

    let out = ann.serialize().unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["type"], "polygonlabels");
    assert_eq!(
        out[0]["value"]["points"],
        json!([[25.0, 12.5], [75.0, 12.5], [75.0, 37.5], [25.0, 37.5]])
    );
}

#[test]
fn fill_tool_needs_pixels_and_a_label() {
    let mut ann = common::image_annotation(common::SHAPES_CONFIG, 40.0, 40.0);
    ann.select_label("outline", "Road").unwrap();
    ann.select_tool("img", ToolKind::FloodFill).unwrap();
    let click = ToolEvent::Click { x: 15.0, y: 10.0 };
    assert_eq!(ann.handle_event("img", click).unwrap(), ToolOutcome::Idle);

    ann.set_pixels("img", block_image()).unwrap();
    ann.clear_active_labels();
    assert_eq!(ann.handle_event("img", click).unwrap(), ToolOutcome::Idle);
    assert_eq!(ann.regions().count(), 0);
}

#[test]
fn pixels_measure_an_unmeasured_image() {
    let mut ann = common::annotation(common::SHAPES_CONFIG, json!({ "image": "photo.png" }));
    ann.set_pixels("img", block_image()).unwrap();
    let media = ann.object("img").unwrap().media;
    assert!(media.is_measured());
    assert_eq!((media.natural_width, media.stage_width), (40.0, 40.0));
}
