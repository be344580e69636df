use regionkit::codec::{from_tasks_str, to_tasks_string};
use regionkit::region::Classifiable;
use regionkit::{ErrorKind, Shape, ShapeKind};
use serde_json::{json, Value};

mod common;

fn num(value: &Value) -> f64 {
    value.as_f64().expect("number")
}

fn entry(id: &str, from: &str, result_type: &str, value: Value) -> Value {
    json!({ "id": id, "from_name": from, "to_name": "img", "type": result_type, "value": value })
}

fn find<'a>(out: &'a [Value], id: &str, result_type: &str) -> &'a Value {
    out.iter()
        .find(|e| e["id"] == id && e["type"] == result_type)
        .unwrap_or_else(|| panic!("no {result_type} entry for {id}"))
}

#[test]
fn spatial_shapes_round_trip_before_measurement() {
    let mut ann = common::annotation(common::SHAPES_CONFIG, json!({ "image": "photo.jpg" }));
    let input = vec![
        entry(
            "r1",
            "box",
            "rectanglelabels",
            json!({ "x": 12.5, "y": 30.25, "width": 40.0, "height": 10.0, "rotation": 15.0, "rectanglelabels": ["Car"] }),
        ),
        entry(
            "p1",
            "outline",
            "polygonlabels",
            json!({ "points": [[10.0, 10.0], [60.0, 15.0], [35.0, 70.0]], "polygonlabels": ["Lake"] }),
        ),
        entry("k1", "point", "keypointlabels", json!({ "x": 50.0, "y": 50.0, "width": 0.5, "keypointlabels": ["Eye"] })),
    ];
    let report = ann.deserialize(&input);
    assert!(report.is_ok_strict(), "{report}");
    assert_eq!(report.loaded, 3);

    let kinds: Vec<_> = ann.regions().map(|r| r.kind()).collect();
    assert_eq!(kinds, vec![ShapeKind::Rectangle, ShapeKind::Polygon, ShapeKind::KeyPoint]);

    let out = ann.serialize().unwrap();
    assert_eq!(out.len(), 3);

    let rect = find(&out, "r1", "rectanglelabels");
    for key in ["x", "y", "width", "height", "rotation"] {
        assert!(common::approx(num(&rect["value"][key]), num(&input[0]["value"][key]), 1e-9), "{key}");
    }
    assert_eq!(rect["value"]["rectanglelabels"], json!(["Car"]));
    // unmeasured images carry no original size
    assert!(rect.get("original_width").is_none());

    let poly = find(&out, "p1", "polygonlabels");
    assert_eq!(poly["value"]["points"], input[1]["value"]["points"]);
    assert_eq!(poly["value"]["closed"], true);

    let point = find(&out, "k1", "keypointlabels");
    assert!(common::approx(num(&point["value"]["width"]), 0.5, 1e-9));
}

#[test]
fn brush_rle_is_checked_once_the_media_is_measured() {
    let mut ann = common::image_annotation(common::SHAPES_CONFIG, 2.0, 2.0);
    let good = entry("b1", "paint", "brushlabels", json!({ "format": "rle", "rle": [1, 0, 2, 255, 1, 0], "brushlabels": ["Sky"] }));
    let short = entry("b2", "paint", "brushlabels", json!({ "format": "rle", "rle": [1, 0, 2, 255], "brushlabels": ["Sky"] }));
    let report = ann.deserialize(&[good, short]);
    assert_eq!(report.loaded, 1);
    assert_eq!(report.error_count(), 1);

    let out = ann.serialize().unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["value"]["rle"], json!([1, 0, 2, 255, 1, 0]));
    assert_eq!(out[0]["original_width"], 2);
}

#[test]
fn restored_brush_that_misses_the_measured_size_is_dropped() {
    let mut ann = common::annotation(common::SHAPES_CONFIG, json!({ "image": "photo.jpg" }));
    let rect = entry(
        "r1",
        "box",
        "rectanglelabels",
        json!({ "x": 10.0, "y": 10.0, "width": 20.0, "height": 20.0, "rectanglelabels": ["Car"] }),
    );
    let brush = entry("b1", "paint", "brushlabels", json!({ "format": "rle", "rle": [10, 0], "brushlabels": ["Sky"] }));
    let report = ann.deserialize(&[rect, brush]);
    assert!(report.is_ok_strict(), "{report}");
    assert_eq!(ann.regions().count(), 2);

    ann.set_natural_size("img", 4.0, 4.0).unwrap();
    assert!(ann.region_by_pid("b1").is_none());
    assert_eq!(ann.errors().len(), 1);
    assert!(ann.errors()[0].contains("rle covers 10 pixels"));

    let out = ann.serialize().unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["id"], "r1");
}

#[test]
fn same_geometry_under_different_ids_stays_two_regions() {
    let mut ann = common::image_annotation(common::SHAPES_CONFIG, 100.0, 100.0);
    let geometry = json!({ "x": 10.0, "y": 10.0, "width": 20.0, "height": 20.0 });
    let mut car = geometry.clone();
    car["rectanglelabels"] = json!(["Car"]);
    let mut tree = geometry;
    tree["rectanglelabels"] = json!(["Tree"]);
    let report = ann.deserialize(&[
        entry("a", "box", "rectanglelabels", car),
        entry("b", "box", "rectanglelabels", tree),
    ]);
    assert!(report.is_ok_strict(), "{report}");
    assert_eq!(report.loaded, 2);

    let out = ann.serialize().unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(find(&out, "a", "rectanglelabels")["value"]["rectanglelabels"], json!(["Car"]));
    assert_eq!(find(&out, "b", "rectanglelabels")["value"]["rectanglelabels"], json!(["Tree"]));
}

#[test]
fn text_and_audio_ranges_round_trip() {
    let mut ann = common::annotation(
        common::TEXT_CONFIG,
        json!({ "text": "Alice met Bob in Paris", "audio": "talk.wav" }),
    );
    let input = vec![
        json!({
            "id": "t1", "from_name": "ner", "to_name": "text", "type": "labels",
            "value": { "start": 0, "end": 5, "text": "Alice", "labels": ["PER"] }
        }),
        json!({
            "id": "t2", "from_name": "ner", "to_name": "text", "type": "labels",
            "value": { "start": 17, "end": 22, "labels": ["LOC"] }
        }),
        json!({
            "id": "a1", "from_name": "speaker", "to_name": "audio", "type": "labels",
            "value": { "start": 1.5, "end": 3.25, "labels": ["A"] }
        }),
    ];
    let report = ann.deserialize(&input);
    assert!(report.is_ok_strict(), "{report}");

    let kinds: Vec<_> = ann.regions().map(|r| r.kind()).collect();
    assert!(kinds.contains(&ShapeKind::CharacterRange));
    assert!(kinds.contains(&ShapeKind::TimeRange));

    let out = ann.serialize().unwrap();
    let alice = find(&out, "t1", "labels");
    assert_eq!(alice["value"]["text"], "Alice");
    assert_eq!(alice["value"]["labels"], json!(["PER"]));
    // a missing snapshot is taken from the content
    assert_eq!(find(&out, "t2", "labels")["value"]["text"], "Paris");

    let talk = find(&out, "a1", "labels");
    assert_eq!(talk["value"]["start"], 1.5);
    assert_eq!(talk["value"]["end"], 3.25);
    assert_eq!(talk["value"]["instant"], false);
}

#[test]
fn stale_text_snapshot_is_a_warning() {
    let mut ann = common::annotation(common::TEXT_CONFIG, json!({ "text": "Alice met Bob" }));
    let stale = json!({
        "id": "t1", "from_name": "ner", "to_name": "text", "type": "labels",
        "value": { "start": 0, "end": 5, "text": "Alicx", "labels": ["PER"] }
    });
    let report = ann.deserialize(&[stale]);
    assert!(report.is_ok());
    assert!(!report.is_ok_strict());
    assert_eq!(report.warning_count(), 1);
    assert_eq!(ann.regions().count(), 1);
}

#[test]
fn out_of_range_text_offsets_are_skipped() {
    let mut ann = common::annotation(common::TEXT_CONFIG, json!({ "text": "short" }));
    let bad = json!({
        "id": "t1", "from_name": "ner", "to_name": "text", "type": "labels",
        "value": { "start": 2, "end": 40, "labels": ["PER"] }
    });
    let report = ann.deserialize(&[bad]);
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.issues[0].kind, ErrorKind::Range);
    assert_eq!(ann.regions().count(), 0);
}

#[test]
fn entries_sharing_an_id_merge_into_one_region() {
    let mut ann = common::annotation(common::SHAPES_CONFIG, json!({ "image": "photo.jpg" }));
    let geometry = json!({ "x": 10.0, "y": 10.0, "width": 20.0, "height": 20.0, "rotation": 0.0 });
    let mut labels = geometry.clone();
    labels["rectanglelabels"] = json!(["Tree"]);
    let mut choices = geometry;
    choices["choices"] = json!(["sharp", "blurry"]);

    let report = ann.deserialize(&[
        entry("r1", "box", "rectanglelabels", labels),
        entry("r1", "quality", "choices", choices),
    ]);
    assert!(report.is_ok_strict(), "{report}");
    assert_eq!(ann.regions().count(), 1);
    let region = ann.regions().next().unwrap();
    assert_eq!(region.label_values(), vec!["Tree", "sharp", "blurry"]);

    let out = ann.serialize().unwrap();
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|e| e["id"] == "r1"));
    assert_eq!(find(&out, "r1", "choices")["value"]["choices"], json!(["sharp", "blurry"]));
}

#[test]
fn object_level_classification_is_kept_verbatim() {
    let mut ann = common::annotation(common::SHAPES_CONFIG, json!({ "image": "photo.jpg" }));
    let whole = entry("c1", "quality", "choices", json!({ "choices": ["blurry"] }));
    let report = ann.deserialize(std::slice::from_ref(&whole));
    assert!(report.is_ok_strict(), "{report}");
    assert_eq!(ann.regions().count(), 0);
    assert_eq!(ann.serialize().unwrap(), vec![whole]);
}

#[test]
fn relations_resolve_after_all_regions() {
    let mut ann = common::annotation(common::SHAPES_CONFIG, json!({ "image": "photo.jpg" }));
    let report = ann.deserialize(&[
        json!({ "type": "relation", "from_id": "a", "to_id": "b", "direction": "bi", "labels": ["next-to"] }),
        entry("a", "box", "rectanglelabels", json!({ "x": 1, "y": 1, "width": 5, "height": 5, "rectanglelabels": ["Car"] })),
        entry("b", "box", "rectanglelabels", json!({ "x": 50, "y": 50, "width": 5, "height": 5, "rectanglelabels": ["Tree"] })),
    ]);
    assert!(report.is_ok_strict(), "{report}");
    assert_eq!(ann.relations().len(), 1);

    let out = ann.serialize().unwrap();
    let relation = out.iter().find(|e| e["type"] == "relation").unwrap();
    assert_eq!(relation["from_id"], "a");
    assert_eq!(relation["to_id"], "b");
    assert_eq!(relation["direction"], "bi");
    assert_eq!(relation["labels"], json!(["next-to"]));
}

#[test]
fn dangling_relation_and_unknown_label_are_skipped() {
    let mut ann = common::annotation(common::SHAPES_CONFIG, json!({ "image": "photo.jpg" }));
    let report = ann.deserialize(&[
        entry("a", "box", "rectanglelabels", json!({ "x": 1, "y": 1, "width": 5, "height": 5, "rectanglelabels": ["Car"] })),
        entry("b", "box", "rectanglelabels", json!({ "x": 9, "y": 9, "width": 5, "height": 5, "rectanglelabels": ["Bus"] })),
        json!({ "type": "relation", "from_id": "a", "to_id": "zzz" }),
        entry("c", "nope", "rectanglelabels", json!({ "x": 1, "y": 1, "width": 5, "height": 5 })),
    ]);
    assert_eq!(report.loaded, 1);
    assert_eq!(report.error_count(), 3);
    assert_eq!(ann.errors().len(), 3);
    assert!(ann.relations().is_empty());

    assert!(report.issues.iter().all(|i| i.kind == ErrorKind::Reference));
}

#[test]
fn measured_rectangle_keeps_rotation_and_origin() {
    let mut ann = common::image_annotation(common::SHAPES_CONFIG, 640.0, 480.0);
    let mut input = entry(
        "r1",
        "box",
        "rectanglelabels",
        json!({ "x": 25.0, "y": 25.0, "width": 50.0, "height": 50.0, "rotation": 370.0, "rectanglelabels": ["Car"] }),
    );
    input["origin"] = json!("prediction");
    input["score"] = json!(0.5);
    ann.deserialize(&[input]);

    let region = ann.regions().next().unwrap();
    let Shape::Rect(rect) = &region.shape else {
        panic!("expected rect");
    };
    assert!(common::approx(rect.x, 160.0, 1e-9));
    assert!(common::approx(rect.height, 240.0, 1e-9));

    let out = ann.serialize().unwrap();
    assert!(common::approx(num(&out[0]["value"]["rotation"]), 10.0, 1e-9));
    assert_eq!(out[0]["origin"], "prediction");
    assert_eq!(out[0]["score"], 0.5);
    assert_eq!(out[0]["original_height"], 480);
}

#[test]
fn task_files_store_results_back() {
    let text = json!([{
        "id": 1,
        "config": common::IMAGE_CONFIG,
        "data": { "image": "a.jpg" },
        "predictions": [{
            "model_version": "v1",
            "result": [entry("r1", "tag", "rectanglelabels", json!({ "x": 1, "y": 2, "width": 3, "height": 4, "rectanglelabels": ["World"] }))]
        }]
    }])
    .to_string();
    let mut tasks = from_tasks_str(&text).unwrap();
    let (ann, report) = tasks[0].load(None).unwrap();
    assert!(report.is_ok_strict(), "{report}");
    assert_eq!(ann.regions().count(), 1);

    tasks[0].store(&ann).unwrap();
    let written: Value = serde_json::from_str(&to_tasks_string(&tasks).unwrap()).unwrap();
    assert_eq!(written[0]["annotations"][0]["result"][0]["id"], "r1");
    assert_eq!(written[0]["predictions"][0]["model_version"], "v1");
}
