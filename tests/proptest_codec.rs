use proptest::prelude::*;
use regionkit::geom::{to_percent, to_pixels};
use regionkit::region::rle;
use serde_json::{json, Value};

mod common;
mod proptest_helpers;

fn rect_entry(x: f64, y: f64, w: f64, h: f64, rotation: f64) -> Value {
    json!({
        "id": "r", "from_name": "box", "to_name": "img", "type": "rectanglelabels",
        "value": { "x": x, "y": y, "width": w, "height": h, "rotation": rotation, "rectanglelabels": ["Car"] }
    })
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= proptest_helpers::EPS_PERCENT
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn rle_decode_inverts_encode(values in proptest_helpers::arb_runs(20)) {
        let pairs = rle::encode(&values);
        prop_assert_eq!(pairs.len() % 2, 0);
        prop_assert!(pairs.chunks(2).all(|pair| pair[0] > 0));
        prop_assert_eq!(rle::decode(&pairs).expect("decode"), values);
    }

    #[test]
    fn percent_and_pixels_are_inverse(value in 0.0f64..10_000.0, axis in 1.0f64..8192.0) {
        let percent = to_percent(value, axis);
        prop_assert!((to_pixels(percent, axis) - value).abs() <= 1e-9 * value.max(1.0));
        let back = to_percent(to_pixels(percent, axis), axis);
        prop_assert!((back - percent).abs() <= 1e-9 * percent.max(1.0));
    }

    #[test]
    fn measured_rectangle_survives_reserialization(
        (w, h) in proptest_helpers::arb_media_size(),
        (x, y, rw, rh, rotation) in proptest_helpers::arb_rect_percent(),
    ) {
        let mut ann = common::image_annotation(common::SHAPES_CONFIG, w, h);
        let report = ann.deserialize(&[rect_entry(x, y, rw, rh, rotation)]);
        prop_assert!(report.is_ok_strict(), "{}", report);

        let out = ann.serialize().expect("serialize");
        prop_assert_eq!(out.len(), 1);
        let value = &out[0]["value"];
        for (key, expected) in [("x", x), ("y", y), ("width", rw), ("height", rh), ("rotation", rotation)] {
            let actual = value[key].as_f64().expect("number");
            prop_assert!(close(actual, expected), "{}: {} vs {}", key, actual, expected);
        }

        // a second load of the output is stable
        let mut again = common::image_annotation(common::SHAPES_CONFIG, w, h);
        again.deserialize(&out);
        let second = again.serialize().expect("serialize");
        for key in ["x", "y", "width", "height"] {
            let first = value[key].as_f64().expect("number");
            let next = second[0]["value"][key].as_f64().expect("number");
            prop_assert!(close(first, next), "{}: {} vs {}", key, first, next);
        }
    }

    #[test]
    fn polygon_points_survive_reserialization(
        (w, h) in proptest_helpers::arb_media_size(),
        points in proptest_helpers::arb_polygon_percent(12),
    ) {
        let mut ann = common::image_annotation(common::SHAPES_CONFIG, w, h);
        let entry = json!({
            "id": "p", "from_name": "outline", "to_name": "img", "type": "polygonlabels",
            "value": { "points": points.iter().map(|(x, y)| json!([x, y])).collect::<Vec<_>>(), "polygonlabels": ["Road"] }
        });
        let report = ann.deserialize(&[entry]);
        prop_assert!(report.is_ok_strict(), "{}", report);

        let out = ann.serialize().expect("serialize");
        let written = out[0]["value"]["points"].as_array().expect("points");
        prop_assert_eq!(written.len(), points.len());
        for (pair, (x, y)) in written.iter().zip(&points) {
            prop_assert!(close(pair[0].as_f64().expect("x"), *x));
            prop_assert!(close(pair[1].as_f64().expect("y"), *y));
        }
    }
}
