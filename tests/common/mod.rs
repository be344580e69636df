#![allow(dead_code)]

use std::fs;
use std::path::Path;

use regionkit::{Annotation, LabelConfig};
use serde_json::{json, Value};

pub const IMAGE_CONFIG: &str = r#"<View>
  <Image name="img" value="$image"/>
  <RectangleLabels name="tag" toName="img">
    <Label value="Hello"/>
    <Label value="World"/>
  </RectangleLabels>
</View>"#;

pub const SHAPES_CONFIG: &str = r#"<View>
  <Image name="img" value="$image"/>
  <RectangleLabels name="box" toName="img"><Label value="Car"/><Label value="Tree"/></RectangleLabels>
  <PolygonLabels name="outline" toName="img" threshold="10"><Label value="Road"/><Label value="Lake"/></PolygonLabels>
  <KeyPointLabels name="point" toName="img" strokeWidth="2"><Label value="Eye"/></KeyPointLabels>
  <BrushLabels name="paint" toName="img" strokeWidth="4"><Label value="Sky"/></BrushLabels>
  <Choices name="quality" toName="img" perRegion="true" choice="multiple">
    <Choice value="sharp"/><Choice value="blurry"/>
  </Choices>
  <Relations><Relation value="next-to"/></Relations>
</View>"#;

pub const TEXT_CONFIG: &str = r#"<View>
  <Text name="text" value="$text"/>
  <Labels name="ner" toName="text"><Label value="PER"/><Label value="LOC"/></Labels>
  <Audio name="audio" value="$audio"/>
  <Labels name="speaker" toName="audio"><Label value="A"/></Labels>
</View>"#;

pub fn annotation(config: &str, data: Value) -> Annotation {
    let config = LabelConfig::parse(config).expect("parse config");
    let data = data.as_object().cloned().unwrap_or_default();
    Annotation::new(config, &data)
}

/// An image annotation measured at `width` x `height`, displayed at natural size.
pub fn image_annotation(config: &str, width: f64, height: f64) -> Annotation {
    let mut ann = annotation(config, json!({ "image": "photo.jpg" }));
    ann.set_natural_size("img", width, height).expect("set size");
    ann
}

pub fn write_task(path: &Path, task: &Value) {
    fs::write(path, serde_json::to_vec_pretty(task).expect("encode task")).expect("write task");
}

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn approx(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}
