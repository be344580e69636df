//! Writing an annotation as a wire result list.

use log::{debug, warn};
use serde_json::{json, Map, Value};

use super::wire::{RelationEntry, ResultEntry, RELATION_TYPE};
use crate::config::ObjectKind;
use crate::error::RegionError;
use crate::region::{Classifiable, LabelState, Region};
use crate::store::{Annotation, LabeledObject};

impl Annotation {
    /// Serializes every complete region, then relations, then the entries
    /// kept verbatim from the last load.
    ///
    /// A region carrying several classification states yields one entry per
    /// state, all sharing the region's pairing id. Regions still being drawn
    /// are left out, as are regions whose geometry cannot be written; the
    /// latter are logged.
    pub fn serialize(&self) -> Result<Vec<Value>, RegionError> {
        let mut out = Vec::new();
        for object in self.objects.values() {
            out.extend(self.object_state_json(object)?);
        }

        for relation in self.relations.iter() {
            let (Some(from), Some(to)) = (self.regions.get(&relation.from), self.regions.get(&relation.to)) else {
                continue;
            };
            let entry = RelationEntry {
                result_type: RELATION_TYPE.to_string(),
                from_id: from.pid.clone(),
                to_id: to.pid.clone(),
                direction: relation.direction,
                labels: relation.labels.clone(),
            };
            out.push(to_value(&entry)?);
        }

        out.extend(self.passthrough.iter().cloned());
        debug!("serialized {} entr(ies)", out.len());
        Ok(out)
    }

    /// Wire entries of one object's regions.
    pub fn to_state_json(&self, object: &str) -> Result<Vec<Value>, RegionError> {
        self.object_state_json(self.object(object)?)
    }

    fn object_state_json(&self, object: &LabeledObject) -> Result<Vec<Value>, RegionError> {
        let mut out = Vec::new();
        for id in &object.regions {
            let Some(region) = self.regions.get(id) else {
                continue;
            };
            if !region.is_complete() {
                continue;
            }
            let geometry = match region.shape.serialize(region.coordstype, &object.media) {
                Ok(geometry) => geometry,
                Err(err) => {
                    warn!("{}: not writing region {}: {err}", object.name, region.pid);
                    continue;
                }
            };
            for state in self.states_to_write(region) {
                let entry = result_entry(region, object, &state, geometry.clone());
                out.push(to_value(&entry)?);
            }
        }
        Ok(out)
    }

    /// The states a region is written with. A region without any state is
    /// written once under the control it was drawn with.
    fn states_to_write(&self, region: &Region) -> Vec<LabelState> {
        if !region.states().is_empty() {
            return region.states().to_vec();
        }
        let result_type = self
            .config
            .control(&region.control)
            .map(|c| c.result_type())
            .unwrap_or_else(|| region.kind().base_type());
        vec![LabelState::new(&region.control, result_type, Vec::new())]
    }
}

fn result_entry(region: &Region, object: &LabeledObject, state: &LabelState, geometry: Map<String, Value>) -> ResultEntry {
    let mut value = geometry;
    let key = state.value_key().to_string();
    let values = match state.result_type.as_str() {
        // a bare shape control carries no value list
        "rectangle" | "polygon" | "keypoint" | "brush" => None,
        _ => Some(json!(state.values)),
    };
    if let Some(values) = values {
        value.insert(key, values);
    }

    let (original_width, original_height) = match object.kind {
        ObjectKind::Image if object.media.is_measured() => (
            Some(object.media.natural_width.round() as u32),
            Some(object.media.natural_height.round() as u32),
        ),
        _ => (None, None),
    };

    ResultEntry {
        id: Some(region.pid.clone()),
        from_name: state.control.clone(),
        to_name: object.name.clone(),
        result_type: state.result_type.clone(),
        origin: region.origin,
        source: Some(object.value.clone()).filter(|v| !v.is_empty()),
        value,
        original_width,
        original_height,
        score: region.score,
        readonly: region.readonly,
    }
}

fn to_value<T: serde::Serialize>(entry: &T) -> Result<Value, RegionError> {
    serde_json::to_value(entry).map_err(|source| RegionError::value(source.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabelConfig;
    use crate::geom::CoordsType;
    use crate::region::{Brush, Rect, Shape, StrokeKind};

    fn annotation() -> Annotation {
        let config = LabelConfig::parse(
            r#"<View><Image name="img" value="$image"/>
               <RectangleLabels name="tag" toName="img"><Label value="A"/></RectangleLabels>
               <Choices name="quality" toName="img" perRegion="true"><Choice value="good"/></Choices></View>"#,
        )
        .unwrap();
        let data = json!({ "image": "a.jpg" });
        Annotation::new(config, data.as_object().unwrap())
    }

    fn add_rect(ann: &mut Annotation, states: Vec<LabelState>) -> crate::geom::RegionId {
        let id = ann.ids.next_region_id();
        let mut region = Region::new(
            id,
            "pid1",
            "img",
            "tag",
            CoordsType::Perc,
            Shape::Rect(Rect::from_percent(10.0, 20.0, 30.0, 40.0, 0.0)),
        );
        for state in states {
            region.attach_state(state);
        }
        ann.insert_region(region).unwrap()
    }

    #[test]
    fn one_entry_per_state() {
        let mut ann = annotation();
        add_rect(
            &mut ann,
            vec![
                LabelState::new("tag", "rectanglelabels", vec!["A".into()]),
                LabelState::new("quality", "choices", vec!["good".into()]),
            ],
        );
        let out = ann.serialize().unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["id"], out[1]["id"]);
        assert_eq!(out[0]["type"], "rectanglelabels");
        assert_eq!(out[0]["value"]["rectanglelabels"], json!(["A"]));
        assert_eq!(out[1]["from_name"], "quality");
        assert_eq!(out[1]["value"]["choices"], json!(["good"]));
        assert_eq!(out[1]["value"]["x"], 10.0);
    }

    #[test]
    fn drawing_regions_are_skipped() {
        let mut ann = annotation();
        let id = add_rect(&mut ann, Vec::new());
        ann.regions.get_mut(&id).unwrap().set_drawing(true);
        assert!(ann.serialize().unwrap().is_empty());
    }

    #[test]
    fn unwritable_region_does_not_block_the_rest() {
        let mut ann = annotation();
        add_rect(&mut ann, Vec::new());
        let id = ann.ids.next_region_id();
        let mut brush = Brush::new();
        brush.begin_stroke(StrokeKind::Add, 3.0);
        brush.add_point(1.0, 1.0).unwrap();
        let region = Region::new(id, "pid2", "img", "tag", CoordsType::Px, Shape::Brush(brush));
        ann.insert_region(region).unwrap();

        // strokes cannot be rasterised before the image is measured
        let out = ann.serialize().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["id"], "pid1");
    }

    #[test]
    fn stateless_region_uses_its_control() {
        let mut ann = annotation();
        add_rect(&mut ann, Vec::new());
        let out = ann.serialize().unwrap();
        assert_eq!(out[0]["type"], "rectanglelabels");
        assert_eq!(out[0]["value"]["rectanglelabels"], json!([]));
        assert_eq!(out[0]["source"], "$image");
    }
}
