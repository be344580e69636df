//! Wire types of the external result format.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::region::Origin;
use crate::store::Direction;

/// Wire `type` of relation entries.
pub const RELATION_TYPE: &str = "relation";

/// One region result entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    /// Pairing id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub from_name: String,
    pub to_name: String,
    #[serde(rename = "type")]
    pub result_type: String,
    #[serde(default)]
    pub origin: Origin,
    /// The object's data reference, e.g. `$image`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub value: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub readonly: bool,
}

/// One relation entry, linking two regions by pairing id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelationEntry {
    #[serde(rename = "type")]
    pub result_type: String,
    pub from_id: String,
    pub to_id: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// A task as exchanged with the annotation store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Labeling configuration XML, when the store ships it with the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub annotations: Vec<ResultSet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predictions: Vec<ResultSet>,
}

/// One annotation or prediction: a result list plus store metadata kept
/// as-is.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default)]
    pub result: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Reads a list of strings stored under `key`.
pub(crate) fn string_list(value: &Map<String, Value>, key: &str) -> Option<Result<Vec<String>, String>> {
    let raw = value.get(key)?;
    let Some(items) = raw.as_array() else {
        return Some(Err(format!("'{key}' must be a list of strings")));
    };
    Some(
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(ToOwned::to_owned)
                    .ok_or_else(|| format!("'{key}' must be a list of strings"))
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_defaults_are_filled() {
        let entry: ResultEntry = serde_json::from_value(serde_json::json!({
            "from_name": "tag",
            "to_name": "img",
            "type": "rectanglelabels",
            "value": { "x": 1.0 }
        }))
        .unwrap();
        assert_eq!(entry.origin, Origin::Manual);
        assert!(entry.id.is_none());
        assert!(!entry.readonly);

        let out = serde_json::to_value(&entry).unwrap();
        assert!(out.get("readonly").is_none());
        assert_eq!(out["origin"], "manual");
    }

    #[test]
    fn result_set_keeps_store_metadata() {
        let set: ResultSet = serde_json::from_value(serde_json::json!({
            "id": 7,
            "completed_by": 3,
            "result": []
        }))
        .unwrap();
        assert_eq!(set.extra["completed_by"], 3);
        let out = serde_json::to_value(&set).unwrap();
        assert_eq!(out["id"], 7);
    }

    #[test]
    fn string_list_rejects_non_strings() {
        let value = serde_json::json!({ "labels": ["a", 1] });
        let map = value.as_object().unwrap();
        assert!(string_list(map, "labels").unwrap().is_err());
        assert!(string_list(map, "missing").is_none());
    }
}
