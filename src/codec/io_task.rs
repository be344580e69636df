//! Reading and writing task files.
//!
//! A task file holds either a single task object or a list of tasks, as
//! exported by the annotation store:
//!
//! ```json
//! [{ "id": 1, "data": { "image": "a.jpg" }, "annotations": [{ "result": [...] }] }]
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::report::LoadReport;
use super::wire::{ResultSet, Task};
use crate::config::LabelConfig;
use crate::error::RegionError;
use crate::store::Annotation;

#[derive(Deserialize)]
#[serde(untagged)]
enum TaskFile {
    Many(Vec<Task>),
    One(Box<Task>),
}

impl From<TaskFile> for Vec<Task> {
    fn from(file: TaskFile) -> Self {
        match file {
            TaskFile::Many(tasks) => tasks,
            TaskFile::One(task) => vec![*task],
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Read tasks from a JSON file holding one task or a list of tasks.
pub fn read_tasks(path: &Path) -> Result<Vec<Task>, RegionError> {
    let file = File::open(path).map_err(RegionError::Io)?;
    let reader = BufReader::new(file);

    let tasks: TaskFile = serde_json::from_reader(reader).map_err(|source| RegionError::TaskJsonParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(tasks.into())
}

/// Write tasks as a pretty-printed JSON list.
pub fn write_tasks(path: &Path, tasks: &[Task]) -> Result<(), RegionError> {
    let file = File::create(path).map_err(RegionError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, tasks).map_err(|source| RegionError::TaskJsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse tasks from a string.
pub fn from_tasks_str(json: &str) -> Result<Vec<Task>, RegionError> {
    let path = Path::new("<string>");
    let tasks: TaskFile = serde_json::from_str(json).map_err(|source| RegionError::TaskJsonParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(tasks.into())
}

/// Parse tasks from bytes.
pub fn from_tasks_slice(bytes: &[u8]) -> Result<Vec<Task>, RegionError> {
    let path = Path::new("<bytes>");
    let tasks: TaskFile = serde_json::from_slice(bytes).map_err(|source| RegionError::TaskJsonParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(tasks.into())
}

/// Serialize tasks to a pretty-printed JSON string.
pub fn to_tasks_string(tasks: &[Task]) -> Result<String, RegionError> {
    serde_json::to_string_pretty(tasks).map_err(|source| RegionError::TaskJsonWrite {
        path: Path::new("<string>").to_path_buf(),
        source,
    })
}

// ============================================================================
// Task <-> annotation
// ============================================================================

impl Task {
    /// The labeling configuration: `config` when given, else the one the
    /// task carries.
    pub fn label_config(&self, config: Option<&LabelConfig>) -> Result<LabelConfig, RegionError> {
        match (config, self.config.as_deref()) {
            (Some(config), _) => Ok(config.clone()),
            (None, Some(xml)) => LabelConfig::parse(xml),
            (None, None) => Err(RegionError::ConfigParse {
                message: "task carries no labeling config and none was given".to_string(),
            }),
        }
    }

    /// An empty annotation over the task's data.
    pub fn annotation(&self, config: Option<&LabelConfig>) -> Result<Annotation, RegionError> {
        Ok(Annotation::new(self.label_config(config)?, &self.data))
    }

    /// The result list to load: the first annotation's, falling back to the
    /// first prediction's.
    pub fn result(&self) -> &[Value] {
        match (self.annotations.first(), self.predictions.first()) {
            (Some(set), _) | (None, Some(set)) => set.result.as_slice(),
            (None, None) => &[],
        }
    }

    /// Builds an annotation and loads [`result`](Self::result) into it.
    pub fn load(&self, config: Option<&LabelConfig>) -> Result<(Annotation, LoadReport), RegionError> {
        let mut annotation = self.annotation(config)?;
        let report = annotation.deserialize(self.result());
        Ok((annotation, report))
    }

    /// Replaces the first result set's result list with `annotation`'s,
    /// keeping the set's store metadata.
    pub fn store(&mut self, annotation: &Annotation) -> Result<(), RegionError> {
        let result = annotation.serialize()?;
        match self.annotations.first_mut() {
            Some(set) => set.result = result,
            None => self.annotations.push(ResultSet {
                result,
                ..ResultSet::default()
            }),
        }
        Ok(())
    }
}

/// Task-level summary used by the CLI's JSON output.
#[derive(Clone, Debug, Serialize)]
pub struct TaskSummary {
    pub source: String,
    pub regions: usize,
    pub report: LoadReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"<View><Image name="img" value="$image"/>
        <RectangleLabels name="tag" toName="img"><Label value="Car"/></RectangleLabels></View>"#;

    fn task_json() -> String {
        serde_json::json!({
            "id": 3,
            "config": CONFIG,
            "data": { "image": "a.jpg" },
            "annotations": [{
                "id": 9,
                "result": [{
                    "id": "r1", "from_name": "tag", "to_name": "img", "type": "rectanglelabels",
                    "value": { "x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0, "rectanglelabels": ["Car"] }
                }]
            }]
        })
        .to_string()
    }

    #[test]
    fn single_task_and_list_both_parse() {
        let one = from_tasks_str(&task_json()).unwrap();
        let many = from_tasks_str(&format!("[{}]", task_json())).unwrap();
        assert_eq!(one, many);
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn parse_errors_name_the_source() {
        let err = from_tasks_slice(b"{not json").unwrap_err();
        assert!(err.to_string().contains("<bytes>"));
    }

    #[test]
    fn load_and_store_keep_metadata() {
        let mut task = from_tasks_str(&task_json()).unwrap().remove(0);
        let (annotation, report) = task.load(None).unwrap();
        assert!(report.is_ok_strict());
        assert_eq!(annotation.regions().count(), 1);

        task.store(&annotation).unwrap();
        assert_eq!(task.annotations[0].extra["id"], 9);
        assert_eq!(task.annotations[0].result[0]["id"], "r1");
    }

    #[test]
    fn missing_config_is_an_error() {
        let mut task = from_tasks_str(&task_json()).unwrap().remove(0);
        task.config = None;
        assert!(matches!(task.load(None), Err(RegionError::ConfigParse { .. })));
    }

    #[test]
    fn write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let tasks = from_tasks_str(&task_json()).unwrap();
        write_tasks(&path, &tasks).unwrap();
        assert_eq!(read_tasks(&path).unwrap(), tasks);
    }
}
