//! The wire result codec.
//!
//! Annotations are exchanged with the annotation store as flat lists of
//! result entries. Each entry names the control that produced it
//! (`from_name`), the object it annotates (`to_name`), a `type` tag and a
//! `value` object holding the geometry (percentages of the media) plus the
//! selected labels. [`Annotation::serialize`] writes such a list and
//! [`Annotation::deserialize`] restores one, reporting skipped entries in a
//! [`LoadReport`].
//!
//! [`Annotation::serialize`]: crate::store::Annotation::serialize
//! [`Annotation::deserialize`]: crate::store::Annotation::deserialize

mod decode;
mod encode;
pub mod io_task;
pub mod registry;
mod report;
pub mod wire;

pub use decode::Applied;
pub use io_task::{from_tasks_slice, from_tasks_str, read_tasks, to_tasks_string, write_tasks, TaskSummary};
pub use report::{IssueContext, LoadIssue, LoadReport, Severity};
pub use wire::{RelationEntry, ResultEntry, ResultSet, Task};
