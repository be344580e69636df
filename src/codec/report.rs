//! Load report types.
//!
//! Loading a result list never stops at the first bad entry. Every skipped
//! entry and every suspicious-but-accepted entry is recorded here so callers
//! can show, print or serialize the outcome.

use std::fmt;

use serde::Serialize;

use crate::error::{ErrorKind, RegionError};

/// The outcome of restoring a result list.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LoadReport {
    /// Number of wire entries applied (regions created, states merged,
    /// relations linked or entries kept verbatim).
    pub loaded: usize,

    /// Problems found while loading.
    pub issues: Vec<LoadIssue>,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: LoadIssue) {
        self.issues.push(issue);
    }

    /// Records a skipped entry.
    pub fn skip(&mut self, context: IssueContext, err: &RegionError) {
        self.add(LoadIssue::error(err.kind(), err.to_string(), context));
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Returns true if no entry was skipped.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    /// Returns true if there were no issues at all.
    pub fn is_ok_strict(&self) -> bool {
        self.issues.is_empty()
    }

    /// Appends another report, e.g. when checking several tasks.
    pub fn merge(&mut self, other: LoadReport) {
        self.loaded += other.loaded;
        self.issues.extend(other.issues);
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return writeln!(f, "Load passed: {} entr(ies), no issues found", self.loaded);
        }

        writeln!(
            f,
            "Loaded {} entr(ies) with {} error(s) and {} warning(s):",
            self.loaded,
            self.error_count(),
            self.warning_count()
        )?;
        writeln!(f)?;

        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }

        Ok(())
    }
}

/// A single load issue.
#[derive(Clone, Debug, Serialize)]
pub struct LoadIssue {
    pub severity: Severity,
    pub kind: ErrorKind,
    pub message: String,
    pub context: IssueContext,
}

impl LoadIssue {
    pub fn new(severity: Severity, kind: ErrorKind, message: impl Into<String>, context: IssueContext) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            context,
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Error, kind, message, context)
    }

    pub fn warning(kind: ErrorKind, message: impl Into<String>, context: IssueContext) -> Self {
        Self::new(Severity::Warning, kind, message, context)
    }
}

impl fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(
            f,
            "[{}] {:?} in {}: {}",
            severity, self.kind, self.context, self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// The entry was applied but something about it looks off.
    Warning,
    /// The entry was skipped.
    Error,
}

/// Where an issue occurred.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum IssueContext {
    /// The task as a whole.
    Task { path: String },
    /// One wire entry, by position and pairing id.
    Entry { index: usize, id: Option<String> },
}

impl IssueContext {
    pub fn entry(index: usize, id: Option<&str>) -> Self {
        IssueContext::Entry {
            index,
            id: id.map(ToOwned::to_owned),
        }
    }
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueContext::Task { path } => write!(f, "task {}", path),
            IssueContext::Entry { index, id: Some(id) } => write!(f, "entry {} ({})", index, id),
            IssueContext::Entry { index, id: None } => write!(f, "entry {}", index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_lists_issues() {
        let mut report = LoadReport::new();
        report.loaded = 2;
        report.skip(
            IssueContext::entry(1, Some("abc")),
            &RegionError::UnknownControl { name: "gone".into() },
        );
        report.add(LoadIssue::warning(
            ErrorKind::Range,
            "text snapshot differs",
            IssueContext::entry(0, None),
        ));

        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 1);
        let text = report.to_string();
        assert!(text.contains("1 error(s) and 1 warning(s)"));
        assert!(text.contains("[ERROR] Reference in entry 1 (abc): Unknown control 'gone'"));
    }

    #[test]
    fn clean_report_passes() {
        let report = LoadReport::new();
        assert!(report.is_ok_strict());
        assert!(report.to_string().contains("no issues"));
    }
}
