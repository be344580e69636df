use std::path::PathBuf;
use thiserror::Error;

use crate::codec::LoadReport;

/// The main error type for regionkit operations.
#[derive(Debug, Error)]
pub enum RegionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse task JSON from {path}: {source}")]
    TaskJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write task JSON to {path}: {source}")]
    TaskJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read media size from {path}: {source}")]
    MediaSizeRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Invalid labeling config: {message}")]
    ConfigParse { message: String },

    #[error("Unknown control '{name}'")]
    UnknownControl { name: String },

    #[error("Unknown object '{name}'")]
    UnknownObject { name: String },

    #[error("Control '{control}' has no option '{label}'")]
    UnknownLabel { control: String, label: String },

    #[error("Unknown region '{id}'")]
    UnknownRegion { id: String },

    #[error("Unsupported result type '{result_type}'")]
    UnsupportedResultType { result_type: String },

    #[error("Invalid geometry: {message}")]
    InvalidGeometry { message: String },

    #[error("Invalid result value: {message}")]
    InvalidValue { message: String },

    #[error("Control '{control}' does not allow unlabeled regions")]
    EmptyLabels { control: String },

    #[error("Annotation is read-only")]
    ReadOnly,

    #[error("Region {id} is read-only")]
    RegionReadOnly { id: String },

    #[error("Media size of '{object}' is not known yet")]
    MediaNotMeasured { object: String },

    #[error("Load failed with {error_count} error(s) and {warning_count} warning(s)")]
    LoadFailed {
        error_count: usize,
        warning_count: usize,
        report: LoadReport,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// The coarse category of a [`RegionError`].
///
/// `Reference`, `Range` and `State` are the kinds surfaced to users while
/// loading or editing; `Io` covers everything that touches the outside world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ErrorKind {
    /// The entry names a control, object, label or region that does not exist.
    Reference,
    /// Geometric or numeric bounds are invalid.
    Range,
    /// The mutation is not allowed in the current state.
    State,
    /// File system, JSON or config syntax failures.
    Io,
}

impl RegionError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegionError::UnknownControl { .. }
            | RegionError::UnknownObject { .. }
            | RegionError::UnknownLabel { .. }
            | RegionError::UnknownRegion { .. }
            | RegionError::UnsupportedResultType { .. } => ErrorKind::Reference,
            RegionError::InvalidGeometry { .. }
            | RegionError::InvalidValue { .. }
            | RegionError::EmptyLabels { .. } => ErrorKind::Range,
            RegionError::ReadOnly
            | RegionError::RegionReadOnly { .. }
            | RegionError::MediaNotMeasured { .. } => ErrorKind::State,
            RegionError::Io(_)
            | RegionError::TaskJsonParse { .. }
            | RegionError::TaskJsonWrite { .. }
            | RegionError::MediaSizeRead { .. }
            | RegionError::ConfigParse { .. }
            | RegionError::LoadFailed { .. }
            | RegionError::InvalidArgument(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn geometry(message: impl Into<String>) -> Self {
        RegionError::InvalidGeometry {
            message: message.into(),
        }
    }

    pub(crate) fn value(message: impl Into<String>) -> Self {
        RegionError::InvalidValue {
            message: message.into(),
        }
    }
}
