//! Regionkit: the region and tool engine behind an annotation editor.
//!
//! Regionkit keeps the regions a user draws over images, text, audio and
//! time series, drives the interactive drawing tools that create them, and
//! converts them to and from the flat result format of the annotation
//! store. Geometry is kept in display pixels while editing and persisted as
//! percentages of the natural media size.
//!
//! # Modules
//!
//! - [`config`]: Labeling configuration (object and control tags)
//! - [`geom`]: Coordinate spaces, media sizes, ids and flood fill
//! - [`region`]: The region model and its concrete shapes
//! - [`store`]: The annotation store: objects, regions, relations, selection
//! - [`tools`]: Interactive drawing tools and event dispatch
//! - [`codec`]: The wire result codec and task file I/O
//! - [`error`]: Error types for regionkit operations

pub mod codec;
pub mod config;
pub mod error;
pub mod geom;
pub mod region;
pub mod store;
pub mod tools;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info, warn};
use walkdir::WalkDir;

pub use codec::{LoadReport, Task};
pub use config::LabelConfig;
pub use error::{ErrorKind, RegionError};
pub use geom::{CoordsType, MediaSize, RegionId};
pub use region::{Region, Shape, ShapeKind};
pub use store::Annotation;
pub use tools::{ToolEvent, ToolKind, ToolOutcome};

/// The regionkit CLI application.
#[derive(Parser)]
#[command(name = "regionkit")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Load task files and report entries that would be skipped.
    Check(CheckArgs),
    /// Rewrite task results through the codec.
    Normalize(NormalizeArgs),
}

/// Options shared by every subcommand that loads tasks.
#[derive(clap::Args)]
struct LoadArgs {
    /// Labeling config XML, used instead of the config stored in tasks.
    #[arg(long, env = "REGIONKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Natural size of every image object, as WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_size)]
    size: Option<(u32, u32)>,
}

/// Arguments for the check subcommand.
#[derive(clap::Args)]
struct CheckArgs {
    /// Task file, or a directory searched for *.json task files.
    input: PathBuf,

    #[command(flatten)]
    load: LoadArgs,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    output: ReportFormat,
}

/// Arguments for the normalize subcommand.
#[derive(clap::Args)]
struct NormalizeArgs {
    /// Task file to read.
    input: PathBuf,

    /// Where to write the normalized tasks.
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    load: LoadArgs,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// Run the regionkit CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), RegionError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Check(args)) => run_check(args),
        Some(Commands::Normalize(args)) => run_normalize(args),
        None => {
            println!("regionkit {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Region and tool engine for annotation results.");
            println!();
            println!("Run 'regionkit --help' for usage information.");
            Ok(())
        }
    }
}

/// Execute the check subcommand.
fn run_check(args: CheckArgs) -> Result<(), RegionError> {
    let config = read_config(&args.load)?;
    let files = task_files(&args.input)?;

    let mut summaries = Vec::new();
    let mut total = LoadReport::new();
    for file in &files {
        let tasks = codec::read_tasks(file)?;
        for (index, task) in tasks.iter().enumerate() {
            let (annotation, report) = load_task(task, file, config.as_ref(), args.load.size)?;
            total.merge(report.clone());
            summaries.push(codec::TaskSummary {
                source: format!("{}#{}", file.display(), index),
                regions: annotation.regions().count(),
                report,
            });
        }
    }

    match args.output {
        ReportFormat::Json => {
            let json = serde_json::to_string_pretty(&summaries).map_err(|source| RegionError::TaskJsonWrite {
                path: PathBuf::from("<stdout>"),
                source,
            })?;
            println!("{json}");
        }
        ReportFormat::Text => {
            for summary in &summaries {
                println!("{} ({} region(s))", summary.source, summary.regions);
                print!("{}", summary.report);
            }
        }
    }

    let has_errors = total.error_count() > 0;
    let has_warnings = total.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(RegionError::LoadFailed {
            error_count: total.error_count(),
            warning_count: total.warning_count(),
            report: total,
        })
    } else {
        Ok(())
    }
}

/// Execute the normalize subcommand.
fn run_normalize(args: NormalizeArgs) -> Result<(), RegionError> {
    let config = read_config(&args.load)?;
    let mut tasks = codec::read_tasks(&args.input)?;

    let mut skipped = 0;
    for task in &mut tasks {
        let (annotation, report) = load_task(task, &args.input, config.as_ref(), args.load.size)?;
        for issue in &report.issues {
            warn!("{issue}");
        }
        skipped += report.error_count();
        task.store(&annotation)?;
    }

    codec::write_tasks(&args.output, &tasks)?;
    println!(
        "Normalized {} task(s) to {} ({} entr(ies) dropped)",
        tasks.len(),
        args.output.display(),
        skipped
    );
    Ok(())
}

fn read_config(args: &LoadArgs) -> Result<Option<LabelConfig>, RegionError> {
    args.config.as_deref().map(LabelConfig::read).transpose()
}

/// Task files under `input`, sorted by path.
fn task_files(input: &Path) -> Result<Vec<PathBuf>, RegionError> {
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(input).follow_links(true) {
        let entry = entry.map_err(|err| RegionError::Io(err.into()))?;
        let path = entry.path();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if entry.file_type().is_file() && is_json {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    debug!("found {} task file(s) under {}", files.len(), input.display());
    Ok(files)
}

/// Builds the annotation for one task, measuring image objects before the
/// results are restored.
fn load_task(
    task: &Task,
    file: &Path,
    config: Option<&LabelConfig>,
    size: Option<(u32, u32)>,
) -> Result<(Annotation, LoadReport), RegionError> {
    let mut annotation = task.annotation(config)?;
    let images: Vec<(String, Option<String>)> = annotation
        .objects()
        .filter(|o| o.kind.is_visual())
        .map(|o| (o.name.clone(), o.source.clone()))
        .collect();

    for (name, source) in images {
        let measured = match size {
            Some(size) => Some(size),
            None => source.as_deref().and_then(|s| local_media_size(file, s)),
        };
        if let Some((width, height)) = measured {
            annotation.set_natural_size(&name, width as f64, height as f64)?;
        }
    }

    let report = annotation.deserialize(task.result());
    info!("{}: {} region(s)", file.display(), annotation.regions().count());
    Ok((annotation, report))
}

/// Natural size of a media file referenced by a task, resolved relative to
/// the task file. Remote references are left to the host.
fn local_media_size(task_file: &Path, source: &str) -> Option<(u32, u32)> {
    if source.contains("://") {
        return None;
    }
    let path = task_file.parent().unwrap_or(Path::new(".")).join(source);
    if !path.is_file() {
        return None;
    }
    match read_image_dimensions(&path) {
        Ok(size) => Some(size),
        Err(err) => {
            warn!("{err}");
            None
        }
    }
}

fn read_image_dimensions(path: &Path) -> Result<(u32, u32), RegionError> {
    let size = imagesize::size(path).map_err(|source| RegionError::MediaSizeRead {
        path: path.to_path_buf(),
        source,
    })?;
    let width = u32::try_from(size.width)
        .map_err(|_| RegionError::InvalidArgument(format!("image width {} does not fit in u32", size.width)))?;
    let height = u32::try_from(size.height)
        .map_err(|_| RegionError::InvalidArgument(format!("image height {} does not fit in u32", size.height)))?;
    Ok((width, height))
}

fn parse_size(raw: &str) -> Result<(u32, u32), String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{raw}'"))?;
    let width: u32 = w.trim().parse().map_err(|_| format!("invalid width '{w}'"))?;
    let height: u32 = h.trim().parse().map_err(|_| format!("invalid height '{h}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size must be positive, got '{raw}'"));
    }
    Ok((width, height))
}
