//! `run` command: load inputs, execute the pipeline, and publish outputs.
//!
//! Nothing is written until the pipeline has finished. Outputs are then
//! staged next to their destinations and renamed into place together, so a
//! failed run leaves no partial files behind.

use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use itertools::Itertools;
use log::{info, warn};

use crate::{
    cli::RunArgs,
    config::PipelineConfig,
    dataset::Dataset,
    io_utils,
    lookup::DirectoryReferences,
    pipeline::Pipeline,
    table,
};

pub fn execute(args: &RunArgs) -> Result<()> {
    let started = Instant::now();
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let config = PipelineConfig::load(&args.config)
        .with_context(|| format!("Loading pipeline config {:?}", args.config))?;
    let pipeline = Pipeline::new(config)?;

    if !args.input.is_file() {
        return Err(anyhow!("Input file {:?} not found", args.input));
    }
    ensure_distinct_paths(args)?;
    let input_delimiter = io_utils::resolve_delimiter(&args.input, args.delimiter);
    info!(
        "Enriching '{}' (delimiter '{}')",
        args.input.display(),
        io_utils::printable_delimiter(input_delimiter)
    );
    let input = Dataset::load(&args.input, input_delimiter, encoding)
        .with_context(|| format!("Loading input {:?}", args.input))?;
    info!(
        "Loaded {} row(s) and {} column(s)",
        input.len(),
        input.headers().len()
    );

    let reference_root = args
        .references
        .clone()
        .unwrap_or_else(|| parent_dir(&args.config));
    let references = DirectoryReferences::new(reference_root, args.delimiter, encoding);
    let today = args.as_of.unwrap_or_else(|| Local::now().date_naive());

    let output = pipeline.run(&input, &references, today)?;

    let mut staged = StagedOutputs::default();
    let delimiter_for = |path: &Path| io_utils::resolve_delimiter(path, args.delimiter);
    staged.stage(&output.dataset, &args.output, delimiter_for(&args.output))?;
    if let Some(path) = &args.unmatched {
        if output.unmatched.is_empty() {
            info!("No unmatched rows found; {path:?} not written");
        } else {
            staged.stage(&output.unmatched, path, delimiter_for(path))?;
        }
    }
    if let Some(path) = &args.summary {
        staged.stage(&output.summary, path, delimiter_for(path))?;
    }
    let written = staged.commit()?;
    for path in &written {
        info!("Wrote {path:?}");
    }

    let skipped = output
        .lookups
        .summaries
        .iter()
        .filter(|s| s.is_skipped())
        .map(|s| format!("'{}' ({})", s.target_column, s.reference))
        .join(", ");
    if !skipped.is_empty() {
        warn!("Skipped lookup(s): {skipped}");
    }
    info!(
        "Lookups: {} matched, {} unmatched; rows dropped: {}",
        output.lookups.total_matched(),
        output.lookups.total_unmatched(),
        output.report.projection.rows_dropped
    );
    if args.show_summary {
        table::print_dataset(&output.summary, usize::MAX);
    }
    info!("Execution time: {}", format_duration(started.elapsed()));
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Fails when two outputs, or an output and the input, resolve to one file.
fn ensure_distinct_paths(args: &RunArgs) -> Result<()> {
    let mut claimed = vec![(comparable_path(&args.input), "--input", &args.input)];
    let outputs = [
        ("--output", Some(&args.output)),
        ("--unmatched", args.unmatched.as_ref()),
        ("--summary", args.summary.as_ref()),
    ];
    for (flag, path) in outputs {
        let Some(path) = path else {
            continue;
        };
        let key = comparable_path(path);
        if let Some((_, other_flag, other)) = claimed.iter().find(|(seen, _, _)| *seen == key) {
            return Err(anyhow!(
                "{flag} {path:?} refers to the same file as {other_flag} {other:?}"
            ));
        }
        claimed.push((key, flag, path));
    }
    Ok(())
}

/// Absolute form of `path` for comparison. The file itself may not exist yet,
/// so only its directory is canonicalized in that case.
fn comparable_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let parent = parent_dir(path);
    let parent = parent.canonicalize().unwrap_or(parent);
    match path.file_name() {
        Some(name) => parent.join(name),
        None => parent,
    }
}

/// Output files written beside their destinations and renamed on commit.
/// Dropping without committing removes whatever was staged.
#[derive(Debug, Default)]
struct StagedOutputs {
    pending: Vec<(PathBuf, PathBuf)>,
}

/// A destination replaced during commit, with the file it displaced.
#[derive(Debug)]
struct Published {
    destination: PathBuf,
    previous: Option<PathBuf>,
}

impl Published {
    fn roll_back(&self) {
        let _ = fs::remove_file(&self.destination);
        if let Some(previous) = &self.previous {
            let _ = fs::rename(previous, &self.destination);
        }
        warn!("Rolled back {:?}", self.destination);
    }

    fn discard_previous(&self) {
        if let Some(previous) = &self.previous {
            let _ = fs::remove_file(previous);
        }
    }
}

impl StagedOutputs {
    fn stage(&mut self, dataset: &Dataset, destination: &Path, delimiter: u8) -> Result<()> {
        let staging = sibling_path(destination, ".partial");
        self.pending.push((staging.clone(), destination.to_path_buf()));
        dataset
            .save(&staging, delimiter)
            .with_context(|| format!("Staging output for {destination:?}"))
    }

    /// Moves every staged file into place. When any move fails, destinations
    /// already published are restored to what they held before.
    fn commit(mut self) -> Result<Vec<PathBuf>> {
        let pending = std::mem::take(&mut self.pending);
        let mut published: Vec<Published> = Vec::with_capacity(pending.len());
        for (index, (staging, destination)) in pending.iter().enumerate() {
            match publish(staging, destination) {
                Ok(entry) => published.push(entry),
                Err(err) => {
                    self.pending = pending[index..].to_vec();
                    for entry in published.iter().rev() {
                        entry.roll_back();
                    }
                    return Err(err);
                }
            }
        }
        for entry in &published {
            entry.discard_previous();
        }
        Ok(published.into_iter().map(|entry| entry.destination).collect())
    }
}

fn publish(staging: &Path, destination: &Path) -> Result<Published> {
    let previous = if destination.exists() {
        let previous = sibling_path(destination, ".previous");
        fs::rename(destination, &previous)
            .with_context(|| format!("Setting aside existing {destination:?}"))?;
        Some(previous)
    } else {
        None
    };
    if let Err(err) = fs::rename(staging, destination) {
        if let Some(previous) = &previous {
            let _ = fs::rename(previous, destination);
        }
        return Err(err)
            .with_context(|| format!("Moving {staging:?} into place at {destination:?}"));
    }
    Ok(Published {
        destination: destination.to_path_buf(),
        previous,
    })
}

impl Drop for StagedOutputs {
    fn drop(&mut self) {
        for (staging, _) in &self.pending {
            let _ = fs::remove_file(staging);
        }
    }
}

fn sibling_path(destination: &Path, suffix: &str) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    destination.with_file_name(name)
}

pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();
    if seconds < 60.0 {
        format!("{seconds:.2} seconds")
    } else if seconds < 3600.0 {
        let whole = duration.as_secs();
        format!("{} minutes {} seconds", whole / 60, whole % 60)
    } else {
        let whole = duration.as_secs();
        format!("{}h {}m {}s", whole / 3600, (whole % 3600) / 60, whole % 60)
    }
}
