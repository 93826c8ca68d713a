use std::{
    fs::DirBuilder,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, ensure, Context, Result};
use argp::FromArgs;
use itertools::Itertools;

use crate::util::{
    file::{bin_file_size, buf_writer},
    layout::Layouts,
    map::MapFile,
    summary::{summary_sizes, ProjectSummary, SIZE_HEADERS},
    table::{write_table, Align},
};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Summarizes the memory usage of every map file in a directory tree.
#[argp(subcommand, name = "summary")]
pub struct Args {
    #[argp(positional)]
    /// Directory to search for map files.
    search_dir: PathBuf,
    #[argp(positional)]
    /// Output report. (JSON when ending in .json, text otherwise)
    report: PathBuf,
    #[argp(option)]
    /// Device memory layouts. (YAML)
    layout: Option<PathBuf>,
}

/// Summaries of the map files that were read, and the map files that failed.
#[derive(Debug, Default)]
struct Collected {
    summaries: Vec<ProjectSummary>,
    failed: Vec<PathBuf>,
}

fn summarize_map(path: &Path, layouts: &Layouts, folder: &Path) -> Result<ProjectSummary> {
    let map = MapFile::from_path(path)?;
    let summary = ProjectSummary::new(path, summary_sizes(&map, layouts, bin_file_size(path)));
    let out = folder.join(format!("{}.json", summary.file_stem()));
    let mut w = buf_writer(&out)?;
    serde_json::to_writer_pretty(&mut w, &summary.sizes)?;
    w.flush()?;
    Ok(summary)
}

/// Summarizes every map file under `search_dir`, writing each project's sizes
/// into `folder` as soon as its map is read. A failing map does not stop the others.
fn collect_summaries(search_dir: &Path, layouts: &Layouts, folder: &Path) -> Result<Collected> {
    let search_dir = search_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve '{}'", search_dir.display()))?;
    let pattern =
        format!("{}/**/*.map", glob::Pattern::escape(&search_dir.to_string_lossy()));
    let mut collected = Collected::default();
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        tracing::debug!("Reading {}", path.display());
        match summarize_map(&path, layouts, folder) {
            Ok(summary) => collected.summaries.push(summary),
            Err(e) => {
                tracing::error!("Skipping {}: {e:?}", path.display());
                collected.failed.push(path);
            }
        }
    }
    Ok(collected)
}

fn write_summary_table<W>(w: &mut W, summaries: &[ProjectSummary]) -> Result<()>
where W: Write + ?Sized {
    let header = ["Project", "Configuration"]
        .into_iter()
        .chain(SIZE_HEADERS)
        .map(str::to_string)
        .collect();
    let rows = summaries
        .iter()
        .map(|s| {
            [s.project.clone(), s.configuration.clone()]
                .into_iter()
                .chain(s.sizes.values().map(|v| v.to_string()))
                .collect()
        })
        .collect();
    write_table(w, header, rows, Align::Right)
}

pub fn run(args: Args) -> Result<()> {
    let layouts = Layouts::load(args.layout.as_deref())?;
    let folder = args
        .report
        .file_stem()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("Report '{}' has no name", args.report.display()))?;
    DirBuilder::new()
        .recursive(true)
        .create(&folder)
        .with_context(|| format!("Failed to create directory '{}'", folder.display()))?;

    let Collected { summaries, failed } = collect_summaries(&args.search_dir, &layouts, &folder)?;
    if summaries.is_empty() && failed.is_empty() {
        tracing::warn!("No map files found in {}", args.search_dir.display());
    }

    let mut w = buf_writer(&args.report)?;
    if args.report.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        serde_json::to_writer_pretty(&mut w, &summaries)?;
    } else {
        write_summary_table(&mut w, &summaries)?;
    }
    w.flush()?;
    tracing::info!("Summarized {} map files into {}", summaries.len(), args.report.display());
    ensure!(
        failed.is_empty(),
        "Failed to summarize {} map files: {}",
        failed.len(),
        failed.iter().map(|p| p.display()).join(", ")
    );
    Ok(())
}
