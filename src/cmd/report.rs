use std::{
    io::{stdout, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use argp::FromArgs;

use crate::util::{
    file::{buf_writer, ensure_map_file},
    layout::{Layouts, MemoryClassifier},
    map::MapFile,
    report::{ColumnOptions, Report},
    table::{write_table, Align},
};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Reports memory usage per software module of a map file.
#[argp(subcommand, name = "report")]
pub struct Args {
    #[argp(positional)]
    /// Input map file.
    map_file: PathBuf,
    #[argp(option, default = "0")]
    /// Give sections with at least this many subsections one column per subsection.
    sub_nb: usize,
    #[argp(switch)]
    /// Leave out sections whose total size is zero.
    hide_empty_sections: bool,
    #[argp(option, short = 'o')]
    /// Output file. (Default: <directory>_<map name>.json)
    out: Option<PathBuf>,
    #[argp(option)]
    /// Device memory layouts. (YAML)
    layout: Option<PathBuf>,
    #[argp(switch)]
    /// Also print the sheet of every module.
    sheets: bool,
}

/// Reports are named after the map file and the directory holding it.
fn report_path(map_file: &Path) -> Result<PathBuf> {
    let path = map_file
        .canonicalize()
        .with_context(|| format!("Failed to resolve '{}'", map_file.display()))?;
    let stem = path
        .file_stem()
        .ok_or_else(|| anyhow!("Map file '{}' has no name", path.display()))?
        .to_string_lossy();
    let directory =
        path.parent().and_then(Path::file_name).map(|s| s.to_string_lossy()).unwrap_or_default();
    Ok(PathBuf::from(format!("{directory}_{stem}.json")))
}

pub fn run(args: Args) -> Result<()> {
    ensure_map_file(&args.map_file)?;
    let map = MapFile::from_path(&args.map_file)?;
    let layouts = Layouts::load(args.layout.as_deref())?;
    let memory = MemoryClassifier::detect(&map, &layouts);
    let options = ColumnOptions {
        subsection_threshold: args.sub_nb,
        hide_empty_sections: args.hide_empty_sections,
    };
    let report = Report::build(&map, memory, &options)
        .with_context(|| format!("Failed to build report for '{}'", args.map_file.display()))?;

    let out = match args.out {
        Some(out) => out,
        None => report_path(&args.map_file)?,
    };
    let mut w = buf_writer(&out)?;
    serde_json::to_writer_pretty(&mut w, &report)?;
    w.flush()?;
    tracing::info!("Wrote {}", out.display());

    let mut stdout = stdout().lock();
    let (header, rows) = report.summary_grid();
    write_table(&mut stdout, header, rows, Align::Right)?;
    writeln!(stdout)?;
    let (header, rows) = report.budget_grid();
    write_table(&mut stdout, header, rows, Align::Right)?;
    if args.sheets {
        for sheet in &report.sheets {
            writeln!(stdout, "\n[{}]", sheet.module)?;
            let (header, rows) = report.sheet_grid(sheet);
            write_table(&mut stdout, header, rows, Align::Right)?;
        }
    }
    Ok(())
}
