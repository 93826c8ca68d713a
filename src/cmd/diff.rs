use std::{
    io::{stdout, Write},
    path::PathBuf,
};

use anyhow::Result;
use argp::FromArgs;
use owo_colors::{OwoColorize, Stream};

use crate::util::{diff::SectionDiff, file::ensure_map_file, map::MapFile};

const ROW_WIDTH: usize = 24;

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Compares section sizes of two map files.
#[argp(subcommand, name = "diff")]
pub struct Args {
    #[argp(positional)]
    /// Old map file.
    map_file_a: PathBuf,
    #[argp(positional)]
    /// New map file.
    map_file_b: PathBuf,
    #[argp(switch, short = 'v')]
    /// Show the difference of every subsection.
    verbose: bool,
}

fn cell(text: &str) -> String { format!("{:<width$.width$}", text, width = ROW_WIDTH) }

fn delta(value: i64) -> String {
    let text = cell(&format!("{value:+}"));
    if value > 0 {
        text.if_supports_color(Stream::Stdout, |t| t.green()).to_string()
    } else {
        text.if_supports_color(Stream::Stdout, |t| t.red()).to_string()
    }
}

/// Writes the non-zero deltas, per subsection when `verbose`.
fn write_diff<W>(w: &mut W, diff: &SectionDiff, verbose: bool) -> Result<()>
where W: Write + ?Sized {
    if verbose {
        writeln!(w, "{} {} {}", cell("SECTION"), cell("SUBSECTION"), cell("DIFF"))?;
        for (section, subsection, value) in diff.subsection_deltas() {
            writeln!(w, "{} {} {}", cell(section), cell(subsection.unwrap_or("-")), delta(value))?;
        }
    } else {
        writeln!(w, "{} {}", cell("SECTION"), cell("DIFF"))?;
        for (section, value) in diff.section_deltas() {
            writeln!(w, "{} {}", cell(section), delta(value))?;
        }
    }
    Ok(())
}

pub fn run(args: Args) -> Result<()> {
    ensure_map_file(&args.map_file_a)?;
    ensure_map_file(&args.map_file_b)?;
    let a = MapFile::from_path(&args.map_file_a)?;
    let b = MapFile::from_path(&args.map_file_b)?;
    let diff = SectionDiff::between(&a.sections, &b.sections);
    write_diff(&mut stdout().lock(), &diff, args.verbose)
}
