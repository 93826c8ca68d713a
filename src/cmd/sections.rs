use std::{
    io::{stdout, Write},
    path::PathBuf,
};

use anyhow::Result;
use argp::FromArgs;

use crate::util::{
    classify::analyse_modules,
    file::ensure_map_file,
    map::MapFile,
    report::{select_columns, ColumnOptions},
    table::{write_table, Align},
};

#[derive(FromArgs, PartialEq, Eq, Debug)]
/// Lists the sections of a map file that occupy memory.
#[argp(subcommand, name = "sections")]
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
}

/// Writes every section that occupies memory, then the report columns when
/// `options` differ from the defaults.
fn write_sections<W>(w: &mut W, map: &MapFile, options: &ColumnOptions) -> Result<()>
where W: Write + ?Sized {
    for section in map.non_zero_sections() {
        writeln!(
            w,
            "{} at {:#010x} with size {} ({:#x})",
            section.name, section.address, section.size, section.size
        )?;
    }

    if *options != ColumnOptions::default() {
        let table = analyse_modules(&map.sections);
        let columns = select_columns(&map.sections, &table, options);
        let rows = columns
            .iter()
            .map(|c| vec![c.label(), format!("{:#010x}", c.address), c.size.to_string()])
            .collect();
        writeln!(w)?;
        let header = vec!["column".to_string(), "address".to_string(), "size".to_string()];
        write_table(w, header, rows, Align::Right)?;
    }
    Ok(())
}

pub fn run(args: Args) -> Result<()> {
    ensure_map_file(&args.map_file)?;
    let map = MapFile::from_path(&args.map_file)?;
    let options = ColumnOptions {
        subsection_threshold: args.sub_nb,
        hide_empty_sections: args.hide_empty_sections,
    };
    write_sections(&mut stdout().lock(), &map, &options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::map::tests::PXP_REPORTER;

    fn sections_text(options: &ColumnOptions) -> String {
        let map = MapFile::parse(PXP_REPORTER).unwrap();
        let mut out = Vec::new();
        write_sections(&mut out, &map, options).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_write_sections() {
        assert_eq!(
            sections_text(&ColumnOptions::default()),
            ".text at 0x00000000 with size 416 (0x1a0)\n\
             .data at 0x20000000 with size 48 (0x30)\n\
             .retention_mem_zi at 0x20000030 with size 256 (0x100)\n\
             .stack_section at 0x20000130 with size 1024 (0x400)\n\
             .heap at 0x20000530 with size 528 (0x210)\n"
        );
    }

    #[test]
    fn test_write_columns() {
        let text =
            sections_text(&ColumnOptions { subsection_threshold: 0, hide_empty_sections: true });
        let (sections, columns) = text.split_once("\n\n").unwrap();
        assert_eq!(sections.lines().count(), 5);
        assert!(columns.starts_with("column"));
        assert!(columns.lines().skip(1).any(|line| line.starts_with(".text ")));
        assert!(!columns.contains(".zero_init"));
    }
}
