use std::io::Write;

use anyhow::Result;
use unicode_width::UnicodeWidthStr;

const SEPARATOR: &str = " | ";

/// How a column's cells are padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

pub fn column_widths(rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths = Vec::<usize>::new();
    for row in rows {
        if widths.len() < row.len() {
            widths.resize(row.len(), 0);
        }
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.width_cjk());
        }
    }
    widths
}

/// Writes a grid with the header on top. The first column is left-aligned,
/// the rest use `align`.
pub fn write_table<W>(w: &mut W, header: Vec<String>, rows: Vec<Vec<String>>, align: Align) -> Result<()>
where W: Write + ?Sized {
    let mut all = Vec::with_capacity(rows.len() + 1);
    all.push(header);
    all.extend(rows);
    let widths = column_widths(&all);
    for row in &all {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                line.push_str(SEPARATOR);
            }
            let remain = widths[i].saturating_sub(cell.width_cjk());
            if i > 0 && align == Align::Right {
                line.extend(std::iter::repeat(' ').take(remain));
                line.push_str(cell);
            } else {
                line.push_str(cell);
                line.extend(std::iter::repeat(' ').take(remain));
            }
        }
        writeln!(w, "{}", line.trim_end())?;
    }
    Ok(())
}
