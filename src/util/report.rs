//! Report grid built from a classified map: the column layout, one sheet of
//! object rows per module, and the module roll-up shown on the summary sheet.
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;

use crate::util::{
    classify::{analyse_modules, ModuleTable, ObjectEntries},
    layout::{is_retained, MemoryClassifier},
    map::{MapFile, SectionTable},
};

pub const TOTAL_ROW: &str = "TOTAL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnOptions {
    /// Sections with at least this many distinct subsections get one column
    /// per subsection. Zero keeps one column per section.
    pub subsection_threshold: usize,
    /// Drop columns of sections whose total size is zero.
    pub hide_empty_sections: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub section: String,
    /// `None` for a column covering the whole section.
    pub subsection: Option<String>,
    pub address: u64,
    /// Bytes attributed to the column.
    pub size: u64,
}

impl Column {
    pub fn label(&self) -> String {
        match &self.subsection {
            Some(subsection) => format!("{}({})", self.section, subsection),
            None => self.section.clone(),
        }
    }

    fn matches(&self, section: &str, subsection: Option<&str>) -> bool {
        self.section == section && self.subsection.as_deref() == subsection
    }
}

/// Decides the report columns, in section order.
pub fn select_columns(
    sections: &SectionTable,
    table: &ModuleTable,
    options: &ColumnOptions,
) -> Vec<Column> {
    let mut columns = Vec::new();
    for (name, subsections) in &table.subsections {
        if options.hide_empty_sections && subsections.values().all(|&size| size == 0) {
            tracing::debug!("Hiding empty section {name}");
            continue;
        }
        let address = sections.get(name).map_or(0, |s| s.address);
        let count = subsections.len();
        if options.subsection_threshold > 0 && count > 1 && count >= options.subsection_threshold
        {
            columns.extend(subsections.iter().map(|(subsection, &size)| Column {
                section: name.clone(),
                subsection: subsection.clone(),
                address,
                size,
            }));
        } else {
            columns.push(Column {
                section: name.clone(),
                subsection: None,
                address,
                size: subsections.values().sum(),
            });
        }
    }
    columns
}

/// Spreads the entries of each object file over the columns. An entry goes to the
/// column of its subsection, or else to the column of its whole section.
pub fn format_module_data(
    columns: &[Column],
    objects: &ObjectEntries,
) -> Result<IndexMap<String, Vec<u64>>> {
    let mut rows = IndexMap::with_capacity(objects.len());
    for (object, entries) in objects {
        let mut cells = vec![0u64; columns.len()];
        for entry in entries {
            let subsection = entry.subsection.as_deref();
            let index = columns
                .iter()
                .position(|c| c.matches(&entry.section, subsection))
                .or_else(|| columns.iter().position(|c| c.matches(&entry.section, None)));
            match index {
                Some(index) => cells[index] += entry.size,
                None if entry.size == 0 => tracing::debug!(
                    "{object}: no column for empty {}({})",
                    entry.section,
                    subsection.unwrap_or_default()
                ),
                None => bail!(
                    "No section {} to assign the {} subsection of {object}",
                    entry.section,
                    subsection.unwrap_or("<unnamed>")
                ),
            }
        }
        rows.insert(object.clone(), cells);
    }
    Ok(rows)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total: u64,
    pub retained: u64,
    pub ram: u64,
    /// Only present when some column lies in the ROM region.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rom: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub name: String,
    pub cells: Vec<u64>,
    #[serde(flatten)]
    pub totals: Totals,
}

/// Memory category of each column.
struct ColumnClasses {
    ram: Vec<bool>,
    rom: Option<Vec<bool>>,
    retained: Vec<bool>,
}

impl ColumnClasses {
    fn new(columns: &[Column], memory: &MemoryClassifier) -> Self {
        let rom = columns.iter().map(|c| memory.is_rom(c.address)).collect_vec();
        Self {
            ram: columns.iter().map(|c| memory.is_ram(c.address)).collect(),
            rom: rom.contains(&true).then_some(rom),
            retained: columns.iter().map(|c| is_retained(&c.section)).collect(),
        }
    }

    fn row(&self, name: impl Into<String>, cells: Vec<u64>) -> Row {
        let sum = |mask: &[bool]| -> u64 {
            cells.iter().zip(mask).filter(|(_, selected)| **selected).map(|(size, _)| size).sum()
        };
        let totals = Totals {
            total: cells.iter().sum(),
            retained: sum(&self.retained),
            ram: sum(&self.ram),
            rom: self.rom.as_deref().map(sum),
        };
        Row { name: name.into(), cells, totals }
    }
}

fn column_totals<'a>(rows: impl IntoIterator<Item = &'a Row>, width: usize) -> Vec<u64> {
    let mut totals = vec![0u64; width];
    for row in rows {
        for (total, cell) in totals.iter_mut().zip(&row.cells) {
            *total += cell;
        }
    }
    totals
}

/// Object rows of one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleSheet {
    pub module: String,
    pub rows: Vec<Row>,
    pub total: Row,
    /// Columns with nothing from this module.
    pub hidden_columns: Vec<usize>,
}

/// A module's share of each memory budget, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    pub module: String,
    pub retention: f64,
    pub ram: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rom: Option<f64>,
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

impl Budget {
    fn of(row: &Row, total: &Totals) -> Self {
        Self {
            module: row.name.clone(),
            retention: percent(row.totals.retained, total.retained),
            ram: percent(row.totals.ram, total.ram),
            rom: row.totals.rom.zip(total.rom).map(|(part, whole)| percent(part, whole)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub build_type: Option<String>,
    pub memory: MemoryClassifier,
    pub columns: Vec<Column>,
    pub sheets: Vec<ModuleSheet>,
    /// One row per module, summing its sheet.
    pub summary: Vec<Row>,
    pub total: Row,
    pub budgets: Vec<Budget>,
    /// Fill bytes inside populated sections, attributed to no module.
    pub fills: IndexMap<String, u64>,
}

impl Report {
    pub fn build(map: &MapFile, memory: MemoryClassifier, options: &ColumnOptions) -> Result<Self> {
        let table = analyse_modules(&map.sections);
        for (module, size) in table.module_totals() {
            tracing::debug!("Module {module}: {size} bytes");
        }
        let columns = select_columns(&map.sections, &table, options);
        let classes = ColumnClasses::new(&columns, &memory);

        let mut sheets = Vec::with_capacity(table.modules.len());
        for (module, objects) in &table.modules {
            let data = format_module_data(&columns, objects)
                .with_context(|| format!("Failed to lay out module {module}"))?;
            let rows =
                data.into_iter().map(|(object, cells)| classes.row(object, cells)).collect_vec();
            let totals = column_totals(&rows, columns.len());
            let hidden_columns = totals.iter().positions(|&size| size == 0).collect();
            sheets.push(ModuleSheet {
                module: module.clone(),
                rows,
                total: classes.row(TOTAL_ROW, totals),
                hidden_columns,
            });
        }

        let summary = sheets
            .iter()
            .map(|sheet| classes.row(sheet.module.clone(), sheet.total.cells.clone()))
            .collect_vec();
        let total = classes.row(TOTAL_ROW, column_totals(&summary, columns.len()));
        let budgets = summary.iter().map(|row| Budget::of(row, &total.totals)).collect();
        Ok(Self {
            build_type: map.build_type.as_ref().map(ToString::to_string),
            memory,
            columns,
            sheets,
            summary,
            total,
            budgets,
            fills: table.fills,
        })
    }

    fn has_rom(&self) -> bool { self.total.totals.rom.is_some() }

    fn total_headers(&self, retention: bool) -> Vec<String> {
        let mut headers = vec!["total".to_string()];
        if retention {
            headers.push("Retention total".to_string());
        }
        headers.push("RAM total".to_string());
        if self.has_rom() {
            headers.push("ROM total".to_string());
        }
        headers
    }

    fn total_cells(totals: &Totals, retention: bool) -> Vec<String> {
        let mut cells = vec![totals.total.to_string()];
        if retention {
            cells.push(totals.retained.to_string());
        }
        cells.push(totals.ram.to_string());
        cells.extend(totals.rom.map(|rom| rom.to_string()));
        cells
    }

    /// Header and rows of the summary sheet: one row per module plus the total row.
    pub fn summary_grid(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let header = std::iter::once("module".to_string())
            .chain(self.columns.iter().map(|c| format!("{} @ {:#x}", c.label(), c.address)))
            .chain(self.total_headers(true))
            .collect_vec();
        let rows = self
            .summary
            .iter()
            .chain(std::iter::once(&self.total))
            .map(|row| {
                std::iter::once(row.name.clone())
                    .chain(row.cells.iter().map(u64::to_string))
                    .chain(Self::total_cells(&row.totals, true))
                    .collect_vec()
            })
            .collect();
        (header, rows)
    }

    /// Header and rows of a module sheet, without its hidden columns.
    pub fn sheet_grid(&self, sheet: &ModuleSheet) -> (Vec<String>, Vec<Vec<String>>) {
        let visible = |i: &usize| !sheet.hidden_columns.contains(i);
        let header = std::iter::once("filename".to_string())
            .chain((0..self.columns.len()).filter(visible).map(|i| self.columns[i].label()))
            .chain(self.total_headers(false))
            .collect_vec();
        let rows = sheet
            .rows
            .iter()
            .chain(std::iter::once(&sheet.total))
            .map(|row| {
                std::iter::once(row.name.clone())
                    .chain((0..row.cells.len()).filter(visible).map(|i| row.cells[i].to_string()))
                    .chain(Self::total_cells(&row.totals, false))
                    .collect_vec()
            })
            .collect();
        (header, rows)
    }

    pub fn budget_grid(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let mut header = vec!["module".to_string(), "Retention %".to_string(), "RAM %".to_string()];
        if self.has_rom() {
            header.push("ROM %".to_string());
        }
        let rows = self
            .budgets
            .iter()
            .map(|budget| {
                let mut row = vec![
                    budget.module.clone(),
                    format!("{:.1}", budget.retention),
                    format!("{:.1}", budget.ram),
                ];
                row.extend(budget.rom.map(|rom| format!("{rom:.1}")));
                row
            })
            .collect();
        (header, rows)
    }
}
