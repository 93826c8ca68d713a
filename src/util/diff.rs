//! Signed size changes per section and subsection between two maps.
use indexmap::IndexMap;

use crate::util::{
    classify::{analyse_modules, ModuleTable},
    map::{SectionTable, FILL_SUBSECTION},
};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SectionDiff {
    /// Section → subsection → signed byte delta, in first-seen order.
    deltas: IndexMap<String, IndexMap<Option<String>, i64>>,
}

impl SectionDiff {
    /// Sizes of `new` minus sizes of `old`.
    pub fn between(old: &SectionTable, new: &SectionTable) -> Self {
        let mut diff = Self::default();
        diff.accumulate(&analyse_modules(new), 1);
        diff.accumulate(&analyse_modules(old), -1);
        diff
    }

    fn add(&mut self, section: &str, subsection: Option<&str>, delta: i64) {
        *self
            .deltas
            .entry(section.to_string())
            .or_default()
            .entry(subsection.map(str::to_string))
            .or_default() += delta;
    }

    fn accumulate(&mut self, table: &ModuleTable, sign: i64) {
        for (_, _, entry) in table.entries() {
            self.add(&entry.section, entry.subsection.as_deref(), sign * entry.size as i64);
        }
        for (section, fill) in &table.fills {
            self.add(section, Some(FILL_SUBSECTION), sign * *fill as i64);
        }
    }

    pub fn get(&self, section: &str, subsection: Option<&str>) -> i64 {
        self.deltas
            .get(section)
            .and_then(|subsections| subsections.get(&subsection.map(str::to_string)))
            .copied()
            .unwrap_or(0)
    }

    /// Non-zero deltas per (section, subsection).
    pub fn subsection_deltas(&self) -> impl Iterator<Item = (&str, Option<&str>, i64)> {
        self.deltas.iter().flat_map(|(section, subsections)| {
            subsections
                .iter()
                .filter(|(_, &delta)| delta != 0)
                .map(move |(subsection, &delta)| (section.as_str(), subsection.as_deref(), delta))
        })
    }

    /// Non-zero deltas per section.
    pub fn section_deltas(&self) -> impl Iterator<Item = (&str, i64)> {
        self.deltas
            .iter()
            .map(|(section, subsections)| (section.as_str(), subsections.values().sum::<i64>()))
            .filter(|(_, delta)| *delta != 0)
    }
}
