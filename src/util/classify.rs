//! Assigns every object file found in a map to a software module.
use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::util::map::{Contribution, Section, SectionTable, FILL_SUBSECTION};

/// Path fragment identifying objects shipped with the cross toolchain.
pub const TOOLCHAIN_MARKER: &str = "arm-none-eabi";
/// Module holding memory reserved directly by the linker script.
pub const LINKER_SCRIPT_MODULE: &str = "linker_script";
/// Object key for sections declared without contents.
pub const DECLARATIONS_OBJECT: &str = "declarations";
/// Object key for fill bytes in declared sections.
pub const FILLS_OBJECT: &str = "fills";
/// Subsection recorded for declared sections.
pub const DECLARATION_SUBSECTION: &str = "N/A";

/// Library module names longer than this are cut down to their last path component.
const MAX_MODULE_NAME: usize = 31;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Module {
    Startup,
    /// Toolchain objects that are not C runtime startup code.
    Other,
    /// A directory directly under `./sdk/`.
    Component(String),
    /// A static library from the SDK tree.
    Library(String),
    Application,
    LinkerStubs,
    Unknown,
    LinkerScript,
}

impl Module {
    pub fn name(&self) -> &str {
        match self {
            Module::Startup => "startup",
            Module::Other => "other",
            Module::Component(name) | Module::Library(name) => name,
            Module::Application => "application",
            Module::LinkerStubs => "linker_stubs",
            Module::Unknown => "unknown",
            Module::LinkerScript => LINKER_SCRIPT_MODULE,
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Module(Module),
    /// Linker padding, which belongs to no module.
    Fill,
}

/// One step of the classification chain. A rule either claims the object
/// reference or passes it on; each rule may assume the earlier ones passed.
struct Rule {
    name: &'static str,
    apply: fn(&str) -> Option<Classification>,
}

static CRT_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[/\\]crt.+\.o").unwrap());
static STARTUP_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\./startup/\w+\.o").unwrap());
static SDK_COMPONENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\./sdk/(\w+)/[/\w]*\w+\.o").unwrap());
static SDK_LIBRARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(lib\w+[\.\-/\w]+)\.a").unwrap());
static SDK_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[/\\]sdk[/\\]").unwrap());
static LOCAL_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\.*/|[A-Za-z]:\\)[\w/\\\.]+").unwrap());
static LTO_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"ltrans\.o$").unwrap());
static LINKER_STUBS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^linker\s+stubs").unwrap());

fn module(module: Module) -> Classification { Classification::Module(module) }

static RULES: &[Rule] = &[
    Rule {
        name: "startup",
        apply: |object| {
            let crt = object.contains(TOOLCHAIN_MARKER) && CRT_OBJECT.is_match(object);
            (crt || STARTUP_OBJECT.is_match(object)).then(|| module(Module::Startup))
        },
    },
    Rule {
        name: "toolchain",
        apply: |object| object.contains(TOOLCHAIN_MARKER).then(|| module(Module::Other)),
    },
    Rule {
        name: "sdk component",
        apply: |object| {
            let captures = SDK_COMPONENT.captures(object)?;
            Some(module(Module::Component(captures[1].to_string())))
        },
    },
    Rule {
        name: "sdk library",
        apply: |object| {
            if !SDK_SEGMENT.is_match(object) {
                return None;
            }
            let captures = SDK_LIBRARY.captures(object)?;
            Some(module(Module::Library(library_module_name(&captures[1]))))
        },
    },
    Rule {
        name: "fill",
        apply: |object| (object == FILLS_OBJECT).then_some(Classification::Fill),
    },
    Rule {
        name: "application",
        apply: |object| {
            (LOCAL_PATH.is_match(object) && !LTO_OBJECT.is_match(object))
                .then(|| module(Module::Application))
        },
    },
    Rule {
        name: "linker stubs",
        apply: |object| LINKER_STUBS.is_match(object).then(|| module(Module::LinkerStubs)),
    },
];

fn library_module_name(library: &str) -> String {
    if library.len() > MAX_MODULE_NAME && library.contains(['/', '\\']) {
        library.rsplit(['/', '\\']).next().unwrap_or(library).to_string()
    } else {
        library.to_string()
    }
}

/// Classifies an object reference from a map file. The first matching rule wins;
/// anything no rule claims (including link-time optimization temporaries) is `unknown`.
pub fn classify_object(object: &str) -> Classification {
    for rule in RULES {
        if let Some(classification) = (rule.apply)(object) {
            tracing::trace!("{object}: {} rule", rule.name);
            return classification;
        }
    }
    Classification::Module(Module::Unknown)
}

/// One contribution of an object file, as recorded under its module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectEntry {
    pub section: String,
    pub size: u64,
    pub subsection: Option<String>,
    pub address: u64,
}

impl ObjectEntry {
    fn new(section: &str, contribution: &Contribution) -> Self {
        Self {
            section: section.to_string(),
            size: contribution.size,
            subsection: contribution.subsection.clone(),
            address: contribution.address,
        }
    }
}

/// Object file → entries, in first-seen order.
pub type ObjectEntries = IndexMap<String, Vec<ObjectEntry>>;

/// Per-subsection byte totals of a section, in first-seen order.
pub type SubsectionTotals = IndexMap<Option<String>, u64>;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ModuleTable {
    /// Module name → object file → entries.
    pub modules: IndexMap<String, ObjectEntries>,
    /// Section → subsection totals, for every section of the map.
    pub subsections: IndexMap<String, SubsectionTotals>,
    /// Fill bytes inside populated sections, which are not attributed to any object.
    pub fills: IndexMap<String, u64>,
}

impl ModuleTable {
    fn push(&mut self, module: &str, object: &str, entry: ObjectEntry) {
        self.modules
            .entry(module.to_string())
            .or_default()
            .entry(object.to_string())
            .or_default()
            .push(entry);
    }

    /// Iterates every recorded entry as (module, object, entry).
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &ObjectEntry)> {
        self.modules.iter().flat_map(|(module, objects)| {
            objects.iter().flat_map(move |(object, entries)| {
                entries.iter().map(move |entry| (module.as_str(), object.as_str(), entry))
            })
        })
    }

    /// Total bytes per module, in module order.
    pub fn module_totals(&self) -> impl Iterator<Item = (&str, u64)> {
        self.modules.iter().map(|(module, objects)| {
            (module.as_str(), objects.values().flatten().map(|e| e.size).sum::<u64>())
        })
    }

    fn add_populated(&mut self, section: &Section) {
        let subsections = self.subsections.entry(section.name.clone()).or_default();
        let mut fill = 0;
        let mut rows = Vec::with_capacity(section.contents.len());
        for contribution in &section.contents {
            match classify_object(contribution.object.as_str()) {
                Classification::Fill => fill += contribution.size,
                Classification::Module(module) => {
                    *subsections.entry(contribution.subsection.clone()).or_default() +=
                        contribution.size;
                    rows.push((module, contribution));
                }
            }
        }
        for (module, contribution) in rows {
            self.push(
                module.name(),
                contribution.object.as_str(),
                ObjectEntry::new(&section.name, contribution),
            );
        }
        if fill > 0 {
            *self.fills.entry(section.name.clone()).or_default() += fill;
        }
    }

    fn add_declared(&mut self, section: &Section) {
        let fill = section.fill_size();
        let declared = section.size.saturating_sub(fill);
        self.push(Module::LinkerScript.name(), DECLARATIONS_OBJECT, ObjectEntry {
            section: section.name.clone(),
            size: declared,
            subsection: Some(DECLARATION_SUBSECTION.to_string()),
            address: section.address,
        });
        let subsections = self.subsections.entry(section.name.clone()).or_default();
        *subsections.entry(Some(DECLARATION_SUBSECTION.to_string())).or_default() += declared;
        if fill > 0 {
            *subsections.entry(Some(FILL_SUBSECTION.to_string())).or_default() += fill;
            for contribution in &section.contents {
                self.push(
                    Module::LinkerScript.name(),
                    FILLS_OBJECT,
                    ObjectEntry::new(&section.name, contribution),
                );
            }
        }
    }
}

/// Classifies every object file of every section into its module.
///
/// Sections without object contributions are attributed to the `linker_script`
/// module, as they can only be declared by the linker script.
pub fn analyse_modules(sections: &SectionTable) -> ModuleTable {
    let mut table = ModuleTable::default();
    for section in sections.values() {
        if section.is_populated() {
            table.add_populated(section);
        } else {
            table.add_declared(section);
        }
    }
    table
}
