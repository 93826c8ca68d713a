//! Reader for GNU ld map files.
//!
//! Only the "Linker script and memory map" part of the file describes output
//! sections. It is scanned with two small state machines: [`SectionScanner`]
//! groups lines into output sections and stitches wrapped section headers,
//! while [`ContributionScanner`] turns the lines inside a section into
//! [`Contribution`]s, stitching wrapped input section names.
use std::{error::Error, fmt, path::Path};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::util::file::map_file;

/// Subsection name the linker prints for alignment padding.
pub const FILL_SUBSECTION: &str = "*fill*";

const MAP_START: &str = "Linker script and memory map";
const MEMORY_CONFIGURATION: &str = "Memory Configuration";
const DEFAULT_REGION: &str = "*default*";
const BUILD_MARKER: &str = "_BUILD__";

#[derive(Debug)]
pub enum MapError {
    /// A line required to delimit the memory map was not found.
    MissingMarker(&'static str),
    InvalidHeader { line: usize, text: String },
    InvalidNumber { line: usize, value: String },
    DuplicateSection(String),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::MissingMarker(marker) => {
                write!(f, "Map file is truncated or not a GNU ld map: missing '{marker}'")
            }
            MapError::InvalidHeader { line, text } => {
                write!(f, "Line {line}: unparseable section header '{text}'")
            }
            MapError::InvalidNumber { line, value } => {
                write!(f, "Line {line}: invalid hexadecimal value '{value}'")
            }
            MapError::DuplicateSection(name) => write!(
                f,
                "Duplicate section '{name}' detected. Check the map file and if it's fine, \
                 please report a bug"
            ),
        }
    }
}

impl Error for MapError {}

/// What an input section line refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectRef {
    /// Padding inserted by the linker.
    Fill,
    LinkerStubs,
    File(String),
}

impl ObjectRef {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectRef::Fill => "fills",
            ObjectRef::LinkerStubs => "linker stubs",
            ObjectRef::File(path) => path,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// One input section placed inside an output section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contribution {
    pub subsection: Option<String>,
    pub address: u64,
    pub size: u64,
    pub object: ObjectRef,
}

impl Contribution {
    #[inline]
    pub fn is_fill(&self) -> bool { self.object == ObjectRef::Fill }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: String,
    pub address: u64,
    pub size: u64,
    pub contents: Vec<Contribution>,
}

impl Section {
    /// Whether any object file contributes to this section. Sections that are not populated
    /// are declared directly by the linker script.
    pub fn is_populated(&self) -> bool { self.contents.iter().any(|c| !c.is_fill()) }

    /// Sum of all parsed contributions, fills included.
    pub fn contents_size(&self) -> u64 { self.contents.iter().map(|c| c.size).sum() }

    pub fn fill_size(&self) -> u64 {
        self.contents.iter().filter(|c| c.is_fill()).map(|c| c.size).sum()
    }

    /// Signed difference between the parsed contributions and the declared size,
    /// or `None` when they agree or the section is not populated.
    pub fn discrepancy(&self) -> Option<i64> {
        if !self.is_populated() {
            return None;
        }
        let delta = self.contents_size() as i64 - self.size as i64;
        (delta != 0).then_some(delta)
    }
}

/// Output sections in map file order.
pub type SectionTable = IndexMap<String, Section>;

/// A region from the "Memory Configuration" block, as `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryRegion {
    pub start: u64,
    pub end: u64,
}

impl MemoryRegion {
    #[inline]
    pub fn contains(&self, address: u64) -> bool { address >= self.start && address < self.end }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BuildType {
    Ram,
    Flash,
    Other(String),
}

impl BuildType {
    fn from_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case("ram") {
            BuildType::Ram
        } else if token.eq_ignore_ascii_case("flash") {
            BuildType::Flash
        } else {
            BuildType::Other(token.to_string())
        }
    }

    #[inline]
    pub fn is_ram(&self) -> bool { matches!(self, BuildType::Ram) }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildType::Ram => f.write_str("RAM"),
            BuildType::Flash => f.write_str("FLASH"),
            BuildType::Other(s) => f.write_str(s),
        }
    }
}

/// Everything the reporting tools need from one map file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapFile {
    pub sections: SectionTable,
    pub regions: IndexMap<String, MemoryRegion>,
    pub build_type: Option<BuildType>,
}

impl MapFile {
    pub fn parse(text: &str) -> Result<Self, MapError> {
        Ok(Self {
            sections: parse_sections(text)?,
            regions: find_regions(text),
            build_type: build_type(text),
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = map_file(path)?;
        Self::parse(&file.as_text())
            .with_context(|| format!("Failed to parse map file '{}'", path.display()))
    }

    /// Sections with a non-zero declared size.
    pub fn non_zero_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values().filter(|s| s.size != 0)
    }
}

fn parse_hex(value: &str, line: usize) -> Result<u64, MapError> {
    let digits =
        value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")).unwrap_or(value);
    u64::from_str_radix(digits, 16)
        .map_err(|_| MapError::InvalidNumber { line, value: value.to_string() })
}

/// Returns the lines holding section descriptions with their 1-based line numbers:
/// everything after the `LOAD` block that follows the memory map marker, up to the
/// `OUTPUT(... elf)` trailer.
fn memory_map_lines(text: &str) -> Result<Vec<(usize, &str)>, MapError> {
    static OUTPUT_LINE: Lazy<Regex> = Lazy::new(|| Regex::new("^OUTPUT.*elf").unwrap());

    #[derive(Clone, Copy)]
    enum State {
        SeekMarker,
        SkipBlank,
        SkipLoadBlock,
        Body,
    }

    let mut state = State::SeekMarker;
    let mut body = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let blank = line.trim().is_empty();
        match state {
            State::SeekMarker => {
                if line.starts_with(MAP_START) {
                    state = State::SkipBlank;
                }
                continue;
            }
            State::SkipBlank if blank => continue,
            State::SkipBlank => {
                state = State::SkipLoadBlock;
                continue;
            }
            State::SkipLoadBlock if !blank => continue,
            State::SkipLoadBlock => state = State::Body,
            State::Body => {}
        }
        if OUTPUT_LINE.is_match(line) {
            return Ok(body);
        }
        body.push((idx + 1, line));
    }
    match state {
        State::SeekMarker => Err(MapError::MissingMarker(MAP_START)),
        _ => Err(MapError::MissingMarker("OUTPUT(... elf)")),
    }
}

/// The shapes an input section line can take, in matching priority.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineShape<'a> {
    Fill { address: &'a str, size: &'a str },
    Inline { name: &'a str, address: &'a str, size: &'a str, object: &'a str },
    /// A name too long to share its line; the rest follows on a continuation line.
    Name(&'a str),
    Continuation { address: &'a str, size: &'a str, object: &'a str },
    Stubs { name: &'a str, address: &'a str, size: &'a str },
    StubsContinuation { address: &'a str, size: &'a str },
    /// Symbols, assignments, input section patterns and anything else.
    Other,
}

impl<'a> LineShape<'a> {
    fn of(line: &'a str) -> Self {
        static FILL: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^ \*fill\*\s+([0-9A-Fa-fx]+)\s+([0-9A-Fa-fx]+)\s*$").unwrap()
        });
        static INLINE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"^ ([\.\w]+)\s+([0-9A-Fa-fx]+)\s+([0-9A-Fa-fx]+)\s+([:\\\s\(\)\-\./\w!@#$%^+]+\.o(?:bj)?\)*)\s*$",
            )
            .unwrap()
        });
        static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ ([\.\w]+)\s*$").unwrap());
        static CONTINUATION: Lazy<Regex> = Lazy::new(|| {
            Regex::new(
                r"^ {16}([0-9A-Fa-fx]+)\s+([0-9A-Fa-fx]+)\s+([:\\\s\(\)\-\./\w!@#$%^+]+\.o(?:bj)?\)*)\s*$",
            )
            .unwrap()
        });
        static STUBS: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^ ([\.\w]+)\s+([0-9A-Fa-fx]+)\s+([0-9A-Fa-fx]+)\s+linker\s+stubs\s*$")
                .unwrap()
        });
        static STUBS_CONTINUATION: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^ {16}([0-9A-Fa-fx]+)\s+([0-9A-Fa-fx]+)\s+linker\s+stubs\s*$").unwrap()
        });

        let group = |c: &regex::Captures<'a>, i: usize| c.get(i).map_or("", |m| m.as_str());
        if let Some(c) = FILL.captures(line) {
            LineShape::Fill { address: group(&c, 1), size: group(&c, 2) }
        } else if let Some(c) = INLINE.captures(line) {
            LineShape::Inline {
                name: group(&c, 1),
                address: group(&c, 2),
                size: group(&c, 3),
                object: group(&c, 4),
            }
        } else if let Some(c) = NAME.captures(line) {
            LineShape::Name(group(&c, 1))
        } else if let Some(c) = CONTINUATION.captures(line) {
            LineShape::Continuation { address: group(&c, 1), size: group(&c, 2), object: group(&c, 3) }
        } else if let Some(c) = STUBS.captures(line) {
            LineShape::Stubs { name: group(&c, 1), address: group(&c, 2), size: group(&c, 3) }
        } else if let Some(c) = STUBS_CONTINUATION.captures(line) {
            LineShape::StubsContinuation { address: group(&c, 1), size: group(&c, 2) }
        } else {
            LineShape::Other
        }
    }
}

/// Collects the contributions of one output section.
#[derive(Debug, Default)]
struct ContributionScanner {
    /// Name seen on its own line, waiting for its continuation.
    pending_name: Option<String>,
    contents: Vec<Contribution>,
}

impl ContributionScanner {
    fn line(&mut self, number: usize, line: &str) -> Result<(), MapError> {
        let (subsection, address, size, object) = match LineShape::of(line) {
            LineShape::Fill { address, size } => {
                (Some(FILL_SUBSECTION.to_string()), address, size, ObjectRef::Fill)
            }
            LineShape::Inline { name, address, size, object } => {
                (Some(name.to_string()), address, size, ObjectRef::File(object.to_string()))
            }
            LineShape::Name(name) => {
                self.pending_name = Some(name.to_string());
                return Ok(());
            }
            LineShape::Continuation { address, size, object } => {
                (self.pending_name.take(), address, size, ObjectRef::File(object.to_string()))
            }
            LineShape::Stubs { name, address, size } => {
                (Some(name.to_string()), address, size, ObjectRef::LinkerStubs)
            }
            LineShape::StubsContinuation { address, size } => {
                (self.pending_name.take(), address, size, ObjectRef::LinkerStubs)
            }
            LineShape::Other => return Ok(()),
        };
        self.contents.push(Contribution {
            subsection,
            address: parse_hex(address, number)?,
            size: parse_hex(size, number)?,
            object,
        });
        Ok(())
    }
}

struct OpenSection {
    name: String,
    address: u64,
    size: u64,
    contents: ContributionScanner,
}

enum SectionState {
    AwaitingHeader,
    /// The section name was alone on its line; address and size follow.
    AwaitingHeaderContinuation { name: String },
    ReadingContents(OpenSection),
}

struct SectionScanner {
    state: SectionState,
    sections: SectionTable,
}

impl SectionScanner {
    fn new() -> Self { Self { state: SectionState::AwaitingHeader, sections: SectionTable::new() } }

    fn line(&mut self, number: usize, line: &str) -> Result<(), MapError> {
        static SECTION_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.\w").unwrap());
        static HEADER_CONTINUATION: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"^\s+(0[xX][0-9A-Fa-f]+)\s+(0[xX][0-9A-Fa-f]+)(?:\s|$)").unwrap()
        });

        if SECTION_START.is_match(line) {
            self.close()?;
            let tokens = line.split_whitespace().collect::<Vec<_>>();
            self.state = match tokens.as_slice() {
                [name] => SectionState::AwaitingHeaderContinuation { name: name.to_string() },
                [name, address, size, ..] => SectionState::ReadingContents(OpenSection {
                    name: name.to_string(),
                    address: parse_hex(address, number)?,
                    size: parse_hex(size, number)?,
                    contents: ContributionScanner::default(),
                }),
                _ => {
                    return Err(MapError::InvalidHeader { line: number, text: line.to_string() })
                }
            };
            return Ok(());
        }

        match &mut self.state {
            SectionState::AwaitingHeader => {}
            SectionState::AwaitingHeaderContinuation { name } => {
                if let Some(c) = HEADER_CONTINUATION.captures(line) {
                    let name = std::mem::take(name);
                    self.state = SectionState::ReadingContents(OpenSection {
                        name,
                        address: parse_hex(&c[1], number)?,
                        size: parse_hex(&c[2], number)?,
                        contents: ContributionScanner::default(),
                    });
                } else {
                    tracing::debug!("Line {number}: skipping section '{name}' without address");
                    self.state = SectionState::AwaitingHeader;
                }
            }
            SectionState::ReadingContents(open) => open.contents.line(number, line)?,
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), MapError> {
        let SectionState::ReadingContents(open) =
            std::mem::replace(&mut self.state, SectionState::AwaitingHeader)
        else {
            return Ok(());
        };
        if self.sections.contains_key(&open.name) {
            return Err(MapError::DuplicateSection(open.name));
        }
        let section = Section {
            name: open.name,
            address: open.address,
            size: open.size,
            contents: open.contents.contents,
        };
        if let Some(delta) = section.discrepancy() {
            tracing::warn!(
                "Section {} declares {:#x} bytes but its contents add up to {:#x} ({:+})",
                section.name,
                section.size,
                section.contents_size(),
                delta
            );
        }
        self.sections.insert(section.name.clone(), section);
        Ok(())
    }

    fn finish(mut self) -> Result<SectionTable, MapError> {
        self.close()?;
        Ok(self.sections)
    }
}

/// Parses the output sections of a map file, in file order.
pub fn parse_sections(text: &str) -> Result<SectionTable, MapError> {
    let mut scanner = SectionScanner::new();
    for (number, line) in memory_map_lines(text)? {
        scanner.line(number, line)?;
    }
    scanner.finish()
}

/// Reads the `__RAM_BUILD__` / `__FLASH_BUILD__` marker, if the map carries one.
pub fn build_type(text: &str) -> Option<BuildType> {
    text.lines()
        .filter(|line| line.contains(BUILD_MARKER))
        .filter_map(|line| line.split('_').nth(2).map(str::trim))
        .last()
        .map(BuildType::from_token)
}

/// Reads the regions of the "Memory Configuration" block.
pub fn find_regions(text: &str) -> IndexMap<String, MemoryRegion> {
    static REGION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^(.+?)\s+(0[xX][0-9a-fA-F]+)\s+(0[xX][0-9a-fA-F]+)(?:\s|$)").unwrap()
    });

    let mut regions = IndexMap::new();
    let lines = text
        .lines()
        .skip_while(|line| !line.contains(MEMORY_CONFIGURATION))
        .skip(1)
        .take_while(|line| !line.contains(DEFAULT_REGION));
    for line in lines {
        let Some(c) = REGION.captures(line) else { continue };
        let (Ok(start), Ok(length)) = (parse_hex(&c[2], 0), parse_hex(&c[3], 0)) else {
            continue;
        };
        regions.insert(c[1].trim().to_string(), MemoryRegion {
            start,
            end: start.saturating_add(length),
        });
    }
    regions
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const PXP_REPORTER: &str = include_str!("../../assets/tests/pxp_reporter.map");
    pub(crate) const RAM_BUILD: &str = include_str!("../../assets/tests/ram_build.map");

    /// Builds a minimal map file around the given memory map body.
    pub(crate) fn wrap_body(body: &str) -> String {
        format!(
            "Memory Configuration\n\nName Origin Length Attributes\n\
             *default* 0x00000000 0xffffffff\n\nLinker script and memory map\n\n\
             LOAD ./main.o\n\n{body}\nOUTPUT(test.elf elf32-littlearm)\n"
        )
    }

    #[test]
    fn test_sections_in_order() {
        let sections = parse_sections(PXP_REPORTER).unwrap();
        let names = sections.keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(names, [
            ".text",
            ".data",
            ".retention_mem_zi",
            ".stack_section",
            ".heap",
            ".zero_init"
        ]);
        let data = &sections[".data"];
        assert_eq!(data.address, 0x20000000);
        assert_eq!(data.size, 0x30);
    }

    #[test]
    fn test_text_contents() {
        let sections = parse_sections(PXP_REPORTER).unwrap();
        let text = &sections[".text"];
        assert_eq!(text.contents.len(), 7);
        assert_eq!(text.contents[0], Contribution {
            subsection: Some(".isr_vector".to_string()),
            address: 0,
            size: 0x40,
            object: ObjectRef::File("./startup/startup_da1469x.o".to_string()),
        });
        // Wrapped input section name is stitched to its continuation.
        assert_eq!(text.contents[2].subsection.as_deref(), Some(".text.ad_nvms_init"));
        assert_eq!(text.contents[2].size, 0x80);
        assert_eq!(text.contents[2].object.as_str(), "./sdk/adapters/src/ad_nvms.o");
        assert!(text.contents[3].is_fill());
        assert_eq!(text.contents[3].size, 0x10);
        assert_eq!(text.contents[4].object, ObjectRef::LinkerStubs);
        assert_eq!(
            text.contents[6].object.as_str(),
            "/opt/gcc-arm-none-eabi/lib/gcc/arm-none-eabi/10.3.1/../../../../arm-none-eabi/lib/\
             thumb/v8-m.main+fp/hard/libc_nano.a(lib_a-memcpy-stub.o)"
        );
    }

    #[test]
    fn test_wrapped_section_header() {
        let sections = parse_sections(PXP_REPORTER).unwrap();
        let retention = &sections[".retention_mem_zi"];
        assert_eq!(retention.address, 0x20000030);
        assert_eq!(retention.size, 0x100);
        assert_eq!(retention.contents.len(), 2);
        assert_eq!(retention.contents[1].subsection.as_deref(), Some("retention_mem_zi"));
    }

    #[test]
    fn test_declared_sections() {
        let sections = parse_sections(PXP_REPORTER).unwrap();
        assert!(sections[".stack_section"].contents.is_empty());
        assert!(!sections[".stack_section"].is_populated());
        let heap = &sections[".heap"];
        assert!(!heap.is_populated());
        assert_eq!(heap.fill_size(), 0x10);
    }

    #[test]
    fn test_parse_completeness() {
        let sections = parse_sections(PXP_REPORTER).unwrap();
        for section in sections.values().filter(|s| s.is_populated()) {
            assert_eq!(section.contents_size(), section.size, "{}", section.name);
            assert_eq!(section.discrepancy(), None);
        }
    }

    #[test]
    fn test_discrepancy_reported() {
        let text = wrap_body(
            ".text           0x08000000      0x100\n \
             .text          0x08000000       0xf0 ./sdk/adapters/foo.o\n",
        );
        let sections = parse_sections(&text).unwrap();
        assert_eq!(sections[".text"].discrepancy(), Some(-0x10));
    }

    #[test]
    fn test_idempotent_parse() {
        assert_eq!(MapFile::parse(PXP_REPORTER).unwrap(), MapFile::parse(PXP_REPORTER).unwrap());
    }

    #[test]
    fn test_missing_output_trailer() {
        let truncated = PXP_REPORTER.split("OUTPUT(").next().unwrap();
        let err = parse_sections(truncated).unwrap_err();
        assert!(matches!(err, MapError::MissingMarker(_)), "{err}");
    }

    #[test]
    fn test_missing_map_marker() {
        let err = parse_sections(".text 0x0 0x10\nOUTPUT(a.elf elf32-littlearm)\n").unwrap_err();
        assert!(matches!(err, MapError::MissingMarker(MAP_START)));
    }

    #[test]
    fn test_duplicate_section() {
        let text = wrap_body(".text 0x0 0x0\n\n.text 0x0 0x0\n");
        assert!(matches!(parse_sections(&text), Err(MapError::DuplicateSection(name)) if name == ".text"));
    }

    #[test]
    fn test_invalid_header() {
        let text = wrap_body(".text 0x0\n");
        assert!(matches!(parse_sections(&text), Err(MapError::InvalidHeader { .. })));
    }

    #[test]
    fn test_line_shapes() {
        assert_eq!(LineShape::of(" *fill*         0x000000e0       0x10 "), LineShape::Fill {
            address: "0x000000e0",
            size: "0x10"
        });
        assert_eq!(
            LineShape::of(" .text          0x00000040       0x20 C:\\My projects\\obj\\foo.obj"),
            LineShape::Inline {
                name: ".text",
                address: "0x00000040",
                size: "0x20",
                object: "C:\\My projects\\obj\\foo.obj",
            }
        );
        assert_eq!(LineShape::of(" .text.some_long_function_name"), LineShape::Name(
            ".text.some_long_function_name"
        ));
        assert_eq!(
            LineShape::of("                0x00000060       0x80 ./sdk/adapters/src/ad_nvms.o"),
            LineShape::Continuation {
                address: "0x00000060",
                size: "0x80",
                object: "./sdk/adapters/src/ad_nvms.o"
            }
        );
        assert_eq!(
            LineShape::of(" .glue_7        0x000000f0        0x0 linker stubs"),
            LineShape::Stubs { name: ".glue_7", address: "0x000000f0", size: "0x0" }
        );
        assert_eq!(
            LineShape::of("                0x000000f0        0x8 linker stubs"),
            LineShape::StubsContinuation { address: "0x000000f0", size: "0x8" }
        );
        assert_eq!(LineShape::of("                0x00000060                ad_nvms_init"), LineShape::Other);
        assert_eq!(LineShape::of(" *(.isr_vector)"), LineShape::Other);
    }

    #[test]
    fn test_wrapped_linker_stubs() {
        let text = wrap_body(
            ".text           0x00000000       0x18\n \
             .vfp11_veneer_long_name\n                \
             0x00000000       0x8 linker stubs\n \
             .text          0x00000008       0x10 ./main.o\n",
        );
        let sections = parse_sections(&text).unwrap();
        let text = &sections[".text"];
        assert_eq!(text.contents[0].subsection.as_deref(), Some(".vfp11_veneer_long_name"));
        assert_eq!(text.contents[0].object, ObjectRef::LinkerStubs);
        assert_eq!(text.contents[0].size, 8);
        assert_eq!(text.discrepancy(), None);
    }

    #[test]
    fn test_find_regions() {
        let regions = find_regions(PXP_REPORTER);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions["ROM"], MemoryRegion { start: 0, end: 0x80000 });
        assert_eq!(regions["RAM"], MemoryRegion { start: 0x20000000, end: 0x20080000 });
        assert!(regions["RAM"].contains(0x2007ffff));
        assert!(!regions["RAM"].contains(0x20080000));
        assert!(find_regions(RAM_BUILD).is_empty());
    }

    #[test]
    fn test_build_type() {
        assert_eq!(build_type(PXP_REPORTER), None);
        assert_eq!(build_type(RAM_BUILD), Some(BuildType::Ram));
        assert_eq!(
            build_type("                0x00000001                __FLASH_BUILD__ = 0x1\n"),
            Some(BuildType::Flash)
        );
    }

    #[test]
    fn test_non_zero_sections() {
        let map = MapFile::parse(PXP_REPORTER).unwrap();
        let names = map.non_zero_sections().map(|s| s.name.as_str()).collect::<Vec<_>>();
        assert!(!names.contains(&".zero_init"));
        assert_eq!(names.len(), 5);
    }
}
