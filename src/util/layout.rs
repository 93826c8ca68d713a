//! Device memory layouts, used to sort sections into RAM, ROM and the other
//! memory categories of the reports.
use std::{fs, path::Path};

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::map::{BuildType, MapFile, MemoryRegion, SectionTable};

const BUILTIN_LAYOUTS: &str = include_str!("../../assets/layouts.yml");

/// Section name fragments of memory retained across sleep.
const RETAINED_MARKERS: [&str; 3] = ["RETENTION", ".retention", ".stack"];

/// An address window, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window(pub u64, pub u64);

impl Window {
    #[inline]
    pub fn contains(&self, address: u64) -> bool { address >= self.0 && address < self.1 }
}

impl From<MemoryRegion> for Window {
    fn from(region: MemoryRegion) -> Self { Window(region.start, region.end) }
}

pub fn in_windows(windows: &[Window], address: u64) -> bool {
    windows.iter().any(|w| w.contains(address))
}

#[derive(Debug, Clone, Deserialize)]
pub struct RamTarget {
    /// A stack section linked inside this window marks an image running from RAM.
    pub stack: Window,
    pub ram: Vec<Window>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FamilyLayout {
    pub name: String,
    /// Selects this family for maps carrying a `_BUILD__` marker symbol.
    #[serde(default)]
    pub build_marker: bool,
    #[serde(default)]
    pub otp: Vec<Window>,
    #[serde(default)]
    pub ram: Vec<Window>,
    /// When absent, everything outside RAM counts as flash.
    #[serde(default)]
    pub flash: Option<Vec<Window>>,
    #[serde(default)]
    pub cache_ram: Vec<Window>,
    #[serde(default)]
    pub ram_target: Option<RamTarget>,
}

impl FamilyLayout {
    pub fn is_ram_target(&self, sections: &SectionTable) -> bool {
        let Some(target) = &self.ram_target else { return false };
        sections
            .values()
            .any(|section| section.name.contains("stack") && target.stack.contains(section.address))
    }

    pub fn ram_windows(&self, sections: &SectionTable) -> &[Window] {
        match &self.ram_target {
            Some(target) if self.is_ram_target(sections) => &target.ram,
            _ => &self.ram,
        }
    }

    fn validate(&self) -> Result<()> {
        let windows = self
            .otp
            .iter()
            .chain(&self.ram)
            .chain(self.flash.iter().flatten())
            .chain(&self.cache_ram)
            .chain(self.ram_target.iter().flat_map(|t| std::iter::once(&t.stack).chain(&t.ram)));
        for window in windows {
            ensure!(
                window.0 <= window.1,
                "Layout {}: window [{:#x}, {:#x}) ends before it starts",
                self.name,
                window.0,
                window.1
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Layouts {
    pub families: Vec<FamilyLayout>,
}

impl Layouts {
    pub fn builtin() -> Result<Self> { Self::parse(BUILTIN_LAYOUTS) }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read layouts from '{}'", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid layouts file '{}'", path.display()))
    }

    /// Loads the given layouts file, or the built-in layouts.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::builtin(),
        }
    }

    fn parse(text: &str) -> Result<Self> {
        let layouts: Layouts = serde_yaml::from_str(text)?;
        ensure!(!layouts.families.is_empty(), "No device families defined");
        for family in &layouts.families {
            family.validate()?;
        }
        Ok(layouts)
    }

    pub fn family_for(&self, build_type: Option<&BuildType>) -> Option<&FamilyLayout> {
        if let Some(BuildType::Other(marker)) = build_type {
            tracing::warn!("Unknown build type marker '{marker}', assuming a flash build");
        }
        let family =
            self.families.iter().find(|family| family.build_marker == build_type.is_some());
        if family.is_none() {
            tracing::warn!(
                "No memory layout for maps {} a build type marker",
                if build_type.is_some() { "with" } else { "without" }
            );
        }
        family
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RamRanges {
    /// A RAM build; every section lives in RAM.
    All,
    Windows(Vec<Window>),
}

/// Decides which section addresses count as RAM and ROM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryClassifier {
    pub ram: RamRanges,
    pub rom: Option<MemoryRegion>,
}

impl MemoryClassifier {
    /// RAM comes from the RAM regions of the map's memory configuration when present,
    /// otherwise from the device family layout. ROM only ever comes from a `ROM` region.
    pub fn detect(map: &MapFile, layouts: &Layouts) -> Self {
        let rom = map.regions.get("ROM").copied();
        if map.build_type.as_ref().is_some_and(BuildType::is_ram) {
            return Self { ram: RamRanges::All, rom };
        }
        let regions = map
            .regions
            .iter()
            .filter(|(name, _)| name.to_ascii_uppercase().contains("RAM"))
            .map(|(_, region)| Window::from(*region))
            .collect::<Vec<_>>();
        let ram = if !regions.is_empty() {
            RamRanges::Windows(regions)
        } else if let Some(family) = layouts.family_for(map.build_type.as_ref()) {
            tracing::debug!("Using {} address windows for RAM", family.name);
            RamRanges::Windows(family.ram_windows(&map.sections).to_vec())
        } else {
            RamRanges::Windows(vec![])
        };
        Self { ram, rom }
    }

    pub fn is_ram(&self, address: u64) -> bool {
        match &self.ram {
            RamRanges::All => true,
            RamRanges::Windows(windows) => in_windows(windows, address),
        }
    }

    pub fn is_rom(&self, address: u64) -> bool { self.rom.is_some_and(|r| r.contains(address)) }
}

/// Whether a section holds memory retained across sleep.
pub fn is_retained(section: &str) -> bool {
    RETAINED_MARKERS.iter().any(|marker| section.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::map::tests::{wrap_body, PXP_REPORTER, RAM_BUILD};

    #[test]
    fn test_builtin_layouts() {
        let layouts = Layouts::builtin().unwrap();
        assert_eq!(layouts.families.len(), 2);
        let legacy = layouts.family_for(None).unwrap();
        assert_eq!(legacy.name, "DA1468x/DA1469x");
        assert!(legacy.flash.is_some());
        let da1470x = layouts.family_for(Some(&BuildType::Flash)).unwrap();
        assert_eq!(da1470x.name, "DA1470x");
        assert!(da1470x.flash.is_none());
        assert!(in_windows(&da1470x.ram, 0x20182fff));
        assert!(!in_windows(&da1470x.ram, 0x20183000));
    }

    #[test]
    fn test_invalid_layouts() {
        assert!(Layouts::parse("families: []").is_err());
        assert!(Layouts::parse("families:\n  - name: x\n    ram: [[0x10, 0x0]]\n").is_err());
    }

    #[test]
    fn test_regions_preferred() {
        let map = MapFile::parse(PXP_REPORTER).unwrap();
        let memory = MemoryClassifier::detect(&map, &Layouts::builtin().unwrap());
        assert_eq!(memory.ram, RamRanges::Windows(vec![Window(0x20000000, 0x20080000)]));
        assert_eq!(memory.rom, Some(MemoryRegion { start: 0, end: 0x80000 }));
        assert!(memory.is_rom(0x40));
        assert!(!memory.is_ram(0x40));
        assert!(memory.is_ram(0x20000030));
    }

    #[test]
    fn test_ram_build() {
        let map = MapFile::parse(RAM_BUILD).unwrap();
        let memory = MemoryClassifier::detect(&map, &Layouts::builtin().unwrap());
        assert_eq!(memory.ram, RamRanges::All);
        assert!(memory.is_ram(0x0));
        assert_eq!(memory.rom, None);
        assert!(!memory.is_rom(0x0));
    }

    #[test]
    fn test_family_fallback() {
        let map = MapFile::parse(&wrap_body(
            ".text           0x08000000      0x100\n\n.stack_section  0x07fc0000      0x200\n",
        ))
        .unwrap();
        let layouts = Layouts::builtin().unwrap();
        let memory = MemoryClassifier::detect(&map, &layouts);
        assert!(memory.is_ram(0x07fc0000));
        assert!(memory.is_ram(0x20000000));
        assert!(!memory.is_ram(0x08000000));
        assert!(!layouts.family_for(None).unwrap().is_ram_target(&map.sections));
    }

    #[test]
    fn test_ram_target_detection() {
        let map = MapFile::parse(&wrap_body(
            ".text           0x00000000      0x100\n\n.stack_section  0x00070000      0x200\n",
        ))
        .unwrap();
        let layouts = Layouts::builtin().unwrap();
        let family = layouts.family_for(None).unwrap();
        assert!(family.is_ram_target(&map.sections));
        let memory = MemoryClassifier::detect(&map, &layouts);
        assert!(memory.is_ram(0x0));
        assert!(!memory.is_ram(0x20000000));
    }

    #[test]
    fn test_is_retained() {
        assert!(is_retained("RETENTION_RAM_INIT"));
        assert!(is_retained(".retention_mem_zi"));
        assert!(is_retained(".stack_section"));
        assert!(!is_retained(".text"));
        assert!(!is_retained(".heap"));
    }
}
