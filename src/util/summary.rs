//! Memory usage figures of one map, as collected for the projects summary.
use std::path::Path;

use serde::Serialize;

use crate::util::{
    layout::{in_windows, is_retained, Layouts, Window},
    map::{BuildType, MapFile},
};

pub const SIZE_HEADERS: [&str; 6] = [
    "OTP size",
    "FLASH size",
    "RAM size",
    "Cache RAM size",
    "Retained RAM size",
    "Bin file size",
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummarySizes {
    #[serde(rename = "OTP size")]
    pub otp: u64,
    #[serde(rename = "FLASH size")]
    pub flash: u64,
    #[serde(rename = "RAM size")]
    pub ram: u64,
    #[serde(rename = "Cache RAM size")]
    pub cache_ram: u64,
    #[serde(rename = "Retained RAM size")]
    pub retained: u64,
    #[serde(rename = "Bin file size")]
    pub bin: u64,
}

impl SummarySizes {
    pub fn values(&self) -> [u64; 6] {
        [self.otp, self.flash, self.ram, self.cache_ram, self.retained, self.bin]
    }
}

/// Sums section sizes per memory of the device family the map was built for.
pub fn summary_sizes(map: &MapFile, layouts: &Layouts, bin: u64) -> SummarySizes {
    let sections = &map.sections;
    let size_in = |windows: &[Window]| -> u64 {
        sections.values().filter(|s| in_windows(windows, s.address)).map(|s| s.size).sum()
    };
    let total: u64 = sections.values().map(|s| s.size).sum();
    let ram_build = map.build_type.as_ref().is_some_and(BuildType::is_ram);
    let family = layouts.family_for(map.build_type.as_ref());

    let mut ram = match family {
        _ if ram_build => total,
        Some(family) => size_in(&family.ram),
        None => 0,
    };
    let mut flash = match family.and_then(|f| f.flash.as_deref()) {
        Some(windows) if !ram_build => size_in(windows),
        _ => total.saturating_sub(ram),
    };
    if family.is_some_and(|f| f.is_ram_target(sections)) {
        tracing::debug!("Stack linked in SYSRAM: counting the image as RAM");
        ram = flash;
        flash = 0;
    }
    SummarySizes {
        otp: family.map_or(0, |f| size_in(&f.otp)),
        flash,
        ram,
        cache_ram: family.map_or(0, |f| size_in(&f.cache_ram)),
        retained: sections.values().filter(|s| is_retained(&s.name)).map(|s| s.size).sum(),
        bin,
    }
}

/// One line of the projects summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSummary {
    #[serde(rename = "Project")]
    pub project: String,
    #[serde(rename = "Configuration")]
    pub configuration: String,
    #[serde(flatten)]
    pub sizes: SummarySizes,
}

impl ProjectSummary {
    /// The project is named after the map file and the configuration after its directory.
    pub fn new(map_path: &Path, sizes: SummarySizes) -> Self {
        let name = |path: Option<&std::ffi::OsStr>| {
            path.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
        };
        Self {
            project: name(map_path.file_stem()),
            configuration: name(map_path.parent().and_then(Path::file_name)),
            sizes,
        }
    }

    pub fn file_stem(&self) -> String { format!("{}_{}", self.project, self.configuration) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::map::tests::{wrap_body, PXP_REPORTER, RAM_BUILD};

    fn sizes(text: &str) -> SummarySizes {
        summary_sizes(&MapFile::parse(text).unwrap(), &Layouts::builtin().unwrap(), 0)
    }

    #[test]
    fn test_flash_build() {
        assert_eq!(sizes(PXP_REPORTER), SummarySizes {
            otp: 0,
            flash: 0x1a0,
            ram: 0x30 + 0x100 + 0x400 + 0x210,
            cache_ram: 0,
            retained: 0x100 + 0x400,
            bin: 0,
        });
    }

    #[test]
    fn test_ram_build() {
        assert_eq!(sizes(RAM_BUILD), SummarySizes {
            otp: 0,
            flash: 0,
            ram: 0x80 + 0x180,
            cache_ram: 0,
            retained: 0x180,
            bin: 0,
        });
    }

    #[test]
    fn test_ram_target() {
        let text = wrap_body(
            ".text           0x00000000      0x100\n\n.stack_section  0x00070000      0x200\n",
        );
        let sizes = sizes(&text);
        assert_eq!(sizes.ram, 0x300);
        assert_eq!(sizes.flash, 0);
        assert_eq!(sizes.retained, 0x200);
    }

    #[test]
    fn test_otp_and_cache() {
        let text = wrap_body(
            ".otp            0x07f80000       0x40\n\n\
             .cache          0x30060000       0x80\n",
        );
        let sizes = sizes(&text);
        assert_eq!(sizes.otp, 0x40);
        assert_eq!(sizes.cache_ram, 0x80);
        assert_eq!(sizes.flash, 0);
    }

    #[test]
    fn test_flash_marker_build() {
        let text = format!(
            "{}                0x00000001                __FLASH_BUILD__ = 0x1\n",
            wrap_body(".text           0x32000000      0x100\n\n.data           0x20000000       0x40\n")
        );
        let sizes = sizes(&text);
        assert_eq!(sizes.ram, 0x40);
        assert_eq!(sizes.flash, 0x100);
    }

    #[test]
    fn test_project_names() {
        let summary =
            ProjectSummary::new(Path::new("projects/pxp_reporter/DA1469x-Release/pxp_reporter.map"), SummarySizes::default());
        assert_eq!(summary.project, "pxp_reporter");
        assert_eq!(summary.configuration, "DA1469x-Release");
        assert_eq!(summary.file_stem(), "pxp_reporter_DA1469x-Release");
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["Project"], "pxp_reporter");
        assert_eq!(json["Bin file size"], 0);
    }
}
