use std::{
    borrow::Cow,
    fs::{DirBuilder, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use memmap2::{Mmap, MmapOptions};

/// A read-only memory mapped file.
pub struct MappedFile {
    mmap: Mmap,
}

impl MappedFile {
    /// The file contents as text. Map files are ASCII, but object paths may carry
    /// bytes from a legacy code page, so invalid UTF-8 is replaced rather than rejected.
    pub fn as_text(&self) -> Cow<'_, str> { String::from_utf8_lossy(&self.mmap) }
}

/// Opens a memory mapped file.
pub fn map_file<P>(path: P) -> Result<MappedFile>
where P: AsRef<Path> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open file '{}'", path.display()))?;
    let mmap = unsafe { MmapOptions::new().map(&file) }
        .with_context(|| format!("Failed to mmap file: '{}'", path.display()))?;
    Ok(MappedFile { mmap })
}

/// Creates a buffered writer around a file (not memory mapped).
pub fn buf_writer<P>(path: P) -> Result<BufWriter<File>>
where P: AsRef<Path> {
    if let Some(parent) = path.as_ref().parent() {
        DirBuilder::new().recursive(true).create(parent)?;
    }
    let file = File::create(&path)
        .with_context(|| format!("Failed to create file '{}'", path.as_ref().display()))?;
    Ok(BufWriter::new(file))
}

/// Fails with a user-facing message when an input map file is missing.
pub fn ensure_map_file(path: &Path) -> Result<()> {
    ensure!(path.is_file(), "{} does not exist", path.display());
    Ok(())
}

/// The `.bin` image produced next to a map file.
pub fn bin_path(map_path: &Path) -> PathBuf { map_path.with_extension("bin") }

/// Size of the `.bin` image next to a map file, or 0 when there is none.
pub fn bin_file_size(map_path: &Path) -> u64 {
    let path = bin_path(map_path);
    match path.metadata() {
        Ok(metadata) if metadata.is_file() => metadata.len(),
        _ => {
            tracing::warn!("{} does not exist", path.display());
            0
        }
    }
}
