use std::path::{Path, PathBuf};

use ndarray::Array2;
use tracing::{debug, warn};

use crate::error::Result;
use crate::io::fits::FitsReader;
use crate::orientation::{normalize, PierSide};
use crate::stack::sampling::FrameSource;

/// `*.fits` files directly inside `dir`, sorted by name.
pub fn list_fits(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_fits_extension(path))
        .collect();
    paths.sort();
    Ok(paths)
}

fn has_fits_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("fits"))
}

#[derive(Clone, Debug)]
struct FolderEntry {
    path: PathBuf,
    shape: (usize, usize),
    side: PierSide,
}

/// A folder of exposures read lazily from disk.
///
/// Headers are scanned up front; pixels are only read when a sample needs
/// them and are flipped to canonical orientation on load.
#[derive(Clone, Debug)]
pub struct FitsFolder {
    root: PathBuf,
    entries: Vec<FolderEntry>,
    skipped: Vec<PathBuf>,
}

impl FitsFolder {
    /// Scan `dir`. Files with an unreadable header or no usable pier side
    /// are skipped with a warning.
    pub fn scan(dir: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        let mut skipped = Vec::new();

        for path in list_fits(dir)? {
            match scan_entry(&path) {
                Ok(entry) => {
                    debug!(path = %path.display(), side = %entry.side, "Found exposure");
                    entries.push(entry);
                }
                Err(e) if e.is_recoverable() => {
                    warn!(path = %path.display(), error = %e, "Skipping image");
                    skipped.push(path);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Self {
            root: dir.to_path_buf(),
            entries,
            skipped,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Files left out during the scan.
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    pub fn path(&self, index: usize) -> &Path {
        &self.entries[index].path
    }
}

fn scan_entry(path: &Path) -> Result<FolderEntry> {
    let reader = FitsReader::open(path)?;
    let side = PierSide::from_header(&reader.header, &path.display().to_string())?;
    Ok(FolderEntry {
        path: path.to_path_buf(),
        shape: reader.shape(),
        side,
    })
}

impl FrameSource for FitsFolder {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn name(&self, index: usize) -> String {
        self.entries[index].path.display().to_string()
    }

    fn shape(&self, index: usize) -> (usize, usize) {
        self.entries[index].shape
    }

    fn load(&self, index: usize) -> Result<Array2<f32>> {
        let entry = &self.entries[index];
        let data = FitsReader::open(&entry.path)?.read_pixels()?;
        Ok(normalize(data, entry.side))
    }
}
