use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::Array2;
use tempfile::Builder;
use tracing::debug;

use crate::error::{FringeError, Result};
use crate::io::fits::{write_fits, FitsHeader};

/// Write `path` through a sibling temporary file that replaces the target
/// only once `write` has finished and the data is synced to disk.
///
/// If `write` fails, the temporary is removed and any existing file at
/// `path` is left untouched. Concurrent writers to the same path are not
/// coordinated.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = Builder::new()
        .prefix(".defringe-")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;

    debug!(tmp = %tmp.path().display(), target = %path.display(), "Replacing file");
    tmp.persist(path).map_err(|e| FringeError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Atomically write a FITS image.
pub fn write_image(path: &Path, data: &Array2<f32>, header: &FitsHeader) -> Result<()> {
    write_atomic(path, |w| write_fits(w, data, header))
}
