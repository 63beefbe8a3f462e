//! The laszip transport: compression delegated to an external tool.
//!
//! The core codec only ever sees uncompressed bytes. Reading a `.laz` file
//! decompresses it to a temporary `.las` file first; writing compresses a
//! temporary `.las` file into the target path. The temporary file is
//! deleted on every exit path, success or failure, by its drop guard.

use crate::{Error, Result};
use std::{path::Path, process::Command};
use tempfile::{Builder, NamedTempFile};

const LASZIP: &str = "laszip";

/// Returns true if this path has the compressed extension.
pub(crate) fn is_laz_path(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.eq_ignore_ascii_case("laz"))
        .unwrap_or(false)
}

/// Decompresses a `.laz` file into a temporary `.las` file.
pub(crate) fn decompress(path: &Path) -> Result<NamedTempFile> {
    let tempfile = las_tempfile()?;
    run_laszip(path, tempfile.path())?;
    Ok(tempfile)
}

/// Compresses a `.las` file into the target `.laz` path.
pub(crate) fn compress(las_path: &Path, laz_path: &Path) -> Result<()> {
    run_laszip(las_path, laz_path)
}

/// Creates the scratch file the external tool reads from or writes to.
pub(crate) fn las_tempfile() -> Result<NamedTempFile> {
    Builder::new()
        .prefix("las-dataset")
        .suffix(".las")
        .tempfile()
        .map_err(Error::from)
}

fn run_laszip(input: &Path, output: &Path) -> Result<()> {
    let output = Command::new(LASZIP)
        .arg("-i")
        .arg(input)
        .arg("-o")
        .arg(output)
        .output()?;
    if output.status.success() {
        Ok(())
    } else {
        Err(Error::Laszip(format!(
            "exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn laz_paths() {
        assert!(is_laz_path(Path::new("points.laz")));
        assert!(is_laz_path(Path::new("points.LAZ")));
        assert!(!is_laz_path(Path::new("points.las")));
        assert!(!is_laz_path(Path::new("points")));
    }

    #[test]
    fn tempfile_has_las_suffix() {
        let tempfile = las_tempfile().unwrap();
        assert!(tempfile.path().extension().is_some_and(|e| e == "las"));
    }
}
