//! The external filesystem collaborator (`spec.md` §6): the host FS a ufs
//! image is layered on top of. The core only ever needs three operations
//! from it, invoked solely for BASE resolution, BASE iteration, and a
//! collapse whose terminal area is BASE.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// What the core needs from the real filesystem. A trait so tests can swap
/// in an in-memory double without touching disk.
pub trait ExternalFs {
  /// Lists the file names directly inside `dir` (relative to the external
  /// root), non-recursively.
  fn list_files(&self, dir: &Path) -> Result<Vec<String>>;

  /// Ensures `path` exists as an empty file, doing nothing if it already
  /// does (`spec.md` §4.7 collapse "storage not yet present there is
  /// materialised there").
  fn create_if_absent(&self, path: &Path) -> Result<()>;

  /// Ensures `path` exists as a directory, doing nothing if it already
  /// does.
  fn create_dir_if_absent(&self, path: &Path) -> Result<()>;

  /// Removes `path` if it exists (a file or an empty directory).
  fn remove(&self, path: &Path) -> Result<()>;
}

/// The real host filesystem, rooted at a fixed directory. Grounded on the
/// teacher's `walkdir`-based filesystem capture in `builder.rs`.
pub struct HostFs {
  root: PathBuf,
}

impl HostFs {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }
}

impl ExternalFs for HostFs {
  fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
    let full = self.root.join(dir);
    if !full.exists() {
      return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in walkdir::WalkDir::new(&full).min_depth(1).max_depth(1) {
      let entry = entry?;
      if entry.file_type().is_file() {
        if let Some(name) = entry.file_name().to_str() {
          names.push(name.to_owned());
        }
      }
    }
    log::trace!("listed {} external files under {}", names.len(), full.display());
    Ok(names)
  }

  fn create_if_absent(&self, path: &Path) -> Result<()> {
    let full = self.root.join(path);
    if full.exists() {
      return Ok(());
    }
    if let Some(parent) = full.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::File::create(&full)?;
    log::debug!("materialised {} on the external filesystem", full.display());
    Ok(())
  }

  fn create_dir_if_absent(&self, path: &Path) -> Result<()> {
    let full = self.root.join(path);
    if full.exists() {
      return Ok(());
    }
    std::fs::create_dir_all(&full)?;
    log::debug!("materialised directory {} on the external filesystem", full.display());
    Ok(())
  }

  fn remove(&self, path: &Path) -> Result<()> {
    let full = self.root.join(path);
    if full.is_dir() {
      std::fs::remove_dir(&full)?;
    } else if full.exists() {
      std::fs::remove_file(&full)?;
    }
    Ok(())
  }
}
