//! Image: the memory-mapped backing store for a ufs index file.
//!
//! Grounded on `original_source/src/ufs_image.c` (`ufsImageOpen`/
//! `ufsImageCreate`/`ufsImageSync`/`ufsImageFree`, including the convention
//! of storing the image's own byte length in its first machine word) and on
//! the `memmap2`-based arena store in the retrieval pack's
//! `mmap_store.rs` (`MmapStore::open`/`ensure_capacity`/`sync`), which is
//! where the `memmap2::MmapMut` usage pattern below comes from.

use std::fs::OpenOptions;
use std::path::Path;

use memmap2::MmapMut;

use crate::error::{Error, Result, StatusCode};
use crate::header;

/// A memory-mapped image file. The first eight bytes hold the image's total
/// byte length (mirroring the source's `*(uint64_t*)image = size`); the
/// header proper starts immediately after, at `header::compute_layout`'s
/// `header_offset`.
pub struct Image {
  mmap: MmapMut,
}

impl Image {
  /// Creates a new image at `path` sized for `sizes`, writing the header
  /// and leading length word but not yet the zeroed arenas (the mapping
  /// itself is zero-initialized by `set_len`).
  pub fn create(path: &Path, sizes: &crate::defs::ArenaSizes) -> Result<Self> {
    if path.exists() {
      return Err(Error::Status(StatusCode::AlreadyExists));
    }

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let layout = header::compute_layout(sizes);

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .open(path)
      .map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
          Error::Status(StatusCode::CantCreateFile)
        } else {
          Error::Io(e)
        }
      })?;
    file.set_len(layout.total_size)?;

    let mut mmap = unsafe { MmapMut::map_mut(&file)? };
    mmap[0..8].copy_from_slice(&layout.total_size.to_ne_bytes());
    header::write_header(&mut mmap, sizes, &layout);

    log::info!("created image at {} ({} bytes)", path.display(), layout.total_size);
    Ok(Self { mmap })
  }

  /// Opens an existing image at `path`, validating its header.
  pub fn open(path: &Path) -> Result<Self> {
    if !path.exists() {
      return Err(Error::Status(StatusCode::ImageDoesNotExist));
    }

    let file = OpenOptions::new().read(true).write(true).open(path)?;
    let len = file.metadata()?.len();
    if len < 8 {
      return Err(Error::Status(StatusCode::ImageTooSmall));
    }

    let mmap = unsafe { MmapMut::map_mut(&file)? };
    header::validate(&mmap)?;

    log::info!("opened image at {} ({} bytes)", path.display(), len);
    Ok(Self { mmap })
  }

  /// Flushes the mapping to disk (`spec.md` §4.2, the analogue of
  /// `ufsImageSync`'s `msync(MS_SYNC)`).
  pub fn sync(&self) -> Result<()> {
    self
      .mmap
      .flush()
      .map_err(|_| Error::Status(StatusCode::ImageCouldNotSync))?;
    log::info!("synced image ({} bytes)", self.mmap.len());
    Ok(())
  }

  pub fn header_offset(&self) -> u64 {
    let stored_size = u64::from_ne_bytes(self.mmap[0..8].try_into().unwrap());
    debug_assert_eq!(stored_size, self.mmap.len() as u64);
    header::compute_layout(&crate::defs::ArenaSizes::default()).header_offset
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.mmap
  }

  pub fn as_bytes_mut(&mut self) -> &mut [u8] {
    &mut self.mmap
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::defs::ArenaSizes;

  #[test]
  fn create_then_open_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ufs_index");
    {
      let image = Image::create(&path, &ArenaSizes::default()).unwrap();
      image.sync().unwrap();
    }
    let reopened = Image::open(&path).unwrap();
    assert!(reopened.as_bytes().len() > 8);
  }

  #[test]
  fn create_refuses_to_overwrite_existing_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ufs_index");
    Image::create(&path, &ArenaSizes::default()).unwrap();
    let err = Image::create(&path, &ArenaSizes::default()).unwrap_err();
    assert_eq!(err.status(), StatusCode::AlreadyExists);
  }

  #[test]
  fn open_rejects_missing_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist");
    let err = Image::open(&path).unwrap_err();
    assert_eq!(err.status(), StatusCode::ImageDoesNotExist);
  }

  #[test]
  fn open_rejects_truncated_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ufs_index");
    std::fs::write(&path, [0u8; 4]).unwrap();
    let err = Image::open(&path).unwrap_err();
    assert_eq!(err.status(), StatusCode::ImageTooSmall);
  }

  #[test]
  fn open_rejects_corrupted_magic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ufs_index");
    Image::create(&path, &ArenaSizes::default()).unwrap();
    let layout = header::compute_layout(&ArenaSizes::default());
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[layout.header_offset as usize] ^= 0xFF;
    std::fs::write(&path, bytes).unwrap();
    let err = Image::open(&path).unwrap_err();
    assert_eq!(err.status(), StatusCode::ImageIsCorrupted);
  }
}
