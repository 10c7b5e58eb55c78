//! Entity registry: the File and Area arenas, and the name-keyed lookup
//! tables layered over them.
//!
//! Grounded on `original_source/src/ufs_header.h`'s `ufsFileStruct` /
//! `ufsAreaStruct`, with one deliberate addition: `spec.md`'s bit-layout
//! gives [`FileRecord`] a `parent_dir` field the original `ufsFileStruct`
//! does not have. That field is what lets `removeFile` unlink a file from
//! its directory's index without a separate reverse-lookup table.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::defs::Id;
use crate::error::{Error, Result, StatusCode};

/// Slot was never handed out by [`allocate`].
pub const SLOT_FREE: u8 = 0;
/// Slot backs a live entity.
pub const SLOT_IN_USE: u8 = 1;
/// Slot backed an entity that was removed. Ids are never reused while an
/// image is live (I1), so a retired slot stays retired forever — it is
/// distinct from `SLOT_FREE` precisely so [`allocate`] never hands its id
/// back out.
pub const SLOT_RETIRED: u8 = 2;

/// On-disk file record, `spec.md` §6 bit-layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FileRecord {
  pub in_use: u8,
  _pad: [u8; 7],
  pub str_offset: u64,
  pub parent_dir: i64,
}

/// On-disk area record (a directory is an area with a directory index
/// rooted at the matching node slot; see `node.rs`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct AreaRecord {
  pub in_use: u8,
  _pad: [u8; 7],
  pub str_offset: u64,
}

/// Name-keyed view over the File and Area arenas. Rebuilt by scanning
/// in-use records on open (`spec.md` §4.3 "Reopening an existing image
/// reconstructs all in-memory lookup tables by scanning the arenas"); never
/// itself persisted.
///
/// File names are only required to be unique within their directory (I4),
/// so `files` is keyed by `(parentDir, name)` rather than by name alone;
/// `areas` (which also serves as the directory name table, since a
/// directory is an area — I4 requires directory names be globally unique
/// too) is keyed by name alone.
pub struct Registry {
  pub files: HashMap<(Id, String), Id>,
  pub areas: HashMap<String, Id>,
}

impl Registry {
  pub fn new() -> Self {
    Self {
      files: HashMap::new(),
      areas: HashMap::new(),
    }
  }

  /// Rebuilds the name tables by scanning every in-use record, reading its
  /// name back out of the string pool.
  pub fn rebuild(
    &mut self,
    file_records: &[FileRecord],
    area_records: &[AreaRecord],
    strings: &crate::string_pool::StringPool<'_>,
  ) {
    self.files.clear();
    self.areas.clear();
    for (idx, record) in file_records.iter().enumerate() {
      if record.in_use == SLOT_IN_USE {
        let name = strings.read(record.str_offset).to_owned();
        self.files.insert((record.parent_dir, name), idx as Id);
      }
    }
    for (idx, record) in area_records.iter().enumerate() {
      if record.in_use == SLOT_IN_USE {
        let name = strings.read(record.str_offset).to_owned();
        self.areas.insert(name, idx as Id);
      }
    }
  }
}

impl Default for Registry {
  fn default() -> Self {
    Self::new()
  }
}

/// Allocates the first never-before-used slot in `records`, returning its
/// index. Slot `0` is never handed out: it stands in for
/// [`crate::defs::BASE`] in the area arena, and file id `0` is simply unused
/// by convention to keep ids uniform across both arenas.
///
/// `in_use` is expected to report true for both `SLOT_IN_USE` and
/// `SLOT_RETIRED` records, so a retired id is never handed back out (I1: ids
/// are monotonic per kind and never reused while the image is live).
pub fn allocate<T: Pod + Zeroable>(records: &mut [T], in_use: impl Fn(&T) -> bool) -> Result<Id> {
  for (idx, record) in records.iter().enumerate().skip(1) {
    if !in_use(record) {
      return Ok(idx as Id);
    }
  }
  Err(Error::Status(StatusCode::OutOfMemory))
}

impl FileRecord {
  pub fn empty() -> Self {
    Self {
      in_use: 0,
      _pad: [0; 7],
      str_offset: 0,
      parent_dir: crate::defs::BASE,
    }
  }
}

impl AreaRecord {
  pub fn empty() -> Self {
    Self {
      in_use: 0,
      _pad: [0; 7],
      str_offset: 0,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allocate_skips_reserved_zero_slot() {
    let mut records = vec![FileRecord::empty(); 4];
    let id = allocate(&mut records, |r| r.in_use != 0).unwrap();
    assert_eq!(id, 1);
  }

  #[test]
  fn allocate_finds_first_free_slot_after_in_use_ones() {
    let mut records = vec![FileRecord::empty(); 4];
    records[1].in_use = 1;
    records[2].in_use = 1;
    let id = allocate(&mut records, |r| r.in_use != 0).unwrap();
    assert_eq!(id, 3);
  }

  #[test]
  fn allocate_reports_out_of_memory_when_full() {
    let mut records = vec![FileRecord::empty(); 2];
    records[1].in_use = 1;
    let err = allocate(&mut records, |r| r.in_use != 0).unwrap_err();
    assert_eq!(err.status(), StatusCode::OutOfMemory);
  }

  #[test]
  fn allocate_never_reissues_a_retired_slot() {
    let mut records = vec![FileRecord::empty(); 4];
    let first = allocate(&mut records, |r| r.in_use != 0).unwrap();
    records[first as usize].in_use = SLOT_IN_USE;
    records[first as usize].in_use = SLOT_RETIRED;
    let second = allocate(&mut records, |r| r.in_use != 0).unwrap();
    assert_ne!(first, second);
  }
}
