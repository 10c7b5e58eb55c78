//! Fundamental types and constants shared across the crate.

/// Identifier type used for every entity kind (file, area, directory).
///
/// Positive values name an in-use record; `0` is reserved for [`BASE`].
/// Negative values are never stored — they're the C source's calling
/// convention for reporting an error out of an id-returning function, which
/// this crate surfaces as `Result<Id, Error>` instead (see `error.rs`).
pub type Id = i64;

/// The reserved area id referring to the external filesystem a ufs image is
/// layered on top of. Never appears in the area arena and never appears in
/// a stored [`crate::mapping::MappingSet`] entry (invariant I5).
pub const BASE: Id = 0;

/// Maximum number of areas a [`crate::view::View`] may hold.
pub const VIEW_MAX: usize = 1024;

/// Sentinel value terminating a view short of `VIEW_MAX` entries.
pub const VIEW_TERMINATOR: Id = -1;

/// `"ufs\0"`, stored in the header as a corruption sanity check.
pub const MAGIC_NUMBER: u32 = 0x0073_6675;

/// Bumped whenever the on-disk layout changes incompatibly.
pub const INDEX_VERSION: u32 = 1;

/// Conventional location of an image relative to a mounted root, carried
/// over from the original implementation's `UFS_DIRECTORY`/`UFS_IMAGE_FILE`.
pub const UFS_DIRECTORY: &str = ".ufs";

/// Conventional image file name within [`UFS_DIRECTORY`].
pub const UFS_IMAGE_FILE: &str = ".ufs/ufs_index";

/// The four typed arenas carried by every image, in the fixed order they're
/// laid out in (`spec.md` §4.2).
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaKind {
  File = 0,
  Area = 1,
  Node = 2,
  String = 3,
}

/// Number of arena kinds; sizes `sizes[ArenaKind::COUNT]`.
pub const ARENA_KIND_COUNT: usize = 4;

/// Capacity request for a new image's four arenas.
///
/// Mirrors the original's `ufsHeaderSizeRequestStruct` and its
/// `ufsDefaultSizeRequest` default (256 files, 256 areas, 512 nodes, 1024
/// string-pool bytes). The 2x node:area ratio is load-bearing — see
/// `node.rs` for why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaSizes {
  pub files: u64,
  pub areas: u64,
  pub nodes: u64,
  pub string_bytes: u64,
}

impl Default for ArenaSizes {
  fn default() -> Self {
    Self {
      files: 256,
      areas: 256,
      nodes: 512,
      string_bytes: 1024,
    }
  }
}

impl ArenaSizes {
  pub(crate) fn as_array(&self) -> [u64; ARENA_KIND_COUNT] {
    [self.files, self.areas, self.nodes, self.string_bytes]
  }

  pub(crate) fn is_valid(&self) -> bool {
    self.files > 0 && self.areas > 0 && self.nodes > 0 && self.string_bytes > 0
  }
}

/// Tags a [`Id`] with the entity kind it names, resolving the "storage id"
/// tagging scheme left to the implementer by `spec.md` §9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
  File(Id),
  Dir(Id),
}

impl Storage {
  pub fn id(self) -> Id {
    match self {
      Storage::File(id) | Storage::Dir(id) => id,
    }
  }

  pub fn is_dir(self) -> bool {
    matches!(self, Storage::Dir(_))
  }
}
