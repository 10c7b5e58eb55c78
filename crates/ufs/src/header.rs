//! Header layout: locating the four typed arenas inside an image.
//!
//! Grounded directly on `original_source/src/ufs_header.c`: the same
//! deterministic offset walk (`mountHeader`/`resolveSize` there), expressed
//! as safe Rust over a byte slice instead of pointer arithmetic over a raw
//! `mmap` region.

use crate::defs::{ArenaKind, ArenaSizes, ARENA_KIND_COUNT, INDEX_VERSION, MAGIC_NUMBER};
use crate::error::{Error, Result, StatusCode};

/// On-disk header, `spec.md` §6 bit-layout. `Pod`/`Zeroable` let us read and
/// write it directly against the mapped bytes with no intermediate copy.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Header {
  pub magic_number: u32,
  pub version: u32,
  pub sizes: [u64; ARENA_KIND_COUNT],
  pub offsets: [u64; ARENA_KIND_COUNT],
}

/// Rounds `val` up to the next multiple of `align` (`align` must be a power
/// of two). Identical to the source's `roundToBoundary`.
pub(crate) fn round_to_boundary(val: u64, align: u64) -> u64 {
  (val + (align - 1)) & !(align - 1)
}

/// The host page size, matching the source's `sysconf(_SC_PAGESIZE)`.
#[cfg(unix)]
fn page_size() -> u64 {
  // SAFETY: sysconf with _SC_PAGESIZE has no preconditions.
  unsafe { libc::sysconf(libc::_SC_PAGESIZE) as u64 }
}

#[cfg(not(unix))]
fn page_size() -> u64 {
  4096
}

/// The layout computed for a given arena size request: where the header
/// sits, where each arena starts, and the total (page-aligned) image size.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
  pub header_offset: u64,
  pub offsets: [u64; ARENA_KIND_COUNT],
  pub total_size: u64,
}

/// Computes the deterministic layout for `sizes`, identical whether the
/// image is being created or re-derived at open (`spec.md` §4.2).
pub fn compute_layout(sizes: &ArenaSizes) -> Layout {
  let mut offset = std::mem::size_of::<u64>() as u64;
  offset = round_to_boundary(offset, std::mem::align_of::<Header>() as u64);
  let header_offset = offset;
  offset += std::mem::size_of::<Header>() as u64;

  let mut offsets = [0u64; ARENA_KIND_COUNT];

  offset = round_to_boundary(offset, std::mem::align_of::<crate::registry::FileRecord>() as u64);
  offsets[ArenaKind::File as usize] = offset;
  offset += std::mem::size_of::<crate::registry::FileRecord>() as u64 * sizes.files;

  offset = round_to_boundary(offset, std::mem::align_of::<crate::registry::AreaRecord>() as u64);
  offsets[ArenaKind::Area as usize] = offset;
  offset += std::mem::size_of::<crate::registry::AreaRecord>() as u64 * sizes.areas;

  offset = round_to_boundary(offset, std::mem::align_of::<crate::node::Node>() as u64);
  offsets[ArenaKind::Node as usize] = offset;
  offset += std::mem::size_of::<crate::node::Node>() as u64 * sizes.nodes;

  offset = round_to_boundary(offset, std::mem::align_of::<u8>() as u64);
  offsets[ArenaKind::String as usize] = offset;
  offset += sizes.string_bytes;

  let total_size = round_to_boundary(offset, page_size());

  Layout {
    header_offset,
    offsets,
    total_size,
  }
}

/// Writes a freshly computed header for `sizes` into `bytes` at the layout's
/// header offset. `bytes` must already be sized to `layout.total_size`.
pub fn write_header(bytes: &mut [u8], sizes: &ArenaSizes, layout: &Layout) {
  let header = Header {
    magic_number: MAGIC_NUMBER,
    version: INDEX_VERSION,
    sizes: sizes.as_array(),
    offsets: layout.offsets,
  };

  let start = layout.header_offset as usize;
  let end = start + std::mem::size_of::<Header>();
  bytes[start..end].copy_from_slice(bytemuck::bytes_of(&header));
}

/// Reads the header out of `bytes` at `header_offset` without validating it.
pub fn read_header(bytes: &[u8], header_offset: u64) -> Header {
  let start = header_offset as usize;
  let end = start + std::mem::size_of::<Header>();
  *bytemuck::from_bytes(&bytes[start..end])
}

/// Validates an image's header (`spec.md` §4.2 "Validation"):
/// 1. the image is large enough to hold at least the header;
/// 2. the magic number matches;
/// 3. the version matches;
/// 4. the image's recorded byte length conforms to the arena layout implied
///    by the header's own `sizes`.
pub fn validate(bytes: &[u8]) -> Result<Header> {
  let min_header_end = {
    let layout = compute_layout(&ArenaSizes {
      files: 1,
      areas: 1,
      nodes: 1,
      string_bytes: 1,
    });
    layout.header_offset as usize + std::mem::size_of::<Header>()
  };

  if bytes.len() < min_header_end {
    return Err(Error::Status(StatusCode::ImageTooSmall));
  }

  let layout = compute_layout(&ArenaSizes::default());
  let header = read_header(bytes, layout.header_offset);

  if header.magic_number != MAGIC_NUMBER {
    return Err(Error::Status(StatusCode::ImageIsCorrupted));
  }

  if header.version != INDEX_VERSION {
    return Err(Error::Status(StatusCode::VersionMismatch));
  }

  let sizes = ArenaSizes {
    files: header.sizes[ArenaKind::File as usize],
    areas: header.sizes[ArenaKind::Area as usize],
    nodes: header.sizes[ArenaKind::Node as usize],
    string_bytes: header.sizes[ArenaKind::String as usize],
  };

  if !sizes.is_valid() {
    return Err(Error::Status(StatusCode::ImageIsCorrupted));
  }

  let recomputed = compute_layout(&sizes);
  if recomputed.offsets != header.offsets || (bytes.len() as u64) < recomputed.total_size {
    return Err(Error::Status(StatusCode::ImageIsCorrupted));
  }

  // Re-read with the image's own sizes: the default-sized probe above is
  // only used to locate the header, which sits at a size-independent offset.
  let header = read_header(bytes, layout.header_offset);
  Ok(header)
}
