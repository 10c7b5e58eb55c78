//! Unified status space and error type.
//!
//! `spec.md` §9 notes that the original source carries two distinct status
//! enumerations: the `UFS_STATUS_LIST` X-macro in the public header, and a
//! free-standing set of negative `#define`s in `ufs_defs.h` (which also,
//! confusingly, aliases `UFS_UNKNOWN_ERROR` and `UFS_IMAGE_TOO_SMALL` to the
//! same numeric value). This crate picks one numbering — [`StatusCode`] — and
//! applies it uniformly everywhere, as the spec instructs an implementer to.

use std::cell::Cell;

/// The unified status space (`spec.md` §6), replacing the original's two
/// overlapping C enumerations with one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
  NoError = 0,
  OutOfMemory,
  BadCall,
  ViewContainsDuplicates,
  InvalidAreaInView,
  AlreadyExists,
  DoesNotExist,
  DirectoryIsNotEmpty,
  CannotResolveStorage,
  UnknownError,
  ImageDoesNotExist,
  ImageIsCorrupted,
  ImageTooSmall,
  VersionMismatch,
  CantCreateFile,
  ImageCouldNotSync,
}

/// Parallel array of human-readable status strings, one per [`StatusCode`]
/// variant, in declaration order — the Rust analogue of the source's
/// `ufsStatusStrings`.
pub const STATUS_STRINGS: [&str; 16] = [
  "NO_ERROR",
  "OUT_OF_MEMORY",
  "BAD_CALL",
  "VIEW_CONTAINS_DUPLICATES",
  "INVALID_AREA_IN_VIEW",
  "ALREADY_EXISTS",
  "DOES_NOT_EXIST",
  "DIRECTORY_IS_NOT_EMPTY",
  "CANNOT_RESOLVE_STORAGE",
  "UNKNOWN_ERROR",
  "IMAGE_DOES_NOT_EXIST",
  "IMAGE_IS_CORRUPTED",
  "IMAGE_TOO_SMALL",
  "VERSION_MISMATCH",
  "CANT_CREATE_FILE",
  "IMAGE_COULD_NOT_SYNC",
];

impl StatusCode {
  pub fn as_str(self) -> &'static str {
    STATUS_STRINGS[self as usize]
  }
}

impl std::fmt::Display for StatusCode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

thread_local! {
  /// Mirrors the source's thread-local `ufsErrno`: set as a side effect of
  /// every public entry point, success or failure (`spec.md` §5, §9).
  static LAST_STATUS: Cell<StatusCode> = Cell::new(StatusCode::NoError);
}

/// Records the outcome of the call currently returning. Every public entry
/// point in `crate::Ufs` calls this before returning.
pub(crate) fn set_last_status(status: StatusCode) {
  LAST_STATUS.with(|cell| cell.set(status));
}

/// Reads the status left by the most recent call on this thread, the
/// errno-style alternative to inspecting a `Result` (`spec.md` §9).
pub fn last_status() -> StatusCode {
  LAST_STATUS.with(|cell| cell.get())
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("{0}")]
  Status(StatusCode),
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
  #[error("walkdir error: {0}")]
  WalkDir(#[from] walkdir::Error),
}

impl Error {
  /// The [`StatusCode`] this error corresponds to, for setting the
  /// thread-local status and for callers that only care about the code.
  pub fn status(&self) -> StatusCode {
    match self {
      Error::Status(code) => *code,
      Error::Io(_) => StatusCode::UnknownError,
      Error::WalkDir(_) => StatusCode::UnknownError,
    }
  }
}

impl From<StatusCode> for Error {
  fn from(code: StatusCode) -> Self {
    Error::Status(code)
  }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Runs `f`, records its resulting [`StatusCode`] in the thread-local status
/// cell, and returns its result unchanged. Every public entry point in
/// `crate::Ufs` is wrapped in this so `last_status()` always reflects the
/// most recent call, matching the source's "set on every entry point"
/// contract (`spec.md` §5).
pub(crate) fn with_status<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
  let result = f();
  let status = match &result {
    Ok(_) => StatusCode::NoError,
    Err(e) => e.status(),
  };
  set_last_status(status);
  result
}
