use clap::*;
use std::path::PathBuf;
use std::str::FromStr;

use ufs::defs::{Id, Storage};

/// A storage argument on the command line: `file:<id>` or `dir:<id>`,
/// resolving the union-storage tagging `spec.md` §9 leaves to the
/// implementer.
#[derive(Debug, Clone, Copy)]
pub struct StorageArg(pub Storage);

impl FromStr for StorageArg {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (kind, id) = s.split_once(':').ok_or_else(|| format!("expected `file:<id>` or `dir:<id>`, got {s:?}"))?;
    let id: Id = id.parse().map_err(|_| format!("not a valid id: {id:?}"))?;
    match kind {
      "file" => Ok(StorageArg(Storage::File(id))),
      "dir" => Ok(StorageArg(Storage::Dir(id))),
      other => Err(format!("unknown storage kind {other:?}, expected `file` or `dir`")),
    }
  }
}

/// A view argument: a comma-separated list of area ids, `0` for BASE.
/// `spec.md` §4.7's terminator/length cap is enforced by `ufs::Ufs` itself,
/// not the CLI, so no trailing `-1` is needed here.
#[derive(Debug, Clone)]
pub struct ViewArg(pub Vec<Id>);

impl FromStr for ViewArg {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    s.split(',')
      .map(|part| part.trim().parse::<Id>().map_err(|_| format!("not a valid area id: {part:?}")))
      .collect::<Result<Vec<_>, _>>()
      .map(ViewArg)
  }
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Create a fresh image layered over `root` (`spec.md` §4.1 `create`).
  Init {
    root: PathBuf,
    #[clap(long, default_value_t = 256)]
    files: u64,
    #[clap(long, default_value_t = 256)]
    areas: u64,
    #[clap(long, default_value_t = 512)]
    nodes: u64,
    #[clap(long = "string-bytes", default_value_t = 1024)]
    string_bytes: u64,
  },
  /// `addDirectory`.
  Mkdir { root: PathBuf, name: String },
  /// `addFile`.
  Mkfile { root: PathBuf, dir: Id, name: String },
  /// `addArea`.
  Mkarea { root: PathBuf, name: String },
  /// Runs a sequence of mapping-dependent operations (`addMapping`,
  /// `probeMapping`, `resolveStorageInView`, `iterateDirInView`,
  /// `collapse`) against a single open image.
  ///
  /// Mappings live only in memory for the process that adds them
  /// (`spec.md` §6's image format has no on-disk mapping arena, matching
  /// `original_source`'s treatment of `ufsAddMapping` as a pure runtime
  /// relation), so a mapping added by one `ufs` invocation is invisible to
  /// the next. `overlay` reads one operation per line from `--script` (or
  /// stdin if omitted) and runs all of them against the same `Ufs` handle,
  /// so `map` followed by `probe`/`resolve`/`ls`/`collapse` actually see
  /// each other. Blank lines and lines starting with `#` are skipped. Line
  /// syntax, one operation per line:
  ///
  ///   map AREA file:ID|dir:ID
  ///   probe AREA file:ID|dir:ID
  ///   resolve file:ID|dir:ID AREA,AREA,...
  ///   ls DIR AREA,AREA,...
  ///   collapse AREA,AREA,...
  Overlay {
    root: PathBuf,
    #[clap(long)]
    script: Option<PathBuf>,
  },
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
  #[clap(subcommand)]
  pub command: Command,
}

pub fn parse() -> Cli {
  Cli::parse()
}
