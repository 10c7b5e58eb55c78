mod cli;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::str::FromStr;

use cli::{StorageArg, ViewArg};
use ufs::defs::{ArenaSizes, Storage, UFS_IMAGE_FILE};
use ufs::error::Error;
use ufs::Ufs;

fn image_path(root: &std::path::Path) -> PathBuf {
  root.join(UFS_IMAGE_FILE)
}

fn storage_label(storage: Storage) -> String {
  match storage {
    Storage::File(id) => format!("file:{id}"),
    Storage::Dir(id) => format!("dir:{id}"),
  }
}

/// Runs one `overlay` script line against `ufs`. Returns an error for a
/// malformed line or a failed operation; the caller decides whether that
/// aborts the whole script.
fn run_overlay_line(ufs: &mut Ufs, line: &str) -> Result<(), Error> {
  let mut parts = line.split_whitespace();
  let op = parts.next().ok_or(Error::Status(ufs::Status::BadCall))?;

  match op {
    "map" => {
      let area = parts.next().and_then(|s| s.parse().ok()).ok_or(Error::Status(ufs::Status::BadCall))?;
      let storage = parts.next().and_then(|s| StorageArg::from_str(s).ok()).ok_or(Error::Status(ufs::Status::BadCall))?;
      ufs.add_mapping(area, storage.0)?;
    }
    "probe" => {
      let area = parts.next().and_then(|s| s.parse().ok()).ok_or(Error::Status(ufs::Status::BadCall))?;
      let storage = parts.next().and_then(|s| StorageArg::from_str(s).ok()).ok_or(Error::Status(ufs::Status::BadCall))?;
      match ufs.probe_mapping(area, storage.0) {
        Ok(()) => println!("mapped"),
        Err(e) => {
          println!("not mapped ({})", e.status());
          return Err(e);
        }
      }
    }
    "resolve" => {
      let storage = parts.next().and_then(|s| StorageArg::from_str(s).ok()).ok_or(Error::Status(ufs::Status::BadCall))?;
      let view = parts.next().and_then(|s| ViewArg::from_str(s).ok()).ok_or(Error::Status(ufs::Status::BadCall))?;
      let area = ufs.resolve_storage_in_view(&view.0, storage.0)?;
      println!("{area}");
    }
    "ls" => {
      let dir = parts.next().and_then(|s| s.parse().ok()).ok_or(Error::Status(ufs::Status::BadCall))?;
      let view = parts.next().and_then(|s| ViewArg::from_str(s).ok()).ok_or(Error::Status(ufs::Status::BadCall))?;
      ufs.iterate_dir_in_view(&view.0, dir, |id, _current, _total| {
        println!("{}", storage_label(Storage::File(id)));
        0
      })?;
    }
    "collapse" => {
      let view = parts.next().and_then(|s| ViewArg::from_str(s).ok()).ok_or(Error::Status(ufs::Status::BadCall))?;
      ufs.collapse(&view.0)?;
    }
    other => {
      eprintln!("unknown overlay operation {other:?}");
      return Err(Error::Status(ufs::Status::BadCall));
    }
  }
  Ok(())
}

fn main() -> Result<(), Error> {
  pretty_env_logger::init();

  let cli = cli::parse();

  match cli.command {
    cli::Command::Init { root, files, areas, nodes, string_bytes } => {
      let sizes = ArenaSizes { files, areas, nodes, string_bytes };
      let mut ufs = Ufs::create(&image_path(&root), &root, sizes)?;
      ufs.sync()?;
      log::info!("initialised ufs image under {}", root.display());
    }
    cli::Command::Mkdir { root, name } => {
      let mut ufs = Ufs::open(&image_path(&root), &root)?;
      let id = ufs.add_directory(&name)?;
      ufs.sync()?;
      println!("{id}");
    }
    cli::Command::Mkfile { root, dir, name } => {
      let mut ufs = Ufs::open(&image_path(&root), &root)?;
      let id = ufs.add_file(dir, &name)?;
      ufs.sync()?;
      println!("{id}");
    }
    cli::Command::Mkarea { root, name } => {
      let mut ufs = Ufs::open(&image_path(&root), &root)?;
      let id = ufs.add_area(&name)?;
      ufs.sync()?;
      println!("{id}");
    }
    cli::Command::Overlay { root, script } => {
      let mut ufs = Ufs::open(&image_path(&root), &root)?;

      let lines: Box<dyn Iterator<Item = io::Result<String>>> = match &script {
        Some(path) => Box::new(BufReader::new(File::open(path)?).lines()),
        None => Box::new(BufReader::new(io::stdin()).lines()),
      };

      for line in lines {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
          continue;
        }
        run_overlay_line(&mut ufs, line)?;
      }

      ufs.sync()?;
    }
  }

  Ok(())
}
