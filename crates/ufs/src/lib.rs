//! Union file system storage backend.
//!
//! Models a union view over a tree of named storage entities. Callers
//! register directories, files, and named areas that project subsets of the
//! storage, compose ordered lists of areas ("views") that behave as stacked
//! overlays over an underlying external filesystem, and resolve lookups,
//! enumerate directory contents, and collapse overlays through those views.
//! State is persisted in a single page-aligned, memory-mapped image file.

pub mod defs;
pub mod error;
pub mod external;
pub mod header;
pub mod image;
pub mod mapping;
pub mod node;
pub mod registry;
pub mod resolver;
pub mod string_pool;
pub mod view;

mod prelude {
  pub use crate::error::{Error, Result, StatusCode};
}

use std::path::{Path, PathBuf};

use defs::{ArenaKind, ArenaSizes, Id, Storage, BASE};
use error::{with_status, Error, Result, StatusCode};
pub use error::{last_status, StatusCode as Status};
use external::{ExternalFs, HostFs};
use header::Layout;
use image::Image;
use mapping::MappingSet;
use node::{Node, NodeArena};
use registry::{AreaRecord, FileRecord, Registry, SLOT_IN_USE, SLOT_RETIRED};
use string_pool::StringPool;
use view::View;

/// The top-level handle over an open or freshly created image, generic over
/// the external filesystem collaborator so callers (and tests) can
/// substitute a double for the host filesystem (`spec.md` §6, "Lifecycle").
pub struct Ufs<E: ExternalFs = HostFs> {
  image: Image,
  sizes: ArenaSizes,
  layout: Layout,
  registry: Registry,
  mappings: MappingSet,
  external: E,
}

impl Ufs<HostFs> {
  /// Creates a new image at `image_path` and layers it over `external_root`
  /// on the host filesystem. Fails `ALREADY_EXISTS` if `image_path` already
  /// names a file.
  pub fn create(image_path: &Path, external_root: impl Into<PathBuf>, sizes: ArenaSizes) -> Result<Self> {
    Self::create_with(image_path, HostFs::new(external_root), sizes)
  }

  /// Opens an existing image at `image_path`, layered over `external_root`,
  /// reconstructing the in-memory name tables by scanning its arenas.
  pub fn open(image_path: &Path, external_root: impl Into<PathBuf>) -> Result<Self> {
    Self::open_with(image_path, HostFs::new(external_root))
  }
}

impl<E: ExternalFs> Ufs<E> {
  /// Same as [`Ufs::create`] but with an arbitrary external filesystem
  /// collaborator, for tests that want a double instead of the host FS.
  pub fn create_with(image_path: &Path, external: E, sizes: ArenaSizes) -> Result<Self> {
    with_status(|| {
      let image = Image::create(image_path, &sizes)?;
      let layout = header::compute_layout(&sizes);
      Ok(Self {
        image,
        sizes,
        layout,
        registry: Registry::new(),
        mappings: MappingSet::new(),
        external,
      })
    })
  }

  /// Same as [`Ufs::open`] but with an arbitrary external filesystem
  /// collaborator.
  pub fn open_with(image_path: &Path, external: E) -> Result<Self> {
    with_status(|| {
      let image = Image::open(image_path)?;
      let header = header::validate(image.as_bytes())?;
      let sizes = ArenaSizes {
        files: header.sizes[ArenaKind::File as usize],
        areas: header.sizes[ArenaKind::Area as usize],
        nodes: header.sizes[ArenaKind::Node as usize],
        string_bytes: header.sizes[ArenaKind::String as usize],
      };
      let layout = header::compute_layout(&sizes);
      let mut ufs = Self {
        image,
        sizes,
        layout,
        registry: Registry::new(),
        mappings: MappingSet::new(),
        external,
      };
      ufs.rebuild_registry();
      Ok(ufs)
    })
  }

  /// Flushes the image to disk (`spec.md` §4.1 `sync`).
  pub fn sync(&self) -> Result<()> {
    with_status(|| self.image.sync())
  }

  /// Releases the handle. Matches `destroy(Handle)` in `spec.md` §6: a
  /// no-op beyond dropping the mapping, since `release` carries no flush
  /// obligation of its own.
  pub fn destroy(self) {
    drop(self);
  }

  // -- arena accessors --------------------------------------------------

  fn file_records(&self) -> &[FileRecord] {
    let start = self.layout.offsets[ArenaKind::File as usize] as usize;
    let end = start + self.sizes.files as usize * std::mem::size_of::<FileRecord>();
    bytemuck::cast_slice(&self.image.as_bytes()[start..end])
  }

  fn file_records_mut(&mut self) -> &mut [FileRecord] {
    let start = self.layout.offsets[ArenaKind::File as usize] as usize;
    let end = start + self.sizes.files as usize * std::mem::size_of::<FileRecord>();
    bytemuck::cast_slice_mut(&mut self.image.as_bytes_mut()[start..end])
  }

  fn area_records(&self) -> &[AreaRecord] {
    let start = self.layout.offsets[ArenaKind::Area as usize] as usize;
    let end = start + self.sizes.areas as usize * std::mem::size_of::<AreaRecord>();
    bytemuck::cast_slice(&self.image.as_bytes()[start..end])
  }

  fn area_records_mut(&mut self) -> &mut [AreaRecord] {
    let start = self.layout.offsets[ArenaKind::Area as usize] as usize;
    let end = start + self.sizes.areas as usize * std::mem::size_of::<AreaRecord>();
    bytemuck::cast_slice_mut(&mut self.image.as_bytes_mut()[start..end])
  }

  fn nodes_mut(&mut self) -> &mut [Node] {
    let start = self.layout.offsets[ArenaKind::Node as usize] as usize;
    let end = start + self.sizes.nodes as usize * std::mem::size_of::<Node>();
    bytemuck::cast_slice_mut(&mut self.image.as_bytes_mut()[start..end])
  }

  fn node_arena(&mut self) -> NodeArena<'_> {
    let root_boundary = self.sizes.areas;
    NodeArena::new(self.nodes_mut(), root_boundary)
  }

  fn string_bytes_mut(&mut self) -> &mut [u8] {
    let start = self.layout.offsets[ArenaKind::String as usize] as usize;
    let end = start + self.sizes.string_bytes as usize;
    &mut self.image.as_bytes_mut()[start..end]
  }

  fn string_pool(&mut self) -> StringPool<'_> {
    let file_records = self.file_records().to_vec();
    let area_records = self.area_records().to_vec();
    let string_start = self.layout.offsets[ArenaKind::String as usize];
    let bytes = self.string_bytes_mut();
    let cursor = string_pool::recover_cursor(
      bytes,
      file_records
        .iter()
        .filter(|r| r.in_use == SLOT_IN_USE)
        .map(|r| r.str_offset - string_start)
        .chain(area_records.iter().filter(|r| r.in_use == SLOT_IN_USE).map(|r| r.str_offset - string_start)),
    );
    StringPool::new(bytes, cursor)
  }

  fn rebuild_registry(&mut self) {
    let string_start = self.layout.offsets[ArenaKind::String as usize];
    let mut string_bytes = self.string_bytes_mut().to_vec();
    let pool = StringPool::new(&mut string_bytes, 0);
    let file_records = self.file_records().to_vec();
    let area_records = self.area_records().to_vec();

    // Rebuild against absolute offsets: the pool itself reads relative to
    // its own slice, but records store absolute offsets into the image.
    let mut files = std::collections::HashMap::new();
    let mut areas = std::collections::HashMap::new();
    for (idx, record) in file_records.iter().enumerate() {
      if record.in_use == SLOT_IN_USE {
        let name = pool.read(record.str_offset - string_start).to_owned();
        files.insert((record.parent_dir, name), idx as Id);
      }
    }
    for (idx, record) in area_records.iter().enumerate() {
      if record.in_use == SLOT_IN_USE {
        let name = pool.read(record.str_offset - string_start).to_owned();
        areas.insert(name, idx as Id);
      }
    }
    self.registry.files = files;
    self.registry.areas = areas;
  }

  // -- entity registry ----------------------------------------------------

  /// `addArea(name)`.
  pub fn add_area(&mut self, name: &str) -> Result<Id> {
    with_status(|| {
      if self.registry.areas.contains_key(name) {
        return Err(Error::Status(StatusCode::AlreadyExists));
      }
      let id = registry::allocate(self.area_records_mut(), |r| r.in_use != 0)?;
      let offset = self.intern(name)?;
      self.area_records_mut()[id as usize].in_use = 1;
      self.area_records_mut()[id as usize].str_offset = offset;
      self.registry.areas.insert(name.to_owned(), id);
      log::debug!("added area {name:?} as id {id}");
      Ok(id)
    })
  }

  /// `addDirectory(name)`. A directory is an area with a directory index
  /// rooted at the matching node slot (`spec.md` §3 "structurally a
  /// specialisation of area").
  pub fn add_directory(&mut self, name: &str) -> Result<Id> {
    with_status(|| {
      let id = self.add_area(name)?;
      self.node_arena().clear_root(id);
      Ok(id)
    })
  }

  /// `addFile(parentDir, name)`.
  pub fn add_file(&mut self, parent_dir: Id, name: &str) -> Result<Id> {
    with_status(|| {
      if !self.area_in_use(parent_dir) {
        return Err(Error::Status(StatusCode::DoesNotExist));
      }
      if self.registry.files.contains_key(&(parent_dir, name.to_owned())) {
        return Err(Error::Status(StatusCode::AlreadyExists));
      }
      let id = registry::allocate(self.file_records_mut(), |r| r.in_use != 0)?;
      let offset = self.intern(name)?;
      let record = &mut self.file_records_mut()[id as usize];
      record.in_use = 1;
      record.str_offset = offset;
      record.parent_dir = parent_dir;
      self.registry.files.insert((parent_dir, name.to_owned()), id);
      self.node_arena().insert(parent_dir, id)?;
      log::debug!("added file {name:?} in directory {parent_dir} as id {id}");
      Ok(id)
    })
  }

  /// `getArea(name)`.
  pub fn get_area(&self, name: &str) -> Result<Id> {
    self.registry.areas.get(name).copied().ok_or(Error::Status(StatusCode::DoesNotExist))
  }

  /// `getDirectory(name)`: identical lookup to `getArea`, since directories
  /// share the area name table.
  pub fn get_directory(&self, name: &str) -> Result<Id> {
    self.get_area(name)
  }

  /// `getFile(parentDir, name)`. Resolves only the exact directory id
  /// supplied, not a directory reached indirectly through a view (`spec.md`
  /// §9, resolved open question).
  pub fn get_file(&self, parent_dir: Id, name: &str) -> Result<Id> {
    self
      .registry
      .files
      .get(&(parent_dir, name.to_owned()))
      .copied()
      .ok_or(Error::Status(StatusCode::DoesNotExist))
  }

  /// `removeDirectory(id)`. Requires `files_in_dir(id) = ∅` (I3).
  pub fn remove_directory(&mut self, id: Id) -> Result<()> {
    with_status(|| {
      if !self.area_in_use(id) {
        return Err(Error::Status(StatusCode::DoesNotExist));
      }
      if !self.node_arena().iter(id).is_empty() {
        return Err(Error::Status(StatusCode::DirectoryIsNotEmpty));
      }
      self.remove_area_record(id)
    })
  }

  /// `removeFile(id)`: unlinks from its parent directory's index before
  /// clearing the slot.
  pub fn remove_file(&mut self, id: Id) -> Result<()> {
    with_status(|| {
      let record = *self
        .file_records()
        .get(id as usize)
        .filter(|r| r.in_use == SLOT_IN_USE)
        .ok_or(Error::Status(StatusCode::DoesNotExist))?;

      self.node_arena().remove(record.parent_dir, id);
      self.mappings.remove_by_storage(Storage::File(id));

      let name = self.name_of_file(&record);
      self.registry.files.remove(&(record.parent_dir, name));
      self.file_records_mut()[id as usize].in_use = SLOT_RETIRED;
      log::debug!("removed file {id}");
      Ok(())
    })
  }

  /// `removeArea(id)`: purges every mapping with `.area == id` first.
  pub fn remove_area(&mut self, id: Id) -> Result<()> {
    with_status(|| {
      if !self.area_in_use(id) {
        return Err(Error::Status(StatusCode::DoesNotExist));
      }
      self.remove_area_record(id)
    })
  }

  fn remove_area_record(&mut self, id: Id) -> Result<()> {
    self.mappings.remove_by_area(id);
    let name = self.name_of_area(id);
    self.registry.areas.remove(&name);
    self.area_records_mut()[id as usize].in_use = SLOT_RETIRED;
    log::debug!("removed area {id}");
    Ok(())
  }

  fn area_in_use(&self, id: Id) -> bool {
    id != BASE && (id as usize) < self.area_records().len() && self.area_records()[id as usize].in_use == SLOT_IN_USE
  }

  fn name_of_file(&self, record: &FileRecord) -> String {
    let string_start = self.layout.offsets[ArenaKind::String as usize];
    let bytes = &self.image.as_bytes()[string_start as usize..];
    read_nul_terminated(bytes, record.str_offset - string_start)
  }

  fn name_of_area(&self, id: Id) -> String {
    let record = self.area_records()[id as usize];
    let string_start = self.layout.offsets[ArenaKind::String as usize];
    let bytes = &self.image.as_bytes()[string_start as usize..];
    read_nul_terminated(bytes, record.str_offset - string_start)
  }

  fn intern(&mut self, name: &str) -> Result<u64> {
    let string_start = self.layout.offsets[ArenaKind::String as usize];
    let relative = self.string_pool().intern(name)?;
    Ok(string_start + relative)
  }

  // -- mappings -------------------------------------------------------

  /// `addMapping(area, storage)`.
  pub fn add_mapping(&mut self, area: Id, storage: Storage) -> Result<()> {
    with_status(|| {
      if area == BASE {
        return Err(Error::Status(StatusCode::BadCall));
      }
      if !self.area_in_use(area) || !self.storage_in_use(storage) {
        return Err(Error::Status(StatusCode::DoesNotExist));
      }
      if self.mappings.probe(area, storage) {
        return Err(Error::Status(StatusCode::AlreadyExists));
      }
      self.mappings.add(area, storage)
    })
  }

  /// `probeMapping(area, storage)`.
  pub fn probe_mapping(&self, area: Id, storage: Storage) -> Result<()> {
    with_status(|| {
      if self.mappings.probe(area, storage) {
        Ok(())
      } else {
        Err(Error::Status(StatusCode::DoesNotExist))
      }
    })
  }

  fn storage_in_use(&self, storage: Storage) -> bool {
    match storage {
      Storage::File(id) => {
        (id as usize) < self.file_records().len() && self.file_records()[id as usize].in_use == SLOT_IN_USE
      }
      Storage::Dir(id) => self.area_in_use(id),
    }
  }

  // -- views ------------------------------------------------------------

  fn view_from(&self, raw: &[Id]) -> Result<View> {
    View::validate(raw, self.area_records())
  }

  /// `resolveStorageInView(V, s)`.
  pub fn resolve_storage_in_view(&self, raw_view: &[Id], storage: Storage) -> Result<Id> {
    with_status(|| {
      let view = self.view_from(raw_view)?;
      resolver::resolve_storage_in_view(&view, &self.mappings, storage)
    })
  }

  /// `iterateDirInView(V, d, f, userData)`. `f` receives `(storageId,
  /// currEntry, numEntries)`; a non-zero return halts iteration and that
  /// value becomes the call's own status.
  pub fn iterate_dir_in_view(
    &mut self,
    raw_view: &[Id],
    dir: Id,
    mut f: impl FnMut(Id, usize, usize) -> i32,
  ) -> Result<()> {
    with_status(|| {
      let view = self.view_from(raw_view)?;
      if !self.area_in_use(dir) {
        return Err(Error::Status(StatusCode::DoesNotExist));
      }
      let dir_files = self.node_arena().iter(dir);

      let external_files = if view.areas().contains(&BASE) {
        let dir_name = self.name_of_area(dir);
        let listed = self.external.list_files(Path::new(&dir_name))?;
        dir_files
          .iter()
          .copied()
          .filter(|&f| {
            let record = self.file_records()[f as usize];
            listed.contains(&self.name_of_file(&record))
          })
          .collect::<Vec<_>>()
      } else {
        Vec::new()
      };

      let union = resolver::iterate_dir_in_view(&view, &self.mappings, &dir_files, &external_files);
      let num_entries = union.len();
      for (idx, storage_id) in union.into_iter().enumerate() {
        let status = f(storage_id, idx, num_entries);
        if status != 0 {
          return Err(Error::Status(StatusCode::UnknownError));
        }
      }
      Ok(())
    })
  }

  /// `collapse(V)`.
  pub fn collapse(&mut self, raw_view: &[Id]) -> Result<()> {
    with_status(|| {
      let view = self.view_from(raw_view)?;
      let external = &self.external;
      let file_records = self.file_records().to_vec();
      let area_records = self.area_records().to_vec();
      let string_start = self.layout.offsets[ArenaKind::String as usize];
      let image_bytes = self.image.as_bytes();

      resolver::collapse(&view, &mut self.mappings, |storage| {
        let path = storage_path(storage, &file_records, &area_records, image_bytes, string_start);
        match storage {
          Storage::File(_) => external.create_if_absent(&path),
          Storage::Dir(_) => external.create_dir_if_absent(&path),
        }
      })
    })
  }
}

fn read_nul_terminated(bytes: &[u8], offset: u64) -> String {
  let start = offset as usize;
  let rest = &bytes[start..];
  let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
  String::from_utf8_lossy(&rest[..len]).into_owned()
}

fn storage_path(
  storage: Storage,
  file_records: &[FileRecord],
  area_records: &[AreaRecord],
  image_bytes: &[u8],
  string_start: u64,
) -> PathBuf {
  let bytes = &image_bytes[string_start as usize..];
  match storage {
    Storage::File(id) => {
      let record = file_records[id as usize];
      PathBuf::from(read_nul_terminated(bytes, record.str_offset - string_start))
    }
    Storage::Dir(id) => {
      let record = area_records[id as usize];
      PathBuf::from(read_nul_terminated(bytes, record.str_offset - string_start))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use std::collections::HashMap;

  /// An in-memory external filesystem double for tests that exercise BASE
  /// resolution, iteration, and collapse without touching disk.
  #[derive(Default)]
  struct FakeExternalFs {
    files: RefCell<HashMap<PathBuf, ()>>,
    dirs: RefCell<HashMap<PathBuf, Vec<String>>>,
    created_dirs: RefCell<Vec<PathBuf>>,
  }

  impl ExternalFs for FakeExternalFs {
    fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
      Ok(self.dirs.borrow().get(dir).cloned().unwrap_or_default())
    }
    fn create_if_absent(&self, path: &Path) -> Result<()> {
      self.files.borrow_mut().insert(path.to_owned(), ());
      Ok(())
    }
    fn create_dir_if_absent(&self, path: &Path) -> Result<()> {
      self.created_dirs.borrow_mut().push(path.to_owned());
      Ok(())
    }
    fn remove(&self, path: &Path) -> Result<()> {
      self.files.borrow_mut().remove(path);
      Ok(())
    }
  }

  fn fresh() -> (tempfile::TempDir, Ufs<FakeExternalFs>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ufs_index");
    let ufs = Ufs::create_with(&path, FakeExternalFs::default(), ArenaSizes::default()).unwrap();
    (dir, ufs)
  }

  #[test]
  fn basic_resolve_scenario() {
    let (_dir, mut ufs) = fresh();
    let a = ufs.add_area("overlay").unwrap();
    let d = ufs.add_directory("src").unwrap();
    let f = ufs.add_file(d, "main").unwrap();
    ufs.add_mapping(a, Storage::File(f)).unwrap();

    let view = [a, BASE, -1];
    assert_eq!(ufs.resolve_storage_in_view(&view, Storage::File(f)).unwrap(), a);
    assert_eq!(ufs.resolve_storage_in_view(&view, Storage::Dir(d)).unwrap(), BASE);
  }

  #[test]
  fn shadowing_scenario() {
    let (_dir, mut ufs) = fresh();
    let d = ufs.add_directory("src").unwrap();
    let f = ufs.add_file(d, "main").unwrap();
    let a1 = ufs.add_area("lower").unwrap();
    let a2 = ufs.add_area("upper").unwrap();
    ufs.add_mapping(a1, Storage::File(f)).unwrap();
    ufs.add_mapping(a2, Storage::File(f)).unwrap();

    assert_eq!(ufs.resolve_storage_in_view(&[a2, a1, BASE, -1], Storage::File(f)).unwrap(), a2);
    assert_eq!(ufs.resolve_storage_in_view(&[a1, a2, BASE, -1], Storage::File(f)).unwrap(), a1);
  }

  #[test]
  fn iteration_union_scenario() {
    let (_dir, mut ufs) = fresh();
    let d = ufs.add_directory("src").unwrap();
    let f1 = ufs.add_file(d, "one").unwrap();
    let f2 = ufs.add_file(d, "two").unwrap();
    let a1 = ufs.add_area("a1").unwrap();
    let a2 = ufs.add_area("a2").unwrap();
    ufs.add_mapping(a1, Storage::File(f1)).unwrap();
    ufs.add_mapping(a2, Storage::File(f2)).unwrap();

    let mut seen = Vec::new();
    let mut last_total = 0;
    ufs
      .iterate_dir_in_view(&[a1, a2, -1], d, |id, _current, total| {
        seen.push(id);
        last_total = total;
        0
      })
      .unwrap();
    seen.sort();
    assert_eq!(seen, vec![f1, f2]);
    assert_eq!(last_total, 2);
  }

  #[test]
  fn duplicate_view_entries_are_rejected_with_no_side_effects() {
    let (_dir, mut ufs) = fresh();
    let a = ufs.add_area("x").unwrap();
    let err = ufs.resolve_storage_in_view(&[a, a, -1], Storage::Dir(a)).unwrap_err();
    assert_eq!(err.status(), StatusCode::ViewContainsDuplicates);
  }

  #[test]
  fn collapse_to_non_base_scenario() {
    let (_dir, mut ufs) = fresh();
    let d = ufs.add_directory("src").unwrap();
    let f1 = ufs.add_file(d, "one").unwrap();
    let f2 = ufs.add_file(d, "two").unwrap();
    let a1 = ufs.add_area("a1").unwrap();
    let a2 = ufs.add_area("a2").unwrap();
    ufs.add_mapping(a1, Storage::File(f1)).unwrap();
    ufs.add_mapping(a2, Storage::File(f2)).unwrap();

    ufs.collapse(&[a1, a2, -1]).unwrap();
    ufs.probe_mapping(a2, Storage::File(f1)).unwrap();
    ufs.probe_mapping(a2, Storage::File(f2)).unwrap();
    assert_eq!(
      ufs.probe_mapping(a1, Storage::File(f1)).unwrap_err().status(),
      StatusCode::DoesNotExist
    );
  }

  #[test]
  fn persistence_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ufs_index");
    let external = dir.path().join("root");
    let id_before = {
      let mut ufs = Ufs::create(&path, &external, ArenaSizes::default()).unwrap();
      let id = ufs.add_area("x").unwrap();
      ufs.sync().unwrap();
      id
    };
    let reopened = Ufs::open(&path, &external).unwrap();
    assert_eq!(reopened.get_area("x").unwrap(), id_before);
  }

  #[test]
  fn remove_directory_requires_empty() {
    let (_dir, mut ufs) = fresh();
    let d = ufs.add_directory("src").unwrap();
    ufs.add_file(d, "f").unwrap();
    let err = ufs.remove_directory(d).unwrap_err();
    assert_eq!(err.status(), StatusCode::DirectoryIsNotEmpty);
  }

  #[test]
  fn remove_area_purges_mappings() {
    let (_dir, mut ufs) = fresh();
    let d = ufs.add_directory("src").unwrap();
    let f = ufs.add_file(d, "f").unwrap();
    let a = ufs.add_area("a").unwrap();
    ufs.add_mapping(a, Storage::File(f)).unwrap();
    ufs.remove_area(a).unwrap();
    assert_eq!(ufs.probe_mapping(a, Storage::File(f)).unwrap_err().status(), StatusCode::DoesNotExist);
  }

  #[test]
  fn add_mapping_is_not_idempotent() {
    let (_dir, mut ufs) = fresh();
    let d = ufs.add_directory("src").unwrap();
    let f = ufs.add_file(d, "f").unwrap();
    let a = ufs.add_area("a").unwrap();
    ufs.add_mapping(a, Storage::File(f)).unwrap();
    let err = ufs.add_mapping(a, Storage::File(f)).unwrap_err();
    assert_eq!(err.status(), StatusCode::AlreadyExists);
  }

  #[test]
  fn removed_area_id_is_never_reissued() {
    let (_dir, mut ufs) = fresh();
    let a = ufs.add_area("a").unwrap();
    ufs.remove_area(a).unwrap();
    let b = ufs.add_area("b").unwrap();
    assert_ne!(a, b);
  }

  #[test]
  fn removed_file_id_is_never_reissued() {
    let (_dir, mut ufs) = fresh();
    let d = ufs.add_directory("src").unwrap();
    let f1 = ufs.add_file(d, "one").unwrap();
    ufs.remove_file(f1).unwrap();
    let f2 = ufs.add_file(d, "two").unwrap();
    assert_ne!(f1, f2);
  }

  #[test]
  fn iterate_dir_in_view_rejects_unknown_directory() {
    let (_dir, mut ufs) = fresh();
    let err = ufs.iterate_dir_in_view(&[BASE, -1], 999, |_, _, _| 0).unwrap_err();
    assert_eq!(err.status(), StatusCode::DoesNotExist);
  }

  #[test]
  fn collapse_of_a_directory_mapping_materialises_under_its_real_name() {
    let (_dir, mut ufs) = fresh();
    let sub = ufs.add_directory("sub").unwrap();
    let a = ufs.add_area("overlay").unwrap();
    ufs.add_mapping(a, Storage::Dir(sub)).unwrap();

    ufs.collapse(&[a, BASE, -1]).unwrap();
    assert_eq!(ufs.external.created_dirs.borrow().as_slice(), &[PathBuf::from("sub")]);
    assert_eq!(ufs.probe_mapping(a, Storage::Dir(sub)).unwrap_err().status(), StatusCode::DoesNotExist);
  }
}
