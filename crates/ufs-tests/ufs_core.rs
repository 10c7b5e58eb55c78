//! Black-box coverage of `spec.md` §8's literal end-to-end scenarios and
//! boundary conditions, driven entirely through `ufs`'s public surface
//! against the real host filesystem (`ufs::Ufs<ufs::external::HostFs>`).

use ufs::defs::{ArenaSizes, Storage, BASE, VIEW_MAX};
use ufs::error::StatusCode;
use ufs::Ufs;

fn fresh() -> (tempfile::TempDir, Ufs) {
  let dir = tempfile::tempdir().unwrap();
  let image = dir.path().join("image");
  let root = dir.path().join("root");
  let ufs = Ufs::create(&image, &root, ArenaSizes::default()).unwrap();
  (dir, ufs)
}

#[test]
fn scenario_basic_resolve() {
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
fn scenario_shadowing() {
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
fn scenario_iteration_union() {
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
fn scenario_duplicate_view_entries_are_rejected() {
  let (_dir, mut ufs) = fresh();
  let a = ufs.add_area("x").unwrap();
  let err = ufs.resolve_storage_in_view(&[a, a, -1], Storage::Dir(a)).unwrap_err();
  assert_eq!(err.status(), StatusCode::ViewContainsDuplicates);
}

#[test]
fn scenario_collapse_to_non_base() {
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
  assert_eq!(ufs.probe_mapping(a1, Storage::File(f1)).unwrap_err().status(), StatusCode::DoesNotExist);
}

#[test]
fn scenario_collapse_to_base_materialises_on_the_host_filesystem() {
  let dir = tempfile::tempdir().unwrap();
  let image = dir.path().join("image");
  let root = dir.path().join("root");
  let mut ufs = Ufs::create(&image, &root, ArenaSizes::default()).unwrap();
  let d = ufs.add_directory("src").unwrap();
  let f = ufs.add_file(d, "main").unwrap();
  let a = ufs.add_area("overlay").unwrap();
  ufs.add_mapping(a, Storage::File(f)).unwrap();

  ufs.collapse(&[a, BASE, -1]).unwrap();
  assert!(root.join("main").exists());
  assert_eq!(ufs.probe_mapping(a, Storage::File(f)).unwrap_err().status(), StatusCode::DoesNotExist);
}

#[test]
fn scenario_persistence_round_trip() {
  let dir = tempfile::tempdir().unwrap();
  let image = dir.path().join("image");
  let root = dir.path().join("root");
  let area_before = {
    let mut ufs = Ufs::create(&image, &root, ArenaSizes::default()).unwrap();
    let id = ufs.add_area("x").unwrap();
    ufs.sync().unwrap();
    id
  };
  let reopened = Ufs::open(&image, &root).unwrap();
  assert_eq!(reopened.get_area("x").unwrap(), area_before);
}

#[test]
fn empty_view_resolves_nothing() {
  let (_dir, mut ufs) = fresh();
  let d = ufs.add_directory("src").unwrap();
  let f = ufs.add_file(d, "main").unwrap();
  let err = ufs.resolve_storage_in_view(&[-1], Storage::File(f)).unwrap_err();
  assert_eq!(err.status(), StatusCode::CannotResolveStorage);
}

#[test]
fn duplicate_mapping_is_not_idempotent() {
  let (_dir, mut ufs) = fresh();
  let d = ufs.add_directory("src").unwrap();
  let f = ufs.add_file(d, "main").unwrap();
  let a = ufs.add_area("a").unwrap();
  ufs.add_mapping(a, Storage::File(f)).unwrap();
  let err = ufs.add_mapping(a, Storage::File(f)).unwrap_err();
  assert_eq!(err.status(), StatusCode::AlreadyExists);
}

#[test]
fn collapse_is_idempotent_on_repeated_calls() {
  let (_dir, mut ufs) = fresh();
  let d = ufs.add_directory("src").unwrap();
  let f1 = ufs.add_file(d, "one").unwrap();
  let f2 = ufs.add_file(d, "two").unwrap();
  let a1 = ufs.add_area("a1").unwrap();
  let a2 = ufs.add_area("a2").unwrap();
  ufs.add_mapping(a1, Storage::File(f1)).unwrap();
  ufs.add_mapping(a2, Storage::File(f2)).unwrap();

  ufs.collapse(&[a1, a2, -1]).unwrap();
  ufs.collapse(&[a1, a2, -1]).unwrap();
  ufs.probe_mapping(a2, Storage::File(f1)).unwrap();
  ufs.probe_mapping(a2, Storage::File(f2)).unwrap();
}

#[test]
fn view_of_view_max_length_without_terminator_is_honoured_in_full() {
  let dir = tempfile::tempdir().unwrap();
  let image = dir.path().join("image");
  let root = dir.path().join("root");
  let mut ufs = Ufs::create(
    &image,
    &root,
    ArenaSizes { files: 8, areas: (VIEW_MAX as u64) + 4, nodes: (VIEW_MAX as u64) + 16, string_bytes: 1 << 20 },
  )
  .unwrap();

  let mut view = Vec::with_capacity(VIEW_MAX);
  for i in 0..VIEW_MAX {
    view.push(ufs.add_area(&format!("a{i}")).unwrap());
  }
  assert_eq!(view.len(), VIEW_MAX);

  let d = ufs.add_directory("src").unwrap();
  let f = ufs.add_file(d, "main").unwrap();
  ufs.add_mapping(*view.last().unwrap(), Storage::File(f)).unwrap();

  assert_eq!(ufs.resolve_storage_in_view(&view, Storage::File(f)).unwrap(), *view.last().unwrap());
}

#[test]
fn arena_exhaustion_reports_out_of_memory() {
  let dir = tempfile::tempdir().unwrap();
  let image = dir.path().join("image");
  let root = dir.path().join("root");
  let mut ufs = Ufs::create(&image, &root, ArenaSizes { files: 2, areas: 2, nodes: 8, string_bytes: 1024 }).unwrap();

  // File arena has exactly one usable slot (slot 0 is reserved).
  let d = ufs.add_directory("src").unwrap();
  ufs.add_file(d, "one").unwrap();
  let err = ufs.add_file(d, "two").unwrap_err();
  assert_eq!(err.status(), StatusCode::OutOfMemory);
}

#[test]
fn remove_area_with_several_mappings_leaves_none_referencing_it() {
  let (_dir, mut ufs) = fresh();
  let d = ufs.add_directory("src").unwrap();
  let f1 = ufs.add_file(d, "one").unwrap();
  let f2 = ufs.add_file(d, "two").unwrap();
  let a = ufs.add_area("a").unwrap();
  ufs.add_mapping(a, Storage::File(f1)).unwrap();
  ufs.add_mapping(a, Storage::File(f2)).unwrap();

  ufs.remove_area(a).unwrap();
  assert_eq!(ufs.probe_mapping(a, Storage::File(f1)).unwrap_err().status(), StatusCode::DoesNotExist);
  assert_eq!(ufs.probe_mapping(a, Storage::File(f2)).unwrap_err().status(), StatusCode::DoesNotExist);
}

#[test]
fn name_uniqueness_is_enforced_per_kind() {
  let (_dir, mut ufs) = fresh();
  ufs.add_area("dup").unwrap();
  let err = ufs.add_area("dup").unwrap_err();
  assert_eq!(err.status(), StatusCode::AlreadyExists);

  let d = ufs.add_directory("src").unwrap();
  ufs.add_file(d, "f").unwrap();
  let err = ufs.add_file(d, "f").unwrap_err();
  assert_eq!(err.status(), StatusCode::AlreadyExists);
}

#[test]
fn view_with_unknown_area_is_rejected() {
  let (_dir, mut ufs) = fresh();
  let d = ufs.add_directory("src").unwrap();
  let f = ufs.add_file(d, "main").unwrap();
  let err = ufs.resolve_storage_in_view(&[999, -1], Storage::File(f)).unwrap_err();
  assert_eq!(err.status(), StatusCode::InvalidAreaInView);
}

#[test]
fn remove_directory_requires_empty() {
  let (_dir, mut ufs) = fresh();
  let d = ufs.add_directory("src").unwrap();
  ufs.add_file(d, "f").unwrap();
  let err = ufs.remove_directory(d).unwrap_err();
  assert_eq!(err.status(), StatusCode::DirectoryIsNotEmpty);

  ufs.remove_file(ufs.get_file(d, "f").unwrap()).unwrap();
  ufs.remove_directory(d).unwrap();
}
