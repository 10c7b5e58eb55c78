//! View resolution, directory iteration, and collapse (`spec.md` §4.7).
//!
//! These are free functions over a [`crate::view::View`] and a
//! [`crate::mapping::MappingSet`] rather than methods on the top-level
//! handle, so each algorithm can be exercised directly against fixture data
//! without going through image I/O.

use std::collections::HashSet;

use crate::defs::{Id, Storage, BASE};
use crate::error::{Error, Result, StatusCode};
use crate::mapping::MappingSet;
use crate::view::View;

/// `resolveStorageInView`: the first area in `view` that either is BASE or
/// carries an explicit mapping to `storage`.
pub fn resolve_storage_in_view(view: &View, mappings: &MappingSet, storage: Storage) -> Result<Id> {
  let mapped: HashSet<Id> = mappings.by_storage(storage).into_iter().collect();
  for &area in view.areas() {
    if area == BASE || mapped.contains(&area) {
      return Ok(area);
    }
  }
  Err(Error::Status(StatusCode::CannotResolveStorage))
}

/// `iterateDirInView`: the de-duplicated union of every file explicitly
/// mapped to a non-BASE area in `view` (restricted to `dir_files`), plus —
/// when BASE appears in `view` — every id in `external_files`, the subset
/// of `dir_files` the external filesystem collaborator reports as present.
pub fn iterate_dir_in_view(
  view: &View,
  mappings: &MappingSet,
  dir_files: &[Id],
  external_files: &[Id],
) -> Vec<Id> {
  let mut union = HashSet::new();

  for &area in view.areas() {
    if area == BASE {
      continue;
    }
    for &file in dir_files {
      if mappings.probe(area, Storage::File(file)) {
        union.insert(file);
      }
    }
  }

  if view.areas().contains(&BASE) {
    union.extend(external_files.iter().copied());
  }

  union.into_iter().collect()
}

/// `collapse`: merges every non-terminal area's contribution in `view` onto
/// the terminal area. When the terminal area is BASE, mappings are not
/// re-added there (I5 forbids storing a mapping to BASE) — instead
/// `materialize` is invoked once per dropped storage so the caller can
/// realise it on the external filesystem.
pub fn collapse(
  view: &View,
  mappings: &mut MappingSet,
  mut materialize: impl FnMut(Storage) -> Result<()>,
) -> Result<()> {
  let areas = view.areas();
  let terminal = match areas.last() {
    Some(&t) => t,
    None => return Ok(()),
  };

  for &source in &areas[..areas.len() - 1] {
    for storage in mappings.by_area(source) {
      if terminal != BASE && !mappings.probe(terminal, storage) {
        mappings.add(terminal, storage)?;
      }
      mappings.remove_pair(source, storage);
      if terminal == BASE {
        materialize(storage)?;
      }
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::registry::AreaRecord;

  fn view(raw: &[Id], num_areas: usize) -> View {
    let records: Vec<AreaRecord> = std::iter::once(AreaRecord::empty())
      .chain((0..num_areas).map(|_| {
        let mut r = AreaRecord::empty();
        r.in_use = 1;
        r
      }))
      .collect();
    View::validate(raw, &records).unwrap()
  }

  #[test]
  fn basic_resolve() {
    let mut mappings = MappingSet::new();
    mappings.add(1, Storage::File(10)).unwrap();
    let v = view(&[1, BASE, -1], 1);
    assert_eq!(resolve_storage_in_view(&v, &mappings, Storage::File(10)).unwrap(), 1);
    assert_eq!(resolve_storage_in_view(&v, &mappings, Storage::Dir(5)).unwrap(), BASE);
  }

  #[test]
  fn shadowing_prefers_the_first_mapped_area_in_view_order() {
    let mut mappings = MappingSet::new();
    mappings.add(1, Storage::File(10)).unwrap();
    mappings.add(2, Storage::File(10)).unwrap();
    let upper_first = view(&[2, 1, BASE, -1], 2);
    assert_eq!(resolve_storage_in_view(&upper_first, &mappings, Storage::File(10)).unwrap(), 2);

    let lower_first = view(&[1, 2, BASE, -1], 2);
    assert_eq!(resolve_storage_in_view(&lower_first, &mappings, Storage::File(10)).unwrap(), 1);
  }

  #[test]
  fn exhausting_the_view_without_base_is_cannot_resolve() {
    let mappings = MappingSet::new();
    let v = view(&[1, -1], 1);
    let err = resolve_storage_in_view(&v, &mappings, Storage::File(10)).unwrap_err();
    assert_eq!(err.status(), StatusCode::CannotResolveStorage);
  }

  #[test]
  fn iteration_unions_and_deduplicates() {
    let mut mappings = MappingSet::new();
    mappings.add(1, Storage::File(1)).unwrap();
    mappings.add(2, Storage::File(2)).unwrap();
    let v = view(&[1, 2, -1], 2);
    let mut files = iterate_dir_in_view(&v, &mappings, &[1, 2], &[]);
    files.sort();
    assert_eq!(files, vec![1, 2]);
  }

  #[test]
  fn iteration_includes_external_files_only_when_base_present() {
    let mappings = MappingSet::new();
    let with_base = view(&[BASE, -1], 0);
    assert_eq!(iterate_dir_in_view(&with_base, &mappings, &[1, 2], &[2]), vec![2]);

    let without_base = view(&[1, -1], 1);
    assert!(iterate_dir_in_view(&without_base, &mappings, &[1, 2], &[2]).is_empty());
  }

  #[test]
  fn collapse_merges_onto_terminal_area() {
    let mut mappings = MappingSet::new();
    mappings.add(1, Storage::File(1)).unwrap();
    mappings.add(2, Storage::File(2)).unwrap();
    let v = view(&[1, 2, -1], 2);
    collapse(&v, &mut mappings, |_| Ok(())).unwrap();
    let mut remaining = mappings.by_area(2);
    remaining.sort_by_key(|s| s.id());
    assert_eq!(remaining, vec![Storage::File(1), Storage::File(2)]);
    assert!(mappings.by_area(1).is_empty());
  }

  #[test]
  fn collapse_to_base_materialises_instead_of_storing_a_mapping() {
    let mut mappings = MappingSet::new();
    mappings.add(1, Storage::File(1)).unwrap();
    let v = view(&[1, BASE, -1], 1);
    let mut materialized = Vec::new();
    collapse(&v, &mut mappings, |s| {
      materialized.push(s);
      Ok(())
    })
    .unwrap();
    assert_eq!(materialized, vec![Storage::File(1)]);
    assert!(mappings.by_area(1).is_empty());
    assert!(mappings.by_area(BASE).is_empty());
  }

  #[test]
  fn collapse_is_idempotent() {
    let mut mappings = MappingSet::new();
    mappings.add(1, Storage::File(1)).unwrap();
    mappings.add(2, Storage::File(2)).unwrap();
    let v = view(&[1, 2, -1], 2);
    collapse(&v, &mut mappings, |_| Ok(())).unwrap();
    let before = mappings.by_area(2);
    collapse(&v, &mut mappings, |_| Ok(())).unwrap();
    let mut after = mappings.by_area(2);
    let mut before_sorted = before;
    before_sorted.sort_by_key(|s| s.id());
    after.sort_by_key(|s| s.id());
    assert_eq!(before_sorted, after);
  }
}
