//! Mapping set: the many-to-many relation between areas and storage
//! (`spec.md` §4.6). In-memory only — mappings are not part of the
//! persisted image, matching the source's treatment of `ufsAddMapping` as
//! purely a runtime relation rebuilt by the caller after reopening an image.

use std::collections::{HashMap, HashSet};

use crate::defs::{Id, Storage};
use crate::error::{Error, Result, StatusCode};

#[derive(Default)]
pub struct MappingSet {
  by_area: HashMap<Id, HashSet<Storage>>,
  by_storage: HashMap<Storage, HashSet<Id>>,
}

impl MappingSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds `(area, storage)`. Rejects a storage id that is itself the area
  /// being mapped when `storage` refers to the same directory (an area
  /// cannot resolve through itself — `spec.md` §4.6 invariant I7).
  pub fn add(&mut self, area: Id, storage: Storage) -> Result<()> {
    if let Storage::Dir(dir) = storage {
      if dir == area {
        return Err(Error::Status(StatusCode::BadCall));
      }
    }

    self.by_area.entry(area).or_default().insert(storage);
    self.by_storage.entry(storage).or_default().insert(area);
    Ok(())
  }

  /// Tests whether `(area, storage)` is mapped.
  pub fn probe(&self, area: Id, storage: Storage) -> bool {
    self.by_area.get(&area).is_some_and(|set| set.contains(&storage))
  }

  /// Every storage mapped to `area`, in no particular order.
  pub fn by_area(&self, area: Id) -> Vec<Storage> {
    self
      .by_area
      .get(&area)
      .map(|set| set.iter().copied().collect())
      .unwrap_or_default()
  }

  /// Every area `storage` is mapped from.
  pub fn by_storage(&self, storage: Storage) -> Vec<Id> {
    self
      .by_storage
      .get(&storage)
      .map(|set| set.iter().copied().collect())
      .unwrap_or_default()
  }

  /// Removes exactly the pair `(area, storage)`, if present.
  pub fn remove_pair(&mut self, area: Id, storage: Storage) {
    if let Some(storages) = self.by_area.get_mut(&area) {
      storages.remove(&storage);
      if storages.is_empty() {
        self.by_area.remove(&area);
      }
    }
    if let Some(areas) = self.by_storage.get_mut(&storage) {
      areas.remove(&area);
      if areas.is_empty() {
        self.by_storage.remove(&storage);
      }
    }
  }

  /// Removes every mapping involving `area` — called when an area is
  /// removed (`spec.md` §4.3 "removing an area purges all of its
  /// mappings").
  pub fn remove_by_area(&mut self, area: Id) {
    if let Some(storages) = self.by_area.remove(&area) {
      for storage in storages {
        if let Some(areas) = self.by_storage.get_mut(&storage) {
          areas.remove(&area);
          if areas.is_empty() {
            self.by_storage.remove(&storage);
          }
        }
      }
    }
  }

  /// Removes every mapping involving `storage` — called when the
  /// underlying file or directory is removed.
  pub fn remove_by_storage(&mut self, storage: Storage) {
    if let Some(areas) = self.by_storage.remove(&storage) {
      for area in areas {
        if let Some(storages) = self.by_area.get_mut(&area) {
          storages.remove(&storage);
          if storages.is_empty() {
            self.by_area.remove(&area);
          }
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn add_then_probe() {
    let mut mappings = MappingSet::new();
    mappings.add(1, Storage::File(10)).unwrap();
    assert!(mappings.probe(1, Storage::File(10)));
    assert!(!mappings.probe(1, Storage::File(11)));
  }

  #[test]
  fn rejects_area_mapped_to_itself() {
    let mut mappings = MappingSet::new();
    let err = mappings.add(1, Storage::Dir(1)).unwrap_err();
    assert_eq!(err.status(), StatusCode::BadCall);
  }

  #[test]
  fn remove_pair_leaves_other_pairs_on_the_same_area_intact() {
    let mut mappings = MappingSet::new();
    mappings.add(1, Storage::File(10)).unwrap();
    mappings.add(1, Storage::File(11)).unwrap();
    mappings.remove_pair(1, Storage::File(10));
    assert_eq!(mappings.by_area(1), vec![Storage::File(11)]);
    assert!(mappings.by_storage(Storage::File(10)).is_empty());
  }

  #[test]
  fn remove_by_area_purges_both_indices() {
    let mut mappings = MappingSet::new();
    mappings.add(1, Storage::File(10)).unwrap();
    mappings.add(2, Storage::File(10)).unwrap();
    mappings.remove_by_area(1);
    assert!(mappings.by_area(1).is_empty());
    assert_eq!(mappings.by_storage(Storage::File(10)), vec![2]);
  }

  #[test]
  fn remove_by_storage_purges_both_indices() {
    let mut mappings = MappingSet::new();
    mappings.add(1, Storage::File(10)).unwrap();
    mappings.add(1, Storage::File(11)).unwrap();
    mappings.remove_by_storage(Storage::File(10));
    assert_eq!(mappings.by_area(1), vec![Storage::File(11)]);
  }
}
