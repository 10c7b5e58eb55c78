//! Views: terminator-delimited, duplicate-free, ordered lists of area ids
//! (`spec.md` §3, §4.7).

use std::collections::HashSet;

use crate::defs::{Id, BASE, VIEW_MAX, VIEW_TERMINATOR};
use crate::error::{Error, Result, StatusCode};
use crate::registry::AreaRecord;

/// A validated view: every entry is `BASE` or the id of an in-use area, and
/// no entry repeats.
#[derive(Debug, Clone)]
pub struct View {
  areas: Vec<Id>,
}

impl View {
  /// Validates `raw` (a slice read up to `VIEW_MAX` elements or a
  /// `VIEW_TERMINATOR`, whichever comes first) against an area arena.
  pub fn validate(raw: &[Id], area_records: &[AreaRecord]) -> Result<Self> {
    let mut areas = Vec::new();
    for &entry in raw.iter().take(VIEW_MAX) {
      if entry == VIEW_TERMINATOR {
        break;
      }
      areas.push(entry);
    }

    let mut seen = HashSet::with_capacity(areas.len());
    for &area in &areas {
      if !seen.insert(area) {
        return Err(Error::Status(StatusCode::ViewContainsDuplicates));
      }
      if area != BASE {
        let in_use = area > 0
          && (area as usize) < area_records.len()
          && area_records[area as usize].in_use != 0;
        if !in_use {
          return Err(Error::Status(StatusCode::InvalidAreaInView));
        }
      }
    }

    Ok(Self { areas })
  }

  pub fn areas(&self) -> &[Id] {
    &self.areas
  }

  pub fn last(&self) -> Option<Id> {
    self.areas.last().copied()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn records(in_use: &[bool]) -> Vec<AreaRecord> {
    std::iter::once(AreaRecord::empty())
      .chain(in_use.iter().map(|&u| {
        let mut r = AreaRecord::empty();
        r.in_use = u as u8;
        r
      }))
      .collect()
  }

  #[test]
  fn accepts_base_at_any_position() {
    let records = records(&[true]);
    let view = View::validate(&[1, BASE, VIEW_TERMINATOR], &records).unwrap();
    assert_eq!(view.areas(), &[1, BASE]);
  }

  #[test]
  fn rejects_duplicates() {
    let records = records(&[true]);
    let err = View::validate(&[1, 1, VIEW_TERMINATOR], &records).unwrap_err();
    assert_eq!(err.status(), StatusCode::ViewContainsDuplicates);
  }

  #[test]
  fn rejects_unknown_area() {
    let records = records(&[true]);
    let err = View::validate(&[2, VIEW_TERMINATOR], &records).unwrap_err();
    assert_eq!(err.status(), StatusCode::InvalidAreaInView);
  }

  #[test]
  fn rejects_freed_area() {
    let records = records(&[false]);
    let err = View::validate(&[1, VIEW_TERMINATOR], &records).unwrap_err();
    assert_eq!(err.status(), StatusCode::InvalidAreaInView);
  }

  #[test]
  fn empty_view_resolves_to_empty_area_list() {
    let records = records(&[]);
    let view = View::validate(&[VIEW_TERMINATOR], &records).unwrap();
    assert!(view.areas().is_empty());
  }

  #[test]
  fn honours_view_max_without_terminator() {
    let in_use = vec![true; VIEW_MAX];
    let records = records(&in_use);
    let raw: Vec<Id> = (1..=VIEW_MAX as Id).collect();
    let view = View::validate(&raw, &records).unwrap();
    assert_eq!(view.areas().len(), VIEW_MAX);
  }

  #[test]
  fn truncates_anything_past_view_max() {
    let in_use = vec![true; VIEW_MAX + 1];
    let records = records(&in_use);
    let raw: Vec<Id> = (1..=VIEW_MAX as Id + 1).collect();
    let view = View::validate(&raw, &records).unwrap();
    assert_eq!(view.areas().len(), VIEW_MAX);
  }
}
