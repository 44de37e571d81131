//! The per-version list of tiles that have builds.
//!
//! Each list is stored as the JSON text of an integer array, e.g. `[3,7,9]`.
//! Entries are only ever added.

use std::collections::HashSet;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MergedIndex {
    /// The deduplicated list, re-encoded.
    pub json: String,

    /// Whether the tile was missing from the list before.
    pub added: bool,

    /// Whether the stored list held duplicates that were dropped.
    pub collapsed: bool,
}

impl MergedIndex {
    /// Does the stored list need rewriting?
    pub fn changed(&self) -> bool {
        self.added || self.collapsed
    }
}

/// Add `tile` to the JSON-encoded index list `existing`, dropping any
/// duplicates. Tiles keep the order in which they were first seen.
pub fn merge_tile_index(existing: &str, tile: u16) -> serde_json::Result<MergedIndex> {
    let current: Vec<u16> = serde_json::from_str(existing)?;
    let added = !current.contains(&tile);
    let stored_len = current.len();
    let mut seen = HashSet::with_capacity(current.len() + 1);

    let merged: Vec<u16> = current
        .into_iter()
        .chain(std::iter::once(tile))
        .filter(|t| seen.insert(*t))
        .collect();

    let collapsed = merged.len() < stored_len + usize::from(added);

    Ok(MergedIndex {
        json: serde_json::to_string(&merged)?,
        added,
        collapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_tile_is_not_repeated() {
        let merged = merge_tile_index("[3, 7]", 7).unwrap();
        assert_eq!(merged.json, "[3,7]");
        assert!(!merged.added);
        assert!(!merged.changed());
    }

    #[test]
    fn new_tile_is_appended() {
        let merged = merge_tile_index("[3, 7]", 9).unwrap();
        assert_eq!(merged.json, "[3,7,9]");
        assert!(merged.added);
        assert!(!merged.collapsed);
    }

    #[test]
    fn empty_list() {
        assert_eq!(merge_tile_index("[]", 0).unwrap().json, "[0]");
    }

    #[test]
    fn stored_duplicates_are_collapsed() {
        let merged = merge_tile_index("[5,3,5,3]", 1).unwrap();
        assert_eq!(merged.json, "[5,3,1]");
        assert!(merged.collapsed);

        let merged = merge_tile_index("[7,3,7]", 7).unwrap();
        assert_eq!(merged.json, "[7,3]");
        assert!(!merged.added);
        assert!(merged.collapsed);
        assert!(merged.changed());
    }

    #[test]
    fn merging_is_idempotent() {
        let once = merge_tile_index("[12]", 40).unwrap();
        let twice = merge_tile_index(&once.json, 40).unwrap();
        assert_eq!(once.json, twice.json);
        assert!(!twice.changed());
    }

    #[test]
    fn rejects_garbage() {
        assert!(merge_tile_index("", 1).is_err());
        assert!(merge_tile_index("{\"a\":1}", 1).is_err());
        assert!(merge_tile_index("[\"x\"]", 1).is_err());
    }
}
