//! The persisted total order over mods.
//!
//! `priority.txt` holds one mod id per line, lowest priority first. The list
//! is healed on every load so that it contains each mod on disk exactly
//! once.
use std::collections::HashSet;

use crate::error::{IoContext as _, ModfsError, Result};
use crate::fs::write_atomic;
use crate::instance::Instance;
use crate::mods::ModId;

/// Ordered, duplicate-free list of mod ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityList {
    ids: Vec<ModId>,
}

impl PriorityList {
    /// Load and heal the priority list of `instance`.
    ///
    /// Blank lines, invalid ids, duplicates and ids without a mod directory
    /// are dropped. Mods present on disk but missing from the file are
    /// appended in name order. A missing file counts as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or the mods directory cannot be read.
    pub fn load(instance: &Instance) -> Result<Self> {
        let file = instance.priority_file();
        let raw = if file.is_file() {
            std::fs::read_to_string(&file).at(&file)?
        } else {
            String::new()
        };

        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let Ok(id) = ModId::parse(line) else {
                tracing::debug!("dropping invalid priority entry '{line}'");
                continue;
            };
            if !instance.mod_exists(&id) {
                tracing::debug!("dropping priority entry '{id}': mod does not exist");
                continue;
            }
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
        for id in instance.mod_ids()? {
            if seen.insert(id.clone()) {
                tracing::debug!("appending '{id}' to the priority list");
                ids.push(id);
            }
        }
        Ok(Self { ids })
    }

    /// Build a list from ids in lowest-priority-first order.
    #[must_use]
    pub fn from_ids(ids: Vec<ModId>) -> Self {
        let mut seen = HashSet::new();
        Self {
            ids: ids.into_iter().filter(|id| seen.insert(id.clone())).collect(),
        }
    }

    /// Overwrite `priority.txt` atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, instance: &Instance) -> Result<()> {
        let mut text = String::new();
        for id in &self.ids {
            text.push_str(id.as_str());
            text.push('\n');
        }
        write_atomic(&instance.priority_file(), &text)
    }

    /// Ids from lowest to highest priority.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ModId> {
        self.ids.iter()
    }

    /// Ids from lowest to highest priority.
    #[must_use]
    pub fn as_slice(&self) -> &[ModId] {
        &self.ids
    }

    /// Number of entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the list has no entries.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Whether `id` is listed.
    #[must_use]
    pub fn contains(&self, id: &ModId) -> bool {
        self.ids.contains(id)
    }

    /// Zero-based position of `id`, lowest priority first.
    #[must_use]
    pub fn position(&self, id: &ModId) -> Option<usize> {
        self.ids.iter().position(|x| x == id)
    }

    fn require(&self, id: &ModId) -> Result<usize> {
        self.position(id)
            .ok_or_else(|| ModfsError::not_found("priority list entry", id.as_str()))
    }

    /// Give `id` the lowest priority.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::NotFound`] if `id` is not listed.
    pub fn move_to_front(&mut self, id: &ModId) -> Result<()> {
        let idx = self.require(id)?;
        let entry = self.ids.remove(idx);
        self.ids.insert(0, entry);
        Ok(())
    }

    /// Give `id` the highest priority.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::NotFound`] if `id` is not listed.
    pub fn move_to_back(&mut self, id: &ModId) -> Result<()> {
        let idx = self.require(id)?;
        let entry = self.ids.remove(idx);
        self.ids.push(entry);
        Ok(())
    }

    /// Place `id` directly below `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::NotFound`] if either id is not listed and
    /// [`ModfsError::InvalidFormat`] if they are the same. The list is left
    /// unchanged on error.
    pub fn move_before(&mut self, id: &ModId, reference: &ModId) -> Result<()> {
        self.move_relative(id, reference, 0)
    }

    /// Place `id` directly above `reference`.
    ///
    /// # Errors
    ///
    /// Same as [`PriorityList::move_before`].
    pub fn move_after(&mut self, id: &ModId, reference: &ModId) -> Result<()> {
        self.move_relative(id, reference, 1)
    }

    fn move_relative(&mut self, id: &ModId, reference: &ModId, offset: usize) -> Result<()> {
        if id == reference {
            return Err(ModfsError::invalid(
                "reorder",
                id.as_str(),
                "a mod cannot be moved relative to itself",
            ));
        }
        let idx = self.require(id)?;
        self.require(reference)?;
        let entry = self.ids.remove(idx);
        let anchor = self.ids.iter().position(|x| x == reference).unwrap_or(0);
        self.ids.insert(anchor + offset, entry);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<ModId> {
        names.iter().map(|n| ModId::parse(n).unwrap()).collect()
    }

    fn names(list: &PriorityList) -> Vec<&str> {
        list.iter().map(ModId::as_str).collect()
    }

    fn instance_with(mods: &[&str], priority: Option<&str>) -> (tempfile::TempDir, Instance) {
        let tmp = tempfile::tempdir().unwrap();
        for m in mods {
            std::fs::create_dir_all(tmp.path().join("mods").join(m)).unwrap();
        }
        std::fs::create_dir_all(tmp.path().join(".modfs")).unwrap();
        if let Some(text) = priority {
            std::fs::write(tmp.path().join(".modfs/priority.txt"), text).unwrap();
        }
        let instance = Instance::open(tmp.path()).unwrap();
        (tmp, instance)
    }

    #[test]
    fn load_drops_stale_and_appends_new() {
        let (_tmp, instance) = instance_with(&["new"], Some("old\n"));
        let list = PriorityList::load(&instance).unwrap();
        assert_eq!(names(&list), vec!["new"]);
    }

    #[test]
    fn load_drops_blanks_invalid_and_duplicates() {
        let (_tmp, instance) =
            instance_with(&["a", "b", "c"], Some("b\n\nNot Valid\nb\na\n  \n"));
        let list = PriorityList::load(&instance).unwrap();
        assert_eq!(names(&list), vec!["b", "a", "c"]);
    }

    #[test]
    fn missing_file_lists_mods_by_name() {
        let (_tmp, instance) = instance_with(&["zeta", "alpha"], None);
        let list = PriorityList::load(&instance).unwrap();
        assert_eq!(names(&list), vec!["alpha", "zeta"]);
    }

    #[test]
    fn save_then_load_is_stable() {
        let (tmp, instance) = instance_with(&["a", "b", "c"], Some("c\nb\n"));
        let first = PriorityList::load(&instance).unwrap();
        first.save(&instance).unwrap();
        let second = PriorityList::load(&instance).unwrap();
        assert_eq!(first, second);
        let text = std::fs::read_to_string(tmp.path().join(".modfs/priority.txt")).unwrap();
        assert_eq!(text, "c\nb\na\n");
    }

    #[test]
    fn move_to_ends() {
        let mut list = PriorityList::from_ids(ids(&["a", "b", "c"]));
        list.move_to_back(&ids(&["a"])[0]).unwrap();
        assert_eq!(names(&list), vec!["b", "c", "a"]);
        list.move_to_front(&ids(&["c"])[0]).unwrap();
        assert_eq!(names(&list), vec!["c", "b", "a"]);
    }

    #[test]
    fn relative_moves_place_adjacent() {
        let all = ["a", "b", "c", "d", "e"];
        for x in all {
            for r in all {
                if x == r {
                    continue;
                }
                let (x_id, r_id) = (&ids(&[x])[0], &ids(&[r])[0]);

                let mut list = PriorityList::from_ids(ids(&all));
                list.move_before(x_id, r_id).unwrap();
                assert_eq!(list.position(x_id).unwrap() + 1, list.position(r_id).unwrap());
                assert_eq!(list.len(), all.len());

                let mut list = PriorityList::from_ids(ids(&all));
                list.move_after(x_id, r_id).unwrap();
                assert_eq!(list.position(x_id).unwrap(), list.position(r_id).unwrap() + 1);
            }
        }
    }

    #[test]
    fn failed_moves_leave_list_unchanged() {
        let mut list = PriorityList::from_ids(ids(&["a", "b"]));
        let before = list.clone();
        let ghost = &ids(&["ghost"])[0];
        let a = &ids(&["a"])[0];

        assert!(matches!(
            list.move_before(ghost, a).unwrap_err(),
            ModfsError::NotFound { .. }
        ));
        assert!(list.move_after(a, ghost).is_err());
        assert!(list.move_to_back(ghost).is_err());
        assert!(matches!(
            list.move_before(a, a).unwrap_err(),
            ModfsError::InvalidFormat { .. }
        ));
        assert_eq!(list, before);
    }
}
