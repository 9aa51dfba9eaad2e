//! Name-keyed collections that keep declaration order
//!
//! Entries carry an explicit 1-based `id`. The map is kept sorted by id, so
//! iteration order is render order, and every mutation renumbers the ids to
//! stay contiguous.

use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::de::{Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, Serializer};

/// An entry of a [`NamedCollection`]
pub trait Named {
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
    fn id(&self) -> usize;
    fn set_id(&mut self, id: usize);
}

#[derive(Debug, Clone)]
pub struct NamedCollection<T> {
    entries: IndexMap<String, T>,
    case_sensitive: bool,
}

impl<T> Default for NamedCollection<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
            case_sensitive: false,
        }
    }
}

impl<T: Named> NamedCollection<T> {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            entries: IndexMap::new(),
            case_sensitive,
        }
    }

    fn key(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Change name matching, rebuilding the keys.
    ///
    /// Fails with the offending name when two entries would collide.
    pub fn set_case_sensitive(&mut self, case_sensitive: bool) -> Result<(), String> {
        if self.case_sensitive == case_sensitive {
            return Ok(());
        }
        let entries = std::mem::take(&mut self.entries);
        self.case_sensitive = case_sensitive;
        for (_, item) in entries {
            let key = self.key(item.name());
            if self.entries.contains_key(&key) {
                return Err(item.name().to_string());
            }
            self.entries.insert(key, item);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&self.key(name))
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(&self.key(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        let key = self.key(name);
        self.entries.get_mut(&key)
    }

    /// 0-based position of an entry.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.get_index_of(&self.key(name))
    }

    pub fn get_index(&self, index: usize) -> Option<&T> {
        self.entries.get_index(index).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.values_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|v| v.name())
    }

    pub fn first(&self) -> Option<&T> {
        self.entries.first().map(|(_, v)| v)
    }

    pub fn last(&self) -> Option<&T> {
        self.entries.last().map(|(_, v)| v)
    }

    /// Append an entry, assigning the next id.
    ///
    /// The entry is handed back when its name is already taken.
    pub fn push(&mut self, mut item: T) -> Result<(), T> {
        let key = self.key(item.name());
        if self.entries.contains_key(&key) {
            return Err(item);
        }
        item.set_id(self.entries.len() + 1);
        self.entries.insert(key, item);
        Ok(())
    }

    /// Insert an entry at a 0-based position, shifting later entries.
    pub fn insert_at(&mut self, index: usize, item: T) -> Result<(), T> {
        let key = self.key(item.name());
        if self.entries.contains_key(&key) {
            return Err(item);
        }
        let index = index.min(self.entries.len());
        self.entries.shift_insert(index, key, item);
        self.renumber();
        Ok(())
    }

    /// Insert keeping the entry's own id as its position; used when
    /// rebuilding a collection from stored entries.
    pub fn insert_by_id(&mut self, item: T) -> Result<(), T> {
        let key = self.key(item.name());
        if self.entries.contains_key(&key) {
            return Err(item);
        }
        self.entries.insert(key, item);
        self.entries.sort_by(|_, a, _, b| a.id().cmp(&b.id()));
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<T> {
        let key = self.key(name);
        let removed = self.entries.shift_remove(&key);
        if removed.is_some() {
            self.renumber();
        }
        removed
    }

    /// Replace an entry in place, keeping its position and id. The new
    /// entry may carry a different name.
    pub fn replace(&mut self, name: &str, mut item: T) -> Result<(), T> {
        let Some(index) = self.position(name) else {
            return Err(item);
        };
        let new_key = self.key(item.name());
        if new_key != self.key(name) && self.entries.contains_key(&new_key) {
            return Err(item);
        }
        let Some((_, old)) = self.entries.shift_remove_index(index) else {
            return Err(item);
        };
        item.set_id(old.id());
        self.entries.shift_insert(index, new_key, item);
        Ok(())
    }

    /// Rename an entry in place. Fails if the old name is missing or the new
    /// name is taken by another entry.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> bool {
        let Some(index) = self.position(old_name) else {
            return false;
        };
        let new_key = self.key(new_name);
        if new_key != self.key(old_name) && self.entries.contains_key(&new_key) {
            return false;
        }
        let Some((_, mut item)) = self.entries.shift_remove_index(index) else {
            return false;
        };
        item.set_name(new_name.to_string());
        self.entries.shift_insert(index, new_key, item);
        true
    }

    /// Move an entry to a 0-based position and renumber.
    pub fn move_to(&mut self, name: &str, index: usize) -> bool {
        let Some(from) = self.position(name) else {
            return false;
        };
        let to = index.min(self.entries.len() - 1);
        self.entries.move_index(from, to);
        self.renumber();
        true
    }

    /// Reassign ids 1..=n in iteration order.
    pub fn renumber(&mut self) {
        for (i, item) in self.entries.values_mut().enumerate() {
            item.set_id(i + 1);
        }
    }

    /// Re-sort by id (after ids were edited directly) and renumber.
    pub fn sort_by_id(&mut self) {
        self.entries.sort_by(|_, a, _, b| a.id().cmp(&b.id()));
        self.renumber();
    }

    /// Entries sorted by name; used where render order is by name.
    pub fn sorted_by_name(&self) -> Vec<&T> {
        let mut items: Vec<&T> = self.entries.values().collect();
        items.sort_by(|a, b| a.name().cmp(b.name()));
        items
    }
}

impl<T: PartialEq> PartialEq for NamedCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len() && self.entries.values().eq(other.entries.values())
    }
}

impl<T: Named> FromIterator<T> for NamedCollection<T> {
    /// Collect entries, keeping their ids. Later duplicates are dropped.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = NamedCollection::new(false);
        for item in iter {
            let _ = collection.insert_by_id(item);
        }
        collection
    }
}

impl<T: Serialize> Serialize for NamedCollection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.entries.values())
    }
}

impl<'de, T: Named + Deserialize<'de>> Deserialize<'de> for NamedCollection<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Named + Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = NamedCollection<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a list of named entries")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut collection = NamedCollection::new(false);
                while let Some(item) = seq.next_element::<T>()? {
                    if let Err(item) = collection.insert_by_id(item) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate name `{}`",
                            item.name()
                        )));
                    }
                }
                collection.renumber();
                Ok(collection)
            }
        }

        deserializer.deserialize_seq(EntriesVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Item {
        id: usize,
        name: String,
    }

    impl Named for Item {
        fn name(&self) -> &str {
            &self.name
        }
        fn set_name(&mut self, name: String) {
            self.name = name;
        }
        fn id(&self) -> usize {
            self.id
        }
        fn set_id(&mut self, id: usize) {
            self.id = id;
        }
    }

    fn item(name: &str) -> Item {
        Item {
            id: 0,
            name: name.to_string(),
        }
    }

    fn names(c: &NamedCollection<Item>) -> Vec<(usize, String)> {
        c.iter().map(|i| (i.id, i.name.clone())).collect()
    }

    #[test]
    fn test_push_assigns_ids_and_rejects_duplicates() {
        let mut c = NamedCollection::new(false);
        c.push(item("a")).unwrap();
        c.push(item("b")).unwrap();
        assert!(c.push(item("A")).is_err());
        assert_eq!(names(&c), vec![(1, "a".to_string()), (2, "b".to_string())]);
        assert!(c.contains("B"));
    }

    #[test]
    fn test_case_sensitive_lookup() {
        let mut c = NamedCollection::new(true);
        c.push(item("a")).unwrap();
        c.push(item("A")).unwrap();
        assert_eq!(c.len(), 2);
        assert!(c.set_case_sensitive(false).is_err());
    }

    #[test]
    fn test_insert_at_and_remove_renumber() {
        let mut c = NamedCollection::new(false);
        c.push(item("id")).unwrap();
        c.push(item("name")).unwrap();
        c.insert_at(1, item("age")).unwrap();
        assert_eq!(
            names(&c),
            vec![(1, "id".to_string()), (2, "age".to_string()), (3, "name".to_string())]
        );
        c.remove("id");
        assert_eq!(names(&c), vec![(1, "age".to_string()), (2, "name".to_string())]);
    }

    #[test]
    fn test_rename_keeps_position() {
        let mut c = NamedCollection::new(false);
        c.push(item("a")).unwrap();
        c.push(item("b")).unwrap();
        c.push(item("c")).unwrap();
        assert!(!c.rename("a", "c"));
        assert!(c.rename("b", "x"));
        assert_eq!(c.position("x"), Some(1));
        assert!(c.get("b").is_none());
    }

    #[test]
    fn test_move_to() {
        let mut c = NamedCollection::new(false);
        for n in ["a", "b", "c"] {
            c.push(item(n)).unwrap();
        }
        assert!(c.move_to("c", 0));
        assert_eq!(c.names().collect::<Vec<_>>(), vec!["c", "a", "b"]);
        assert_eq!(c.get("b").unwrap().id, 3);
    }

    #[test]
    fn test_serde_as_list() {
        let mut c = NamedCollection::new(false);
        c.push(item("a")).unwrap();
        c.push(item("b")).unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"[{"id":1,"name":"a"},{"id":2,"name":"b"}]"#);
        let back: NamedCollection<Item> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);

        let dup = r#"[{"id":1,"name":"a"},{"id":2,"name":"A"}]"#;
        assert!(serde_json::from_str::<NamedCollection<Item>>(dup).is_err());
    }
}
