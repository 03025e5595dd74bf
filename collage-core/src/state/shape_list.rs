//! # Shape lists
//!
//! The shapes one layer draws over one resource, in drawing order. Shapes saved by plugins that aren't
//! installed are kept in place as [`UnknownShape`]s so that saving doesn't lose them.

use super::{LayerID, ShapeID};
use crate::resource::ResourceIdentifier;

/// A saved shape nobody here understands, kept exactly as read.
#[derive(Clone, PartialEq, Debug)]
pub struct UnknownShape(toml::Table);
impl UnknownShape {
    #[must_use]
    pub fn new(raw: toml::Table) -> Self {
        Self(raw)
    }
    /// The saved type name, if there was one.
    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.0.get("type").and_then(toml::Value::as_str)
    }
    #[must_use]
    pub fn plugin(&self) -> Option<&str> {
        self.0.get("plugin").and_then(toml::Value::as_str)
    }
    #[must_use]
    pub fn raw(&self) -> &toml::Table {
        &self.0
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum Entry {
    Shape(ShapeID),
    Unknown(UnknownShape),
}

#[derive(Clone, Debug)]
pub struct ShapeList {
    layer: LayerID,
    resource: ResourceIdentifier,
    entries: Vec<Entry>,
}
// Public methods for client
impl ShapeList {
    #[must_use]
    pub fn layer(&self) -> LayerID {
        self.layer
    }
    #[must_use]
    pub fn resource(&self) -> &ResourceIdentifier {
        &self.resource
    }
    /// Known shapes, in drawing order.
    pub fn shapes(&self) -> impl Iterator<Item = ShapeID> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Shape(id) => Some(*id),
            Entry::Unknown(_) => None,
        })
    }
    pub fn unknown(&self) -> impl Iterator<Item = &UnknownShape> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Unknown(unknown) => Some(unknown),
            Entry::Shape(_) => None,
        })
    }
    /// Every child, known or not.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
    #[must_use]
    pub fn has_children(&self) -> bool {
        !self.entries.is_empty()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    #[must_use]
    pub fn index_of(&self, shape: ShapeID) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| *entry == Entry::Shape(shape))
    }
    #[must_use]
    pub fn contains(&self, shape: ShapeID) -> bool {
        self.index_of(shape).is_some()
    }
}
// Private methods for writer/applier. These don't report events, the owning layer does.
impl ShapeList {
    pub(super) fn new(layer: LayerID, resource: ResourceIdentifier) -> Self {
        Self {
            layer,
            resource,
            entries: Vec::new(),
        }
    }
    /// Insert at `index`, clamped to the end. False if already present.
    pub(super) fn insert(&mut self, index: usize, shape: ShapeID) -> bool {
        if self.contains(shape) {
            return false;
        }
        let index = index.min(self.entries.len());
        self.entries.insert(index, Entry::Shape(shape));
        true
    }
    /// Remove a shape, returning the index it was at.
    pub(super) fn remove(&mut self, shape: ShapeID) -> Option<usize> {
        let index = self.index_of(shape)?;
        self.entries.remove(index);
        Some(index)
    }
    pub(super) fn push_unknown(&mut self, unknown: UnknownShape) {
        self.entries.push(Entry::Unknown(unknown));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::id::Handle;

    fn list() -> ShapeList {
        ShapeList::new(Handle::next(), ResourceIdentifier::for_path("src/main.rs"))
    }

    #[test]
    fn insert_remove() {
        let mut list = list();
        let (a, b, c) = (Handle::next(), Handle::next(), Handle::next());
        assert!(list.insert(usize::MAX, a));
        assert!(list.insert(usize::MAX, c));
        assert!(list.insert(1, b));
        assert!(!list.insert(0, b));
        assert_eq!(list.shapes().collect::<Vec<_>>(), [a, b, c]);

        assert_eq!(list.remove(b), Some(1));
        assert_eq!(list.remove(b), None);
        assert_eq!(list.shapes().collect::<Vec<_>>(), [a, c]);
    }
    #[test]
    fn unknown_entries_are_children() {
        let mut list = list();
        assert!(!list.has_children());
        let mut raw = toml::Table::new();
        raw.insert("type".into(), "hexagon".into());
        raw.insert("plugin".into(), "org.example.hex".into());
        list.push_unknown(UnknownShape::new(raw));

        assert!(list.has_children());
        assert_eq!(list.shapes().count(), 0);
        let unknown = list.unknown().next().unwrap();
        assert_eq!(unknown.type_name(), Some("hexagon"));
        assert_eq!(unknown.plugin(), Some("org.example.hex"));

        // Known shapes keep their place relative to unknown ones.
        let shape = Handle::next();
        list.insert(0, shape);
        assert_eq!(list.index_of(shape), Some(0));
        assert_eq!(list.len(), 2);
    }
}
