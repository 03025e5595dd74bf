//! # Layers
//!
//! A named, hideable group of shape lists, one list per resource. Exactly one layer of a collage is
//! active, and that is where new shapes go.

pub mod commands;

use super::shape_list::ShapeList;
use super::{events::Event, Collage};
use crate::commands::{CommandConsumer, CommandError, DoUndo};
use crate::resource::ResourceIdentifier;

pub type LayerID = crate::id::Handle<Layer>;

#[derive(Clone, Debug)]
pub struct Layer {
    id: LayerID,
    name: String,
    visible: bool,
    lists: hashbrown::HashMap<ResourceIdentifier, ShapeList>,
}
// Public methods for client
impl Layer {
    #[must_use]
    pub fn id(&self) -> LayerID {
        self.id
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }
    /// The list for `resource`, if one was ever made.
    #[must_use]
    pub fn shape_list(&self, resource: &ResourceIdentifier) -> Option<&ShapeList> {
        self.lists.get(resource)
    }
    #[must_use]
    pub fn has_shapes_for(&self, resource: &ResourceIdentifier) -> bool {
        self.lists
            .get(resource)
            .is_some_and(ShapeList::has_children)
    }
    /// Lists with at least one child, sorted by resource.
    #[must_use]
    pub fn populated_shape_lists(&self) -> Vec<&ShapeList> {
        let mut lists: Vec<_> = self
            .lists
            .values()
            .filter(|list| list.has_children())
            .collect();
        lists.sort_unstable_by(|a, b| a.resource().cmp(b.resource()));
        lists
    }
}
// Private methods for writer/applier
impl Layer {
    pub(super) fn new(id: LayerID, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            visible: true,
            lists: hashbrown::HashMap::new(),
        }
    }
    /// The list for `resource`, made on first use. The flag is set if it was just made.
    pub(super) fn shapes_for_mut(&mut self, resource: &ResourceIdentifier) -> (&mut ShapeList, bool) {
        let id = self.id;
        let mut made = false;
        let list = self
            .lists
            .entry(resource.clone())
            .or_insert_with(|| {
                made = true;
                ShapeList::new(id, resource.clone())
            });
        (list, made)
    }
    pub(super) fn shape_list_mut(&mut self, resource: &ResourceIdentifier) -> Option<&mut ShapeList> {
        self.lists.get_mut(resource)
    }
    pub(super) fn remove_resource(&mut self, resource: &ResourceIdentifier) -> Option<ShapeList> {
        self.lists.remove(resource)
    }
    pub(super) fn set_name(&mut self, name: &str) -> bool {
        if self.name == name {
            false
        } else {
            name.clone_into(&mut self.name);
            true
        }
    }
    pub(super) fn set_visible(&mut self, visible: bool) -> bool {
        std::mem::replace(&mut self.visible, visible) != visible
    }
}

use commands::Command;
impl CommandConsumer<Command> for Collage {
    fn check(&self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
        match command {
            DoUndo::Do(Command::Created { target, .. }) => {
                if self.layer_index(*target).is_some() {
                    Err(CommandError::MismatchedState)
                } else {
                    Ok(())
                }
            }
            DoUndo::Undo(Command::Created { target, .. }) => {
                self.layer_index(*target)
                    .ok_or(CommandError::MismatchedState)?;
                self.refuse_last_layer()
            }
            DoUndo::Do(Command::Deleted { target, .. }) => {
                self.layer_index(*target)
                    .ok_or(CommandError::UnknownResource)?;
                self.refuse_last_layer()?;
                if self.is_active(*target) {
                    Err(CommandError::Refused("the active layer cannot be deleted"))
                } else {
                    Ok(())
                }
            }
            DoUndo::Undo(Command::Deleted { target, .. }) => {
                if !self.layers.contains_key(target) {
                    Err(CommandError::UnknownResource)
                } else if self.layer_index(*target).is_some() {
                    Err(CommandError::MismatchedState)
                } else {
                    Ok(())
                }
            }
            DoUndo::Do(Command::Renamed { target, from, to })
            | DoUndo::Undo(Command::Renamed {
                target,
                from: to,
                to: from,
            }) => {
                let layer = self
                    .layers
                    .get(target)
                    .ok_or(CommandError::UnknownResource)?;
                if from == to {
                    Err(CommandError::NoOp)
                } else if layer.name != *from {
                    Err(CommandError::MismatchedState)
                } else {
                    Ok(())
                }
            }
            DoUndo::Do(Command::Reordered { target, from, to })
            | DoUndo::Undo(Command::Reordered {
                target,
                from: to,
                to: from,
            }) => {
                if from == to {
                    Err(CommandError::NoOp)
                } else if *to >= self.layer_count() {
                    Err(CommandError::Refused("layer index out of range"))
                } else if self.layer_index(*target) != Some(*from) {
                    Err(CommandError::MismatchedState)
                } else {
                    Ok(())
                }
            }
            DoUndo::Do(Command::VisibilityToggled { target })
            | DoUndo::Undo(Command::VisibilityToggled { target }) => {
                self.layer_index(*target)
                    .ok_or(CommandError::UnknownResource)?;
                if self.is_active(*target) {
                    Err(CommandError::Refused("the active layer is always shown"))
                } else {
                    Ok(())
                }
            }
            DoUndo::Do(Command::ActiveChanged { from, to, .. })
            | DoUndo::Undo(Command::ActiveChanged {
                from: to, to: from, ..
            }) => {
                self.layer_index(*to)
                    .ok_or(CommandError::UnknownResource)?;
                if from == to {
                    Err(CommandError::NoOp)
                } else if self.current_layer() != Some(*from) {
                    Err(CommandError::MismatchedState)
                } else {
                    Ok(())
                }
            }
            DoUndo::Do(Command::Imported {
                layers,
                dependencies_before,
                ..
            }) => {
                if layers.is_empty() {
                    return Err(CommandError::NoOp);
                }
                for layer in layers.iter() {
                    if !self.layers.contains_key(layer) {
                        return Err(CommandError::UnknownResource);
                    }
                    if self.layer_index(*layer).is_some() {
                        return Err(CommandError::MismatchedState);
                    }
                }
                if self.dependencies != *dependencies_before {
                    return Err(CommandError::MismatchedState);
                }
                Ok(())
            }
            DoUndo::Undo(Command::Imported {
                layers,
                dependencies_after,
                ..
            }) => {
                if layers.iter().any(|layer| self.layer_index(*layer).is_none())
                    || self.dependencies != *dependencies_after
                {
                    Err(CommandError::MismatchedState)
                } else if self.layer_count() <= layers.len() {
                    Err(CommandError::Refused("a collage needs at least one layer"))
                } else {
                    Ok(())
                }
            }
        }
    }
    fn apply(&mut self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
        self.check(command)?;
        match command {
            DoUndo::Do(Command::Created {
                target,
                name,
                index,
            }) => {
                self.layers
                    .entry(*target)
                    .or_insert_with(|| Layer::new(*target, name.as_str()));
                self.add_layer(*index, *target);
            }
            DoUndo::Undo(Command::Created { target, .. })
            | DoUndo::Do(Command::Deleted { target, .. }) => {
                self.remove_layer(*target)
                    .ok_or(CommandError::MismatchedState)?;
            }
            DoUndo::Undo(Command::Deleted { target, index }) => {
                self.add_layer(*index, *target);
            }
            DoUndo::Do(Command::Renamed { target, to, .. })
            | DoUndo::Undo(Command::Renamed {
                target, from: to, ..
            }) => {
                self.set_layer_name(*target, to);
            }
            DoUndo::Do(Command::Reordered { target, to, .. })
            | DoUndo::Undo(Command::Reordered {
                target, from: to, ..
            }) => {
                self.move_layer(*target, *to);
            }
            DoUndo::Do(Command::VisibilityToggled { target })
            | DoUndo::Undo(Command::VisibilityToggled { target }) => {
                let visible = self.layers.get(target).is_some_and(Layer::is_visible);
                self.set_layer_visible(*target, !visible);
            }
            DoUndo::Do(Command::ActiveChanged { to, .. }) => {
                self.set_current_layer(*to);
            }
            DoUndo::Undo(Command::ActiveChanged {
                from,
                to,
                to_was_hidden,
            }) => {
                self.set_current_layer(*from);
                if *to_was_hidden {
                    self.set_layer_visible(*to, false);
                }
            }
            DoUndo::Do(Command::Imported {
                layers,
                dependencies_after,
                ..
            }) => {
                for layer in layers.iter() {
                    self.add_layer(usize::MAX, *layer);
                }
                self.set_dependencies(dependencies_after.clone());
            }
            DoUndo::Undo(Command::Imported {
                layers,
                dependencies_before,
                ..
            }) => {
                for layer in layers.iter() {
                    self.remove_layer(*layer)
                        .ok_or(CommandError::MismatchedState)?;
                }
                self.set_dependencies(dependencies_before.clone());
            }
        }
        Ok(())
    }
}
impl Collage {
    fn refuse_last_layer(&self) -> Result<(), CommandError> {
        if self.layer_count() <= 1 {
            Err(CommandError::Refused("a collage needs at least one layer"))
        } else {
            Ok(())
        }
    }
    fn set_layer_name(&mut self, target: LayerID, name: &str) {
        if let Some(layer) = self.layers.get_mut(&target) {
            if layer.set_name(name) {
                self.emit(Event::LayerName {
                    layer: target,
                    name: name.to_owned(),
                });
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::events::Event;

    fn collage_with(names: &[&str]) -> Collage {
        let mut collage = Collage::new();
        let first = collage.layer_ids()[0];
        collage.set_layer_name(first, names[0]);
        for name in &names[1..] {
            let command = Command::create(&collage);
            collage.apply(DoUndo::Do(&command)).unwrap();
            let id = command.target().unwrap();
            collage.set_layer_name(id, name);
        }
        collage
    }
    fn names(collage: &Collage) -> Vec<String> {
        collage.layers().map(|l| l.name().to_owned()).collect()
    }
    fn id_of(collage: &Collage, name: &str) -> LayerID {
        collage.layers().find(|l| l.name() == name).unwrap().id()
    }

    #[test]
    fn create_undo_redo() {
        let mut collage = Collage::new();
        let command = Command::create(&collage);
        assert!(collage.check(DoUndo::Undo(&command)).is_err());
        collage.apply(DoUndo::Do(&command)).unwrap();
        assert_eq!(names(&collage), ["Layer 1", "Layer 2"]);
        // Can't create twice.
        assert_eq!(
            collage.apply(DoUndo::Do(&command)),
            Err(CommandError::MismatchedState)
        );
        collage.apply(DoUndo::Undo(&command)).unwrap();
        assert_eq!(names(&collage), ["Layer 1"]);
        // Only one layer left, nothing else can be undone.
        assert!(collage.check(DoUndo::Undo(&command)).is_err());
        collage.apply(DoUndo::Do(&command)).unwrap();
        assert_eq!(names(&collage), ["Layer 1", "Layer 2"]);
    }
    #[test]
    fn delete_restores_position() {
        let mut collage = collage_with(&["a", "b", "c"]);
        let b = id_of(&collage, "b");
        let command = Command::delete(&collage, b).unwrap();
        collage.apply(DoUndo::Do(&command)).unwrap();
        assert_eq!(names(&collage), ["a", "c"]);
        collage.apply(DoUndo::Undo(&command)).unwrap();
        assert_eq!(names(&collage), ["a", "b", "c"]);
    }
    #[test]
    fn delete_refusals() {
        let mut collage = collage_with(&["only"]);
        let only = collage.layer_ids()[0];
        let command = Command::delete(&collage, only).unwrap();
        assert!(matches!(
            collage.check(DoUndo::Do(&command)),
            Err(CommandError::Refused(_))
        ));

        let mut collage = collage_with(&["a", "b"]);
        let active = collage.current_layer().unwrap();
        let command = Command::delete(&collage, active).unwrap();
        assert!(matches!(
            collage.apply(DoUndo::Do(&command)),
            Err(CommandError::Refused(_))
        ));
        assert_eq!(collage.layer_count(), 2);
    }
    #[test]
    fn delete_before_active_keeps_it_active() {
        let mut collage = collage_with(&["a", "b", "c"]);
        let c = id_of(&collage, "c");
        let activate = Command::activate(&collage, c).unwrap();
        collage.apply(DoUndo::Do(&activate)).unwrap();

        let delete = Command::delete(&collage, id_of(&collage, "a")).unwrap();
        collage.apply(DoUndo::Do(&delete)).unwrap();
        assert_eq!(collage.current_layer(), Some(c));
        collage.apply(DoUndo::Undo(&delete)).unwrap();
        assert_eq!(collage.current_layer(), Some(c));
        assert_eq!(collage.current_index(), 2);
    }
    #[test]
    fn rename() {
        let mut collage = collage_with(&["a", "b"]);
        let a = id_of(&collage, "a");
        let command = Command::rename(&collage, a, "z").unwrap();
        collage.apply(DoUndo::Do(&command)).unwrap();
        assert_eq!(names(&collage), ["z", "b"]);
        // Already applied, the old name no longer matches.
        assert_eq!(
            collage.check(DoUndo::Do(&command)),
            Err(CommandError::MismatchedState)
        );
        collage.apply(DoUndo::Undo(&command)).unwrap();
        assert_eq!(names(&collage), ["a", "b"]);

        let same = Command::rename(&collage, a, "a").unwrap();
        assert_eq!(collage.check(DoUndo::Do(&same)), Err(CommandError::NoOp));
    }
    #[test]
    fn reorder_keeps_active() {
        let mut collage = collage_with(&["a", "b", "c", "d"]);
        let b = id_of(&collage, "b");
        let activate = Command::activate(&collage, b).unwrap();
        collage.apply(DoUndo::Do(&activate)).unwrap();

        let command = Command::reorder(&collage, id_of(&collage, "a"), 2).unwrap();
        collage.apply(DoUndo::Do(&command)).unwrap();
        assert_eq!(names(&collage), ["b", "c", "a", "d"]);
        assert_eq!(collage.current_layer(), Some(b));

        collage.apply(DoUndo::Undo(&command)).unwrap();
        assert_eq!(names(&collage), ["a", "b", "c", "d"]);
        assert_eq!(collage.current_layer(), Some(b));

        // Moving the active layer itself.
        let command = Command::reorder(&collage, b, 3).unwrap();
        collage.apply(DoUndo::Do(&command)).unwrap();
        assert_eq!(names(&collage), ["a", "c", "d", "b"]);
        assert_eq!(collage.current_index(), 3);
    }
    #[test]
    fn reorder_refusals() {
        let collage = collage_with(&["a", "b"]);
        let a = id_of(&collage, "a");
        let command = Command::reorder(&collage, a, 2).unwrap();
        assert!(collage.check(DoUndo::Do(&command)).is_err());
        let command = Command::reorder(&collage, a, 0).unwrap();
        assert_eq!(collage.check(DoUndo::Do(&command)), Err(CommandError::NoOp));
        let command = Command::reorder(&collage, a, 1).unwrap();
        assert!(collage.check(DoUndo::Do(&command)).is_ok());
        assert!(collage.check(DoUndo::Undo(&command)).is_err());
    }
    #[test]
    fn toggle_visible() {
        let mut collage = collage_with(&["a", "b"]);
        let active = collage.current_layer().unwrap();
        let command = Command::toggle_visible(&collage, active).unwrap();
        assert!(collage.check(DoUndo::Do(&command)).is_err());

        let b = id_of(&collage, "b");
        let command = Command::toggle_visible(&collage, b).unwrap();
        collage.apply(DoUndo::Do(&command)).unwrap();
        assert!(!collage.layer(b).unwrap().is_visible());
        collage.apply(DoUndo::Undo(&command)).unwrap();
        assert!(collage.layer(b).unwrap().is_visible());
    }
    #[test]
    fn activate_shows_and_undo_hides() {
        let mut collage = collage_with(&["a", "b"]);
        let (a, b) = (id_of(&collage, "a"), id_of(&collage, "b"));
        let hide = Command::toggle_visible(&collage, b).unwrap();
        collage.apply(DoUndo::Do(&hide)).unwrap();

        let activate = Command::activate(&collage, b).unwrap();
        collage.apply(DoUndo::Do(&activate)).unwrap();
        assert_eq!(collage.current_layer(), Some(b));
        assert!(collage.layer(b).unwrap().is_visible());
        assert_eq!(
            collage.check(DoUndo::Do(&activate)),
            Err(CommandError::MismatchedState)
        );

        collage.apply(DoUndo::Undo(&activate)).unwrap();
        assert_eq!(collage.current_layer(), Some(a));
        assert!(!collage.layer(b).unwrap().is_visible());

        let again = Command::activate(&collage, a).unwrap();
        assert_eq!(collage.check(DoUndo::Do(&again)), Err(CommandError::NoOp));
    }
    #[test]
    fn events() {
        let mut collage = collage_with(&["a", "b"]);
        collage.record_events(true);
        let b = id_of(&collage, "b");
        let command = Command::toggle_visible(&collage, b).unwrap();
        collage.apply(DoUndo::Do(&command)).unwrap();
        assert_eq!(
            collage.take_events(),
            [
                Event::LayerVisible {
                    layer: b,
                    visible: false
                },
                Event::ChildVisibility(b),
            ]
        );
    }
    #[test]
    fn import() {
        let mut collage = collage_with(&["a"]);
        let mut other = collage_with(&["x", "y"]);
        other.dependencies.push(crate::dependency::PluginDependency {
            missing: true,
            ..crate::dependency::PluginDependency::new("org.example.gone", "1.0")
        });
        let imported_deps = other.dependencies().to_vec();
        let staged = collage.stage_layers(other);
        let command = Command::import(&collage, staged, &imported_deps);

        assert!(collage.check(DoUndo::Undo(&command)).is_err());
        collage.apply(DoUndo::Do(&command)).unwrap();
        assert_eq!(names(&collage), ["a", "x", "y"]);
        assert!(collage
            .dependencies()
            .iter()
            .any(|d| d.id == "org.example.gone"));

        collage.apply(DoUndo::Undo(&command)).unwrap();
        assert_eq!(names(&collage), ["a"]);
        assert_eq!(collage.dependencies(), crate::dependency::installed());
    }
}
