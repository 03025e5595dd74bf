//! # State
//!
//! The whole annotation model of one collage. A [`Collage`] owns every layer and shape it has ever
//! held, including ones that are currently undone or deleted, and refers to them by handle. Layers
//! are placed in an ordered stack, shapes are placed in their layer's per-resource [`ShapeList`].
//!
//! Reading is open to anyone. Modification goes through [commands](crate::commands), applied by way of
//! [`CommandConsumer`](crate::commands::CommandConsumer).

pub mod events;
pub mod layer;
pub mod shape;
pub mod shape_list;

pub use layer::{Layer, LayerID};
pub use shape::{Shape, ShapeID};
pub use shape_list::{ShapeList, UnknownShape};

use crate::dependency::{self, PluginDependency};
use crate::resource::ResourceIdentifier;
use events::Event;

pub const LAYER_NAME_PREFIX: &str = "Layer ";

#[derive(Clone, Debug)]
pub struct Collage {
    /// Every layer, placed or not.
    layers: hashbrown::HashMap<LayerID, Layer>,
    /// Placed layers, bottom to top.
    order: Vec<LayerID>,
    /// Index into `order` of the active layer.
    current: usize,
    /// Every shape, in any lifecycle state.
    shapes: hashbrown::HashMap<ShapeID, Shape>,
    dependencies: Vec<PluginDependency>,
    dependency_warnings: Vec<String>,
    /// Events not yet taken, or None when nobody is listening.
    events: Option<Vec<Event>>,
}
impl Default for Collage {
    fn default() -> Self {
        Self::new()
    }
}
// Public methods for client
impl Collage {
    /// A collage with a single empty layer, depending on the installed plugins.
    #[must_use]
    pub fn new() -> Self {
        let mut collage = Self::empty();
        collage.dependencies = dependency::installed();
        let first = LayerID::next();
        let name = collage.new_layer_name();
        collage.layers.insert(first, Layer::new(first, name));
        collage.order.push(first);
        collage
    }
    /// Placed layers, bottom to top.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> + '_ {
        self.order.iter().filter_map(|id| self.layers.get(id))
    }
    #[must_use]
    pub fn layer_ids(&self) -> &[LayerID] {
        &self.order
    }
    /// Get a placed layer.
    #[must_use]
    pub fn layer(&self, id: LayerID) -> Option<&Layer> {
        self.layer_index(id)?;
        self.layers.get(&id)
    }
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.order.len()
    }
    #[must_use]
    pub fn layer_index(&self, id: LayerID) -> Option<usize> {
        self.order.iter().position(|placed| *placed == id)
    }
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }
    #[must_use]
    pub fn current_layer(&self) -> Option<LayerID> {
        self.order.get(self.current).copied()
    }
    #[must_use]
    pub fn is_active(&self, id: LayerID) -> bool {
        self.current_layer() == Some(id)
    }
    /// "Layer N" for the first N from the layer count plus one that no layer is called yet.
    #[must_use]
    pub fn new_layer_name(&self) -> String {
        (self.layer_count() + 1..)
            .map(|n| format!("{LAYER_NAME_PREFIX}{n}"))
            .find(|name| self.layers().all(|layer| layer.name() != name))
            .unwrap_or_default()
    }
    /// Get a shape in any lifecycle state. See [`Shape::is_live`].
    #[must_use]
    pub fn shape(&self, id: ShapeID) -> Option<&Shape> {
        self.shapes.get(&id)
    }
    /// The list `layer` keeps for `resource`, if there is one.
    #[must_use]
    pub fn shape_list(&self, layer: LayerID, resource: &ResourceIdentifier) -> Option<&ShapeList> {
        self.layer(layer)?.shape_list(resource)
    }
    /// The lists to draw over `resource`: those of visible layers with shapes on it, and
    /// the active layer's whether or not it has any, bottom to top.
    ///
    /// The active layer's list is made if it doesn't exist yet.
    pub fn resource_shape_lists(&mut self, resource: &ResourceIdentifier) -> Vec<&ShapeList> {
        if let Some(current) = self.current_layer() {
            self.shapes_for(current, resource);
        }
        let current = self.current_layer();
        self.layers()
            .filter(|layer| {
                (layer.is_visible() && layer.has_shapes_for(resource))
                    || Some(layer.id()) == current
            })
            .filter_map(|layer| layer.shape_list(resource))
            .collect()
    }
    /// Live shapes over `resource`, in the layers [`Self::resource_shape_lists`] would return.
    pub fn visible_shapes(&mut self, resource: &ResourceIdentifier) -> Vec<ShapeID> {
        self.resource_shape_lists(resource)
            .into_iter()
            .flat_map(ShapeList::shapes)
            .collect()
    }
    /// The list `layer` keeps for `resource`, made empty if it doesn't exist yet.
    /// None if the layer isn't placed.
    pub fn shapes_for(&mut self, layer: LayerID, resource: &ResourceIdentifier) -> Option<&ShapeList> {
        self.layer_index(layer)?;
        let (_, made) = self.layers.get_mut(&layer)?.shapes_for_mut(resource);
        if made {
            self.emit(Event::ShapeListAdded {
                layer,
                resource: resource.clone(),
            });
        }
        self.shape_list(layer, resource)
    }
    /// Drop a layer's list for `resource`, if it is empty. True if something was removed.
    pub fn remove_empty_resource(&mut self, layer: LayerID, resource: &ResourceIdentifier) -> bool {
        let Some(layer_ref) = self.layers.get_mut(&layer) else {
            return false;
        };
        if layer_ref.has_shapes_for(resource) || layer_ref.remove_resource(resource).is_none() {
            return false;
        }
        self.emit(Event::ShapeListRemoved {
            layer,
            resource: resource.clone(),
        });
        true
    }
    /// Current dependency tags, installed ones first.
    #[must_use]
    pub fn dependencies(&self) -> &[PluginDependency] {
        &self.dependencies
    }
    /// Warnings about missing plugins, from when this collage was loaded.
    #[must_use]
    pub fn dependency_warnings(&self) -> &[String] {
        &self.dependency_warnings
    }
    /// Plugins providing the live shapes of placed layers.
    #[must_use]
    pub fn referenced_plugins(&self) -> hashbrown::HashSet<&'static str> {
        self.placed_lists()
            .flat_map(ShapeList::shapes)
            .filter_map(|id| self.shapes.get(&id))
            .map(|shape| shape.kind().plugin_id())
            .collect()
    }
    #[must_use]
    pub fn has_unknown_shapes(&self) -> bool {
        self.placed_lists()
            .any(|list| list.unknown().next().is_some())
    }
    /// Dependencies cut down to what the placed layers use, as saved.
    #[must_use]
    pub fn pruned_dependencies(&self) -> Vec<PluginDependency> {
        dependency::prune(
            &self.dependencies,
            self.referenced_plugins(),
            self.has_unknown_shapes(),
        )
    }
    /// Add a not yet created shape, ready for a create command.
    pub fn stage_shape(&mut self, shape: Shape) -> ShapeID {
        let id = ShapeID::next();
        self.shapes.insert(id, shape);
        id
    }
    /// Move all of `other`'s placed layers and their shapes into this collage, unplaced, ready for
    /// an import command. Returns the layers in their original order.
    pub fn stage_layers(&mut self, mut other: Collage) -> Vec<LayerID> {
        let order = std::mem::take(&mut other.order);
        for id in &order {
            if let Some(layer) = other.layers.remove(id) {
                self.layers.insert(*id, layer);
            }
        }
        self.shapes.extend(other.shapes.drain());
        order
    }
    /// Drop a shape from [`Self::stage_shape`] that no command ever created.
    /// Returns false if there is no such shape, or it was created.
    pub fn discard_staged_shape(&mut self, id: ShapeID) -> bool {
        if self.shapes.get(&id).is_some_and(|shape| !shape.is_created()) {
            self.shapes.remove(&id);
            true
        } else {
            false
        }
    }
    /// Drop a layer from [`Self::stage_layers`] that was never placed, along with its shapes.
    /// Returns false if there is no such layer, or it is placed.
    pub fn discard_staged_layer(&mut self, id: LayerID) -> bool {
        if self.layer_index(id).is_some() || self.layers.remove(&id).is_none() {
            return false;
        }
        self.shapes
            .retain(|_, shape| shape.parent().map_or(true, |parent| parent.layer != id));
        true
    }
    /// Start or stop keeping events for [`Self::take_events`]. Stopping discards any kept.
    pub fn record_events(&mut self, record: bool) {
        match (record, self.events.is_some()) {
            (true, false) => self.events = Some(Vec::new()),
            (false, true) => self.events = None,
            _ => (),
        }
    }
    /// Take every event since the last call.
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.as_mut().map(std::mem::take).unwrap_or_default()
    }
}
// Private methods for writer/applier
impl Collage {
    /// No layers at all. Only valid as a starting point for loading.
    fn empty() -> Self {
        Self {
            layers: hashbrown::HashMap::new(),
            order: Vec::new(),
            current: 0,
            shapes: hashbrown::HashMap::new(),
            dependencies: Vec::new(),
            dependency_warnings: Vec::new(),
            events: None,
        }
    }
    fn emit(&mut self, event: Event) {
        if let Some(events) = &mut self.events {
            events.push(event);
        }
    }
    fn placed_lists(&self) -> impl Iterator<Item = &ShapeList> + '_ {
        self.layers()
            .flat_map(|layer| layer.populated_shape_lists())
    }
    /// Place an arena layer at `index`, clamped to the top. The active layer stays active.
    fn add_layer(&mut self, index: usize, id: LayerID) {
        let index = index.min(self.order.len());
        self.order.insert(index, id);
        if self.order.len() > 1 && self.current >= index {
            self.current += 1;
        }
        self.emit(Event::LayerAdded(id));
    }
    /// Unplace a layer, returning where it was. Refuses to remove the last layer.
    ///
    /// The active layer stays active. If it was the one removed, the layer taking its place becomes
    /// active, or the one below if it was on top.
    fn remove_layer(&mut self, id: LayerID) -> Option<usize> {
        if self.order.len() <= 1 {
            return None;
        }
        let index = self.layer_index(id)?;
        let was_active = index == self.current;
        self.order.remove(index);
        if index < self.current || self.current >= self.order.len() {
            self.current = self.current.saturating_sub(1);
        }
        self.emit(Event::LayerRemoved(id));
        if was_active {
            let to = self.current_layer();
            self.emit(Event::ActiveLayer { from: Some(id), to });
        }
        Some(index)
    }
    /// Move a placed layer to `to`, clamped. The active layer stays active.
    fn move_layer(&mut self, id: LayerID, to: usize) {
        let Some(from) = self.layer_index(id) else {
            return;
        };
        let active = self.current_layer();
        self.order.remove(from);
        self.order.insert(to.min(self.order.len()), id);
        if let Some(index) = active.and_then(|active| self.layer_index(active)) {
            self.current = index;
        }
        self.emit(Event::LayerOrder(id));
    }
    fn set_layer_visible(&mut self, id: LayerID, visible: bool) {
        if let Some(layer) = self.layers.get_mut(&id) {
            if layer.set_visible(visible) {
                self.emit(Event::LayerVisible { layer: id, visible });
                self.emit(Event::ChildVisibility(id));
            }
        }
    }
    /// Activate a placed layer, also showing it.
    fn set_current_layer(&mut self, id: LayerID) {
        let Some(index) = self.layer_index(id) else {
            return;
        };
        let from = self.current_layer();
        self.current = index;
        self.set_layer_visible(id, true);
        if from != Some(id) {
            self.emit(Event::ActiveLayer { from, to: Some(id) });
        }
    }
    fn set_dependencies(&mut self, dependencies: Vec<PluginDependency>) {
        if self.dependencies != dependencies {
            self.dependencies = dependencies;
            self.emit(Event::Dependencies);
        }
    }
}
use crate::commands::{Command, CommandConsumer, CommandError, DoUndo, MetaCommand};
impl CommandConsumer<Command> for Collage {
    fn check(&self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
        if let Some(shape) = command.filter_map(Command::shape) {
            return self.check(shape);
        }
        if let Some(layer) = command.filter_map(Command::layer) {
            return self.check(layer);
        }
        let Some(MetaCommand::Scope(_, commands)) =
            command.filter_map(Command::meta).map(|meta| meta.command())
        else {
            return Err(CommandError::UnknownResource);
        };
        if commands.is_empty() {
            return Err(CommandError::NoOp);
        }
        // Each part is checked against the present state on its own. Parts depending on
        // an earlier part's effect are caught when applying instead.
        commands
            .iter()
            .try_for_each(|inner| self.check(same_direction(command, inner)))
    }
    fn apply(&mut self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
        if let Some(shape) = command.filter_map(Command::shape) {
            return self.apply(shape);
        }
        if let Some(layer) = command.filter_map(Command::layer) {
            return self.apply(layer);
        }
        let Some(MetaCommand::Scope(_, commands)) =
            command.filter_map(Command::meta).map(|meta| meta.command())
        else {
            return Err(CommandError::UnknownResource);
        };
        if commands.is_empty() {
            return Err(CommandError::NoOp);
        }
        // Undo runs the parts last to first.
        let steps: Vec<DoUndo<'_, Command>> = if command.is_undo() {
            commands.iter().rev().map(DoUndo::Undo).collect()
        } else {
            commands.iter().map(DoUndo::Do).collect()
        };
        for (applied, step) in steps.iter().enumerate() {
            if let Err(err) = self.apply(*step) {
                self.roll_back(&steps[..applied]);
                return Err(err);
            }
        }
        Ok(())
    }
}
/// `inner` in the direction `outer` is being applied.
fn same_direction<'c>(outer: DoUndo<'_, Command>, inner: &'c Command) -> DoUndo<'c, Command> {
    if outer.is_undo() {
        DoUndo::Undo(inner)
    } else {
        DoUndo::Do(inner)
    }
}
impl Collage {
    /// Reverse the already applied parts of a failed scope, most recent first.
    fn roll_back(&mut self, applied: &[DoUndo<'_, Command>]) {
        for step in applied.iter().rev() {
            if let Err(err) = self.apply(step.reversed()) {
                log::error!(
                    "Failed to roll back {} after a failed scope: {err}",
                    step.command().label()
                );
            }
        }
    }
}

// Building a collage from a saved file, bypassing the command layer.
impl Collage {
    pub(crate) fn loading() -> Self {
        Self::empty()
    }
    pub(crate) fn load_layer(&mut self, name: String, visible: bool) -> LayerID {
        let id = LayerID::next();
        let mut layer = Layer::new(id, name);
        layer.set_visible(visible);
        self.layers.insert(id, layer);
        self.order.push(id);
        id
    }
    pub(crate) fn load_shape(
        &mut self,
        layer: LayerID,
        resource: &ResourceIdentifier,
        shape: Shape,
    ) -> Option<ShapeID> {
        let (list, _) = self.layers.get_mut(&layer)?.shapes_for_mut(resource);
        let id = ShapeID::next();
        list.insert(usize::MAX, id);
        self.shapes.insert(
            id,
            shape.loaded(shape::ShapeParent {
                layer,
                resource: resource.clone(),
            }),
        );
        Some(id)
    }
    pub(crate) fn load_unknown(
        &mut self,
        layer: LayerID,
        resource: &ResourceIdentifier,
        unknown: UnknownShape,
    ) {
        if let Some(layer) = self.layers.get_mut(&layer) {
            layer.shapes_for_mut(resource).0.push_unknown(unknown);
        }
    }
    /// Finish loading. A collage always has a layer, so one is added if none were saved.
    /// Returns the active index actually used, clamped into range.
    pub(crate) fn finish_loading(
        &mut self,
        current: usize,
        dependencies: Vec<PluginDependency>,
        warnings: Vec<String>,
    ) -> usize {
        if self.order.is_empty() {
            let name = self.new_layer_name();
            self.load_layer(name, true);
        }
        self.current = current.min(self.order.len() - 1);
        self.dependencies = dependencies;
        self.dependency_warnings = warnings;
        self.current
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dependency::CORE_PLUGIN_ID;

    #[test]
    fn new_collage() {
        let collage = Collage::new();
        assert_eq!(collage.layer_count(), 1);
        assert_eq!(collage.layers().next().unwrap().name(), "Layer 1");
        assert_eq!(collage.current_index(), 0);
        assert_eq!(collage.dependencies(), dependency::installed());
    }
    #[test]
    fn layer_names_skip_used() {
        let mut collage = Collage::new();
        assert_eq!(collage.new_layer_name(), "Layer 2");
        let id = LayerID::next();
        collage.layers.insert(id, Layer::new(id, "Layer 2"));
        collage.add_layer(usize::MAX, id);
        assert_eq!(collage.new_layer_name(), "Layer 3");
        let id = LayerID::next();
        collage.layers.insert(id, Layer::new(id, "Layer 4"));
        collage.add_layer(usize::MAX, id);
        // Starts at 4, which is taken.
        assert_eq!(collage.new_layer_name(), "Layer 5");
    }
    #[test]
    fn add_layer_shifts_active() {
        let mut collage = Collage::new();
        let first = collage.current_layer().unwrap();
        let id = LayerID::next();
        collage.layers.insert(id, Layer::new(id, "below"));
        collage.add_layer(0, id);
        assert_eq!(collage.current_layer(), Some(first));
        assert_eq!(collage.current_index(), 1);

        let id = LayerID::next();
        collage.layers.insert(id, Layer::new(id, "top"));
        collage.add_layer(100, id);
        assert_eq!(collage.layer_ids().last(), Some(&id));
        assert_eq!(collage.current_index(), 1);
    }
    #[test]
    fn remove_layer_rules() {
        let mut collage = Collage::new();
        let first = collage.current_layer().unwrap();
        assert_eq!(collage.remove_layer(first), None);

        let second = LayerID::next();
        collage.layers.insert(second, Layer::new(second, "two"));
        collage.add_layer(usize::MAX, second);
        collage.set_current_layer(second);
        // Active was on top, falls back to the one below.
        assert_eq!(collage.remove_layer(second), Some(1));
        assert_eq!(collage.current_layer(), Some(first));
        assert_eq!(collage.remove_layer(second), None);
    }
    #[test]
    fn resource_lists() {
        let mut collage = Collage::new();
        let resource = ResourceIdentifier::for_path("lib.rs");
        // The active layer always contributes, made on demand.
        let lists = collage.resource_shape_lists(&resource);
        assert_eq!(lists.len(), 1);
        assert!(lists[0].is_empty());

        let other = LayerID::next();
        collage.layers.insert(other, Layer::new(other, "other"));
        collage.add_layer(usize::MAX, other);
        let shape = Shape::new(shape::ShapeKind::Ellipse, "");
        collage.load_shape(other, &resource, shape);
        assert_eq!(collage.resource_shape_lists(&resource).len(), 2);

        collage.set_layer_visible(other, false);
        assert_eq!(collage.resource_shape_lists(&resource).len(), 1);
    }
    #[test]
    fn pruning_uses_placed_shapes() {
        let mut collage = Collage::new();
        let layer = collage.current_layer().unwrap();
        let resource = ResourceIdentifier::for_path("lib.rs");
        collage.load_shape(
            layer,
            &resource,
            Shape::new(shape::ShapeKind::TextNote("x".into()), ""),
        );
        let ids: Vec<_> = collage
            .pruned_dependencies()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, [CORE_PLUGIN_ID, dependency::TEXT_PLUGIN_ID]);
    }
    #[test]
    fn scope_rolls_back_on_failure() {
        use crate::commands::{LayerCommand, ScopeType};
        let mut collage = Collage::new();
        let layer = collage.current_layer().unwrap();
        let rename = |to: &str| -> Command {
            LayerCommand::Renamed {
                target: layer,
                from: "Layer 1".into(),
                to: to.into(),
            }
            .into()
        };
        // Both parts look fine on their own, but the second one's state is gone after the first.
        let scope: Command =
            MetaCommand::Scope(ScopeType::Atoms, [rename("a"), rename("b")].into()).into();
        assert!(collage.check(DoUndo::Do(&scope)).is_ok());
        assert_eq!(
            collage.apply(DoUndo::Do(&scope)),
            Err(CommandError::MismatchedState)
        );
        assert_eq!(collage.layer(layer).unwrap().name(), "Layer 1");
    }
    #[test]
    fn empty_scope_is_noop() {
        use crate::commands::ScopeType;
        let mut collage = Collage::new();
        let scope: Command = MetaCommand::Scope(ScopeType::Atoms, Box::new([])).into();
        assert_eq!(collage.apply(DoUndo::Do(&scope)), Err(CommandError::NoOp));
    }
    #[test]
    fn events_only_when_recording() {
        let mut collage = Collage::new();
        let resource = ResourceIdentifier::for_path("a");
        let layer = collage.current_layer().unwrap();
        collage.shapes_for(layer, &resource);
        assert!(collage.take_events().is_empty());

        collage.record_events(true);
        assert!(collage.remove_empty_resource(layer, &resource));
        assert_eq!(
            collage.take_events(),
            [Event::ShapeListRemoved { layer, resource }]
        );
        assert!(collage.take_events().is_empty());
    }
}
