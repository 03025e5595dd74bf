use crate::commands::{self, CommandConsumer, CommandError, DoUndo, LayerCommand, MetaCommand};
use crate::state::{events::Event, Collage, LayerID, Shape, ShapeID};

pub struct CommandQueueWriter<'a> {
    pub(super) lock: parking_lot::RwLockWriteGuard<'a, super::CollageQueueInner>,
    // Optimize for exactly one command (the most common case)
    pub(super) commands: smallvec::SmallVec<[commands::Command; 1]>,
    // Staged by this writer. Whatever no command took up is discarded on drop.
    pub(super) staged_shapes: Vec<ShapeID>,
    pub(super) staged_layers: Vec<LayerID>,
}
// This is weirdly leak-safe, as even though the history will be corrupted if this is not destructed,
// the lock will be mutably held for all of time thus not allowing anyone one else to observe it.
impl Drop for CommandQueueWriter<'_> {
    fn drop(&mut self) {
        use crate::commands::{Command, ScopeType};
        self.discard_unused_staged();
        // Skip if nothing to write.
        if self.commands.is_empty() {
            return;
        }

        // We always write exactly one command - bundle into one if more!
        // If panic exit, write as a panic scope (even if the scope is just one command long)
        let panicking = std::thread::panicking();
        let single = if !panicking && self.commands.len() == 1 {
            self.commands.pop()
        } else {
            None
        };
        let command = single.unwrap_or_else(|| {
            let ty = if panicking {
                ScopeType::WritePanic
            } else {
                ScopeType::Atoms
            };
            Command::Meta(MetaCommand::Scope(
                ty,
                std::mem::take(&mut self.commands).into_boxed_slice(),
            ))
        });

        log::trace!("Writing new command: {:#?}", command);

        // Undone commands can't be redone past a new one.
        let inner = &mut *self.lock;
        inner.history.truncate(inner.present);
        inner.history.push(command);
        inner.present = inner.history.len();
    }
}
impl CommandQueueWriter<'_> {
    /// The collage, including the effects of everything written so far.
    #[must_use]
    pub fn collage(&self) -> &Collage {
        &self.lock.collage
    }
    /// Apply a command now. It is written to history when the writer is dropped.
    /// A refused command leaves the collage untouched and is not written.
    pub fn execute(&mut self, command: impl Into<commands::Command>) -> Result<(), CommandError> {
        let command = command.into();
        if let Err(err) = self.lock.collage.apply(DoUndo::Do(&command)) {
            log::debug!("Refused {}: {err}", command.label());
            return Err(err);
        }
        self.commands.push(command);
        Ok(())
    }
    /// Add a shape to the collage, ready for a create command.
    /// If no create command of this writer takes it up, it is discarded again.
    pub fn stage_shape(&mut self, shape: Shape) -> ShapeID {
        let id = self.lock.collage.stage_shape(shape);
        self.staged_shapes.push(id);
        id
    }
    /// Move another collage's layers in, ready for an import command.
    /// Layers no import command of this writer takes up are discarded again.
    pub fn stage_layers(&mut self, other: Collage) -> Vec<LayerID> {
        let layers = self.lock.collage.stage_layers(other);
        self.staged_layers.extend_from_slice(&layers);
        layers
    }
    pub(super) fn take_events(&mut self) -> Vec<Event> {
        self.lock.collage.take_events()
    }
    fn discard_unused_staged(&mut self) {
        let collage = &mut self.lock.collage;
        for shape in self.staged_shapes.drain(..) {
            if collage.discard_staged_shape(shape) {
                log::trace!("Discarded unused staged shape {shape}");
            }
        }
        if self.staged_layers.is_empty() {
            return;
        }
        let mut imported = Vec::new();
        for command in &self.commands {
            imported_layers(command, &mut imported);
        }
        for layer in self.staged_layers.drain(..) {
            if !imported.contains(&layer) && collage.discard_staged_layer(layer) {
                log::trace!("Discarded unused staged layer {layer}");
            }
        }
    }
}

/// Every layer brought in by an import within `command`.
fn imported_layers(command: &commands::Command, into: &mut Vec<LayerID>) {
    if let Some(LayerCommand::Imported { layers, .. }) = command.layer() {
        into.extend_from_slice(layers);
    }
    if let Some(MetaCommand::Scope(_, commands)) = command.meta() {
        for inner in commands.iter() {
            imported_layers(inner, into);
        }
    }
}
