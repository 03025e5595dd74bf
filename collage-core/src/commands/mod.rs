//! # Commands
//!
//! Commands are the only way the shared collage state is modified. Each one records everything needed
//! to apply it in either direction, captured from the state at the moment the command was built.
//!
//! Applying a command in either direction first re-validates that captured state against the present,
//! so a command whose world has moved on (through a direct edit, or a document change it didn't know
//! about) is refused rather than blindly replayed.

pub use crate::state::layer::commands::Command as LayerCommand;
pub use crate::state::shape::commands::Command as ShapeCommand;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    #[error("command constructed for a state that does not match the current state")]
    MismatchedState,
    #[error("resource referenced by the command is not found")]
    UnknownResource,
    #[error("command makes no changes")]
    NoOp,
    /// A precondition that isn't about stale state, such as deleting the last layer.
    #[error("command refused: {0}")]
    Refused(&'static str),
}
pub trait CommandConsumer<C> {
    /// Check whether a command could be applied right now, without applying it.
    fn check(&self, command: DoUndo<'_, C>) -> Result<(), CommandError>;
    /// Apply a single command. If this generates an error,
    /// the state of `self` should *not* be observably changed.
    fn apply(&mut self, command: DoUndo<'_, C>) -> Result<(), CommandError>;
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeType {
    /// Commands are grouped because they were individual parts in part of a single, larger operation.
    Atoms,
    /// Shape adjustments following one edit of the underlying text document.
    ///
    /// Undoing one of these means the text edit that caused it should be undone too,
    /// see [`crate::queue::Undone`].
    DocumentChange,
    /// A command writer panicked mid write. The commands contained may be part of an incomplete operation,
    /// but are still tracked to keep the history consistent with the state.
    WritePanic,
}
/// Commands about commands!
#[derive(Clone, Debug)]
pub enum MetaCommand {
    /// Bundle many commands into one big group. Can be nested many times.
    /// Grouped commands are treated as a single command, as far as the user can tell.
    Scope(ScopeType, Box<[Command]>),
}

#[derive(Clone, Debug)]
pub enum Command {
    Meta(MetaCommand),
    Shape(ShapeCommand),
    Layer(LayerCommand),
}
impl From<MetaCommand> for Command {
    fn from(value: MetaCommand) -> Self {
        Self::Meta(value)
    }
}
impl From<ShapeCommand> for Command {
    fn from(value: ShapeCommand) -> Self {
        Self::Shape(value)
    }
}
impl From<LayerCommand> for Command {
    fn from(value: LayerCommand) -> Self {
        Self::Layer(value)
    }
}
impl Command {
    #[must_use]
    pub fn meta(&self) -> Option<&MetaCommand> {
        match self {
            Self::Meta(m) => Some(m),
            _ => None,
        }
    }
    #[must_use]
    pub fn shape(&self) -> Option<&ShapeCommand> {
        match self {
            Self::Shape(m) => Some(m),
            _ => None,
        }
    }
    #[must_use]
    pub fn layer(&self) -> Option<&LayerCommand> {
        match self {
            Self::Layer(m) => Some(m),
            _ => None,
        }
    }
    /// The scope type, if this is a scope.
    #[must_use]
    pub fn scope(&self) -> Option<ScopeType> {
        match self {
            Self::Meta(MetaCommand::Scope(ty, _)) => Some(*ty),
            _ => None,
        }
    }
    /// Short description for undo/redo menus.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Meta(MetaCommand::Scope(ScopeType::DocumentChange, _)) => "text editing",
            // A scope reads as whatever it mostly is: its first command.
            Self::Meta(MetaCommand::Scope(_, commands)) => {
                commands.first().map_or("nothing", Command::label)
            }
            Self::Shape(shape) => shape.label(),
            Self::Layer(layer) => layer.label(),
        }
    }
}

pub enum DoUndo<'c, T> {
    Do(&'c T),
    Undo(&'c T),
}
// Manual impls, T need not be Clone.
impl<T> Clone for DoUndo<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for DoUndo<'_, T> {}
impl<T: std::fmt::Debug> std::fmt::Debug for DoUndo<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Do(c) => write!(f, "Do({c:?})"),
            Self::Undo(c) => write!(f, "Undo({c:?})"),
        }
    }
}
impl<'c, T> DoUndo<'c, T> {
    #[must_use]
    pub fn command(&self) -> &'c T {
        match self {
            Self::Do(c) | Self::Undo(c) => c,
        }
    }
    #[must_use]
    pub fn is_undo(&self) -> bool {
        matches!(self, Self::Undo(_))
    }
    /// The same command, the other way around.
    #[must_use]
    pub fn reversed(&self) -> Self {
        match *self {
            Self::Do(c) => Self::Undo(c),
            Self::Undo(c) => Self::Do(c),
        }
    }
    /// Apply a closure to the inner type T, maintaining the
    /// Do or Undo status. Returns None if the closure returns None.
    pub fn filter_map<Func, Return>(&self, f: Func) -> Option<DoUndo<'c, Return>>
    where
        Func: FnOnce(&'c T) -> Option<&'c Return>,
        Return: 'c,
    {
        match self {
            Self::Do(c) => Some(DoUndo::Do(f(c)?)),
            Self::Undo(c) => Some(DoUndo::Undo(f(c)?)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn direction_is_kept() {
        let scope: Command = MetaCommand::Scope(ScopeType::Atoms, Box::new([])).into();
        let undo = DoUndo::Undo(&scope);
        assert!(undo.filter_map(Command::shape).is_none());
        let meta = undo.filter_map(Command::meta).unwrap();
        assert!(meta.is_undo());
        assert!(!meta.reversed().is_undo());
        assert_eq!(undo.reversed().command().scope(), Some(ScopeType::Atoms));
    }
}
