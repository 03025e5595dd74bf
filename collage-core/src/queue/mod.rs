//! Command Queue
//!
//! The queue owns a [`Collage`] and the linear history of every command executed on it. It is the
//! ground truth for the collage: all modification goes through it, so undo and redo always see the
//! state their commands were built against, or refuse when they don't.
//!
//! Listeners subscribe with an event [`Filter`] and are told about changes once the queue's lock is
//! released, so they may read the collage from within their callback.

use std::sync::Arc;

use crate::{
    commands::{self, CommandConsumer, CommandError, DoUndo},
    state::{
        events::{Event, Filter},
        Collage,
    },
};

pub mod writer;

struct CollageQueueInner {
    collage: Collage,
    /// Every command still reachable by undo or redo, oldest first.
    history: Vec<commands::Command>,
    /// Number of commands in `history` currently applied. Those past it are undone, ready for redo.
    present: usize,
}
impl CollageQueueInner {
    fn undo_target(&self) -> Option<&commands::Command> {
        self.history.get(self.present.checked_sub(1)?)
    }
    fn redo_target(&self) -> Option<&commands::Command> {
        self.history.get(self.present)
    }
}

#[derive(Clone)]
pub struct Listener {
    filter: Filter,
    callback: Arc<dyn Fn(&Event) + Send + Sync>,
}
pub type ListenerID = crate::id::Handle<Listener>;

/// Outcome of a successful undo.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Undone {
    pub label: &'static str,
    /// The undone command followed an edit of the text document, and that edit should be undone
    /// along with it.
    pub chain_host_undo: bool,
}

/// Shared handle to one collage and its history. Clones refer to the same queue.
#[derive(Clone)]
pub struct CollageQueue {
    inner: Arc<parking_lot::RwLock<CollageQueueInner>>,
    listeners: Arc<parking_lot::Mutex<Vec<(ListenerID, Listener)>>>,
}
impl Default for CollageQueue {
    fn default() -> Self {
        Self::from_collage(Collage::new())
    }
}
impl CollageQueue {
    /// A queue over a fresh collage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Create a queue from a collage, without a history.
    #[must_use]
    pub fn from_collage(mut collage: Collage) -> Self {
        collage.record_events(true);
        // Anything that happened before the queue took over is not news to listeners.
        collage.take_events();
        Self {
            inner: Arc::new(
                CollageQueueInner {
                    collage,
                    history: Vec::new(),
                    present: 0,
                }
                .into(),
            ),
            listeners: Arc::default(),
        }
    }
    /// View the collage as it is at this moment.
    pub fn read<F, T>(&self, read: F) -> T
    where
        F: FnOnce(&Collage) -> T,
    {
        read(&self.inner.read().collage)
    }
    /// Clone of the collage as it is at this moment.
    #[must_use]
    pub fn snapshot(&self) -> Collage {
        let mut collage = self.inner.read().collage.clone();
        collage.record_events(false);
        collage
    }
    /// Locks the queue for writing commands during the span of the closure. Every command executed
    /// by the writer is applied immediately. If several are, they enter history as a single Atoms scope.
    pub fn write_with<F, T>(&self, write: F) -> T
    where
        F: FnOnce(&mut writer::CommandQueueWriter<'_>) -> T,
    {
        let (result, events) = {
            let lock = self.inner.write();
            let mut writer = writer::CommandQueueWriter {
                lock,
                commands: smallvec::SmallVec::new(),
                staged_shapes: Vec::new(),
                staged_layers: Vec::new(),
            };
            // Panic safe - the writer's Drop impl keeps history and state synchronized.
            // However, changes will not be notified.
            let result = write(&mut writer);
            (result, writer.take_events())
        };
        self.notify(events);
        result
    }
    /// Execute a single command, making it the latest in history. Anything undone is forgotten.
    pub fn execute(&self, command: impl Into<commands::Command>) -> Result<(), CommandError> {
        self.write_with(|writer| writer.execute(command))
    }
    /// Whether `command` would be accepted by [`Self::execute`] right now.
    #[must_use]
    pub fn can_execute(&self, command: &commands::Command) -> bool {
        self.inner.read().collage.check(DoUndo::Do(command)).is_ok()
    }
    /// Whether there is a command to undo, and its state still matches the collage.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        let lock = self.inner.read();
        lock.undo_target()
            .is_some_and(|command| lock.collage.check(DoUndo::Undo(command)).is_ok())
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        let lock = self.inner.read();
        lock.redo_target()
            .is_some_and(|command| lock.collage.check(DoUndo::Do(command)).is_ok())
    }
    /// Label of the command [`Self::undo`] would undo.
    #[must_use]
    pub fn undo_label(&self) -> Option<&'static str> {
        self.inner.read().undo_target().map(commands::Command::label)
    }
    #[must_use]
    pub fn redo_label(&self) -> Option<&'static str> {
        self.inner.read().redo_target().map(commands::Command::label)
    }
    /// Undo the latest applied command. A command whose state no longer matches the collage
    /// is refused, and stays where it is in history.
    pub fn undo(&self) -> Result<Undone, CommandError> {
        let (undone, events) = {
            let mut lock = self.inner.write();
            let CollageQueueInner {
                collage,
                history,
                present,
            } = &mut *lock;
            let command = present
                .checked_sub(1)
                .and_then(|index| history.get(index))
                .ok_or(CommandError::NoOp)?;
            collage.apply(DoUndo::Undo(command))?;
            *present -= 1;
            log::trace!("Undid {}", command.label());
            let undone = Undone {
                label: command.label(),
                chain_host_undo: command.scope() == Some(commands::ScopeType::DocumentChange),
            };
            (undone, collage.take_events())
        };
        self.notify(events);
        Ok(undone)
    }
    /// Redo the earliest undone command.
    pub fn redo(&self) -> Result<&'static str, CommandError> {
        let (label, events) = {
            let mut lock = self.inner.write();
            let CollageQueueInner {
                collage,
                history,
                present,
            } = &mut *lock;
            let command = history.get(*present).ok_or(CommandError::NoOp)?;
            collage.apply(DoUndo::Do(command))?;
            *present += 1;
            log::trace!("Redid {}", command.label());
            (command.label(), collage.take_events())
        };
        self.notify(events);
        Ok(label)
    }
    /// Undo up to `num` commands, stopping at the first refusal. Returns how many were undone.
    pub fn undo_n(&self, num: usize) -> usize {
        (0..num).take_while(|_| self.undo().is_ok()).count()
    }
    /// Redo up to `num` commands, stopping at the first refusal. Returns how many were redone.
    pub fn redo_n(&self, num: usize) -> usize {
        (0..num).take_while(|_| self.redo().is_ok()).count()
    }
    /// Call `callback` with every future event `filter` accepts, until unsubscribed.
    ///
    /// The callback runs on whichever thread made the change, with no lock of the queue held. It may
    /// use the queue freely, including executing commands of its own. Events those cause are
    /// delivered before the callback's own call returns.
    pub fn subscribe(
        &self,
        filter: Filter,
        callback: impl Fn(&Event) + Send + Sync + 'static,
    ) -> ListenerID {
        let id = ListenerID::next();
        self.listeners.lock().push((
            id,
            Listener {
                filter,
                callback: Arc::new(callback),
            },
        ));
        id
    }
    /// Returns false if there was no such listener.
    pub fn unsubscribe(&self, id: ListenerID) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener, _)| *listener != id);
        listeners.len() != before
    }
    fn notify(&self, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        // Called without the list locked, a callback may subscribe or execute in turn.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for event in &events {
            for listener in &listeners {
                if listener.filter.accepts(event) {
                    (listener.callback)(event);
                }
            }
        }
    }
}
