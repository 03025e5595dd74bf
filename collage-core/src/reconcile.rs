//! Keeping shapes attached to their text as the document under them is edited.

use crate::boundary::{Boundary, DocumentChange, Reconciled};
use crate::commands::{Command, MetaCommand, ScopeType, ShapeCommand};
use crate::resource::ResourceIdentifier;
use crate::state::shape::commands::BoundsRequest;
use crate::state::shape_list::Entry;
use crate::state::Collage;

/// Build the adjustments every live shape over `resource` needs after `change`, in any placed layer,
/// hidden or not. Shapes whose lines moved are moved with them, shapes whose text was deleted
/// outright are deleted.
///
/// The result is a [`ScopeType::DocumentChange`] scope, or None if nothing needs adjusting.
#[must_use]
pub fn handle_document_change(
    collage: &Collage,
    resource: &ResourceIdentifier,
    change: &DocumentChange,
) -> Option<Command> {
    let mut commands = Vec::new();
    for layer in collage.layers() {
        let Some(list) = layer.shape_list(resource) else {
            continue;
        };
        // Deletions apply one after another, so each index is taken as if the ones before it
        // in this list were already gone. Indices count unknown entries too.
        let mut deleted = 0;
        for (index, entry) in list.entries().iter().enumerate() {
            let Entry::Shape(target) = *entry else {
                continue;
            };
            let Some(shape) = collage.shape(target) else {
                continue;
            };
            match shape.boundary().reconcile(change) {
                Reconciled::Unchanged => (),
                Reconciled::Moved(to) => commands.push(
                    ShapeCommand::ConstraintSet {
                        target,
                        request: BoundsRequest::Move,
                        from: *shape.boundary(),
                        to,
                    }
                    .into(),
                ),
                Reconciled::Delete => {
                    commands.push(
                        ShapeCommand::Deleted {
                            target,
                            index: index - deleted,
                        }
                        .into(),
                    );
                    deleted += 1;
                }
            }
        }
    }
    if commands.is_empty() {
        return None;
    }
    log::debug!(
        "Document change {change:?} on {resource} adjusts {} shape(s)",
        commands.len()
    );
    Some(MetaCommand::Scope(ScopeType::DocumentChange, commands.into()).into())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::boundary::LinePointBoundary;
    use crate::commands::{CommandConsumer, DoUndo};
    use crate::state::shape::{ShapeID, ShapeKind};
    use crate::state::{Shape, UnknownShape};
    use crate::util::Point;

    fn resource() -> ResourceIdentifier {
        ResourceIdentifier::for_path("src/main.rs")
    }
    fn collage_with(lines: &[(u32, u32)]) -> (Collage, Vec<ShapeID>) {
        let mut collage = Collage::new();
        let layer = collage.current_layer().unwrap();
        let ids = lines
            .iter()
            .map(|&(top, bottom)| {
                let boundary =
                    LinePointBoundary::from_lines(top, Point::new(0, 0), bottom, Point::new(10, 10));
                let shape = Shape::new(ShapeKind::Rectangle, "").with_boundary(boundary);
                collage.load_shape(layer, &resource(), shape).unwrap()
            })
            .collect();
        (collage, ids)
    }
    fn top_line(collage: &Collage, id: ShapeID) -> u32 {
        collage.shape(id).unwrap().boundary().top_line()
    }

    #[test]
    fn unrelated_change() {
        let (collage, _) = collage_with(&[(5, 8)]);
        // Typing on one line, no lines added.
        let change = DocumentChange::new(2, 2, 2, false);
        assert!(handle_document_change(&collage, &resource(), &change).is_none());
        // Lines added below the shape.
        let change = DocumentChange::new(10, 10, 14, false);
        assert!(handle_document_change(&collage, &resource(), &change).is_none());
        // Other files are never touched.
        let change = DocumentChange::new(1, 1, 5, false);
        let other = ResourceIdentifier::for_path("other.rs");
        assert!(handle_document_change(&collage, &other, &change).is_none());
    }
    #[test]
    fn lines_inserted_above() {
        let (mut collage, ids) = collage_with(&[(5, 8), (20, 21)]);
        let change = DocumentChange::new(2, 2, 5, false);
        let command = handle_document_change(&collage, &resource(), &change).unwrap();
        assert_eq!(command.scope(), Some(ScopeType::DocumentChange));
        assert_eq!(command.label(), "text editing");

        collage.apply(DoUndo::Do(&command)).unwrap();
        assert_eq!(top_line(&collage, ids[0]), 8);
        assert_eq!(top_line(&collage, ids[1]), 23);
        collage.apply(DoUndo::Undo(&command)).unwrap();
        assert_eq!(top_line(&collage, ids[0]), 5);
    }
    #[test]
    fn deletions_undo_in_place() {
        let (mut collage, ids) = collage_with(&[(3, 3), (30, 31), (4, 4), (40, 40)]);
        let layer = collage.current_layer().unwrap();
        // Removes lines 2 to 9 entirely, taking the first and third shape with it.
        let change = DocumentChange::new(2, 10, 2, true);
        let command = handle_document_change(&collage, &resource(), &change).unwrap();

        collage.apply(DoUndo::Do(&command)).unwrap();
        let list = collage.shape_list(layer, &resource()).unwrap();
        assert_eq!(list.shapes().collect::<Vec<_>>(), [ids[1], ids[3]]);
        assert!(collage.shape(ids[0]).unwrap().is_deleted());

        collage.apply(DoUndo::Undo(&command)).unwrap();
        let list = collage.shape_list(layer, &resource()).unwrap();
        assert_eq!(list.shapes().collect::<Vec<_>>(), ids);
        assert_eq!(top_line(&collage, ids[1]), 30);
    }
    #[test]
    fn deletions_keep_unknown_order() {
        let mut collage = Collage::new();
        let layer = collage.current_layer().unwrap();
        let mut raw = toml::Table::new();
        raw.insert("type".into(), "hologram".into());
        collage.load_unknown(layer, &resource(), UnknownShape::new(raw));
        let ids: Vec<_> = [(5, 6), (7, 8)]
            .into_iter()
            .map(|(top, bottom)| {
                let boundary =
                    LinePointBoundary::from_lines(top, Point::new(0, 0), bottom, Point::new(10, 10));
                let shape = Shape::new(ShapeKind::Rectangle, "").with_boundary(boundary);
                collage.load_shape(layer, &resource(), shape).unwrap()
            })
            .collect();
        let before = collage.shape_list(layer, &resource()).unwrap().entries().to_vec();

        let change = DocumentChange::new(4, 10, 4, true);
        let command = handle_document_change(&collage, &resource(), &change).unwrap();
        collage.apply(DoUndo::Do(&command)).unwrap();
        let list = collage.shape_list(layer, &resource()).unwrap();
        assert_eq!(list.shapes().count(), 0);
        assert_eq!(list.unknown().count(), 1);

        collage.apply(DoUndo::Undo(&command)).unwrap();
        let list = collage.shape_list(layer, &resource()).unwrap();
        assert_eq!(list.entries(), before);
        assert_eq!(list.shapes().collect::<Vec<_>>(), ids);
    }
    #[test]
    fn stale_after_direct_edit() {
        let (mut collage, ids) = collage_with(&[(5, 8)]);
        let change = DocumentChange::new(1, 1, 3, false);
        let command = handle_document_change(&collage, &resource(), &change).unwrap();
        collage.apply(DoUndo::Do(&command)).unwrap();

        // Moved by hand afterwards, so the adjustment can't be undone.
        let moved = LinePointBoundary::from_lines(1, Point::new(0, 0), 2, Point::new(1, 1));
        let by_hand: Command = ShapeCommand::set_constraint(&collage, ids[0], BoundsRequest::Move, moved)
            .unwrap()
            .into();
        collage.apply(DoUndo::Do(&by_hand)).unwrap();
        assert!(collage.check(DoUndo::Undo(&command)).is_err());
    }
}
