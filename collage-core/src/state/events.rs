//! # Events
//!
//! Every observable change to a [`Collage`](super::Collage) is recorded as an [`Event`]. The
//! [queue](crate::queue) drains them after each operation and hands them to listeners once its lock is
//! released, so a listener may freely read the collage again.

use super::{LayerID, ShapeID};
use crate::resource::ResourceIdentifier;

/// Which part of a shape changed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, strum::AsRefStr)]
pub enum ShapeProperty {
    #[strum(serialize = "Shape.constraints")]
    Constraints,
    #[strum(serialize = "ColouredShape.colour")]
    Colour,
    #[strum(serialize = "VariableLineWidthShape.lineWidth")]
    LineWidth,
    #[strum(serialize = "TextNoteShape.text")]
    Text,
    #[strum(serialize = "SketchShape.points")]
    Points,
    #[strum(serialize = "shape.dateLastModified")]
    LastModified,
}

#[derive(Clone, PartialEq, Eq, Debug, strum::EnumDiscriminants)]
#[strum_discriminants(name(EventKind), derive(Hash, strum::AsRefStr))]
pub enum Event {
    Shape {
        target: ShapeID,
        property: ShapeProperty,
    },
    /// A shape joined the list for `resource` in `layer`.
    ShapeAdded {
        layer: LayerID,
        resource: ResourceIdentifier,
        shape: ShapeID,
    },
    ShapeRemoved {
        layer: LayerID,
        resource: ResourceIdentifier,
        shape: ShapeID,
    },
    /// A layer gained a shape list for a resource it had none for.
    ShapeListAdded {
        layer: LayerID,
        resource: ResourceIdentifier,
    },
    ShapeListRemoved {
        layer: LayerID,
        resource: ResourceIdentifier,
    },
    /// A shape list went from empty to non-empty, or back.
    ShapeListPopulated {
        layer: LayerID,
        resource: ResourceIdentifier,
        populated: bool,
    },
    LayerVisible {
        layer: LayerID,
        visible: bool,
    },
    LayerName {
        layer: LayerID,
        name: String,
    },
    LayerAdded(LayerID),
    LayerRemoved(LayerID),
    /// A layer moved within the stack.
    LayerOrder(LayerID),
    /// The active layer changed, by selection or because the old one went away.
    ActiveLayer {
        from: Option<LayerID>,
        to: Option<LayerID>,
    },
    /// Some layer was shown or hidden. Sent alongside [`Event::LayerVisible`] for listeners
    /// which only watch the layer list as a whole.
    ChildVisibility(LayerID),
    Dependencies,
}

/// Which events a listener wants to hear about.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Filter {
    All,
    Kind(EventKind),
    /// Only shape events for this one property.
    Shape(ShapeProperty),
}
impl Filter {
    #[must_use]
    pub fn accepts(&self, event: &Event) -> bool {
        match self {
            Self::All => true,
            Self::Kind(kind) => EventKind::from(event) == *kind,
            Self::Shape(wanted) => {
                matches!(event, Event::Shape { property, .. } if property == wanted)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::id::Handle;

    #[test]
    fn filters() {
        let shape = Event::Shape {
            target: Handle::next(),
            property: ShapeProperty::Colour,
        };
        let layer = Event::LayerAdded(Handle::next());

        assert!(Filter::All.accepts(&shape));
        assert!(Filter::Kind(EventKind::Shape).accepts(&shape));
        assert!(!Filter::Kind(EventKind::Shape).accepts(&layer));
        assert!(Filter::Shape(ShapeProperty::Colour).accepts(&shape));
        assert!(!Filter::Shape(ShapeProperty::Constraints).accepts(&shape));
        assert!(!Filter::Shape(ShapeProperty::Colour).accepts(&layer));
    }
    #[test]
    fn property_names() {
        assert_eq!(ShapeProperty::Constraints.as_ref(), "Shape.constraints");
        assert_eq!(EventKind::LayerName.as_ref(), "LayerName");
    }
}
