use super::{Appearance, Shape, ShapeID};
use crate::boundary::LinePointBoundary;
use crate::commands::CommandError;
use crate::property::{PropertyError, PropertyId};
use crate::resource::ResourceIdentifier;
use crate::state::{Collage, LayerID};

/// What kind of interaction asked for new bounds.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BoundsRequest {
    Move,
    MoveChildren,
    Resize,
    ResizeChildren,
    /// Dropped in from another container.
    Add,
    /// Dragged out to another container.
    Orphan,
}
impl BoundsRequest {
    /// Whether this request is satisfied by changing the shape's own boundary.
    #[must_use]
    pub fn sets_constraint(self) -> bool {
        matches!(
            self,
            Self::Move | Self::MoveChildren | Self::Resize | Self::ResizeChildren
        )
    }
}

#[derive(Clone, Debug)]
pub enum Command {
    /// Place a staged shape at the end of the active layer's list for `resource`.
    Created {
        target: ShapeID,
        layer: LayerID,
        resource: ResourceIdentifier,
        boundary: LinePointBoundary,
    },
    Deleted {
        target: ShapeID,
        /// Position in its list before deletion, restored on undo.
        index: usize,
    },
    ConstraintSet {
        target: ShapeID,
        request: BoundsRequest,
        from: LinePointBoundary,
        to: LinePointBoundary,
    },
    Restyled {
        target: ShapeID,
        from: Appearance,
        to: Appearance,
    },
}
impl Command {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created { .. } => "shape creation",
            Self::Deleted { .. } => "shape deletion",
            Self::ConstraintSet { .. } => "move / resize",
            Self::Restyled {
                to: Appearance::Text(_),
                ..
            } => "text note editing",
            Self::Restyled { .. } => "appearance change",
        }
    }
    #[must_use]
    pub fn target(&self) -> ShapeID {
        match self {
            Self::Created { target, .. }
            | Self::Deleted { target, .. }
            | Self::ConstraintSet { target, .. }
            | Self::Restyled { target, .. } => *target,
        }
    }
}
// Constructors capture the present state of the collage.
// Whether the command may run is left to `CommandConsumer::check`.
impl Command {
    /// Create a staged shape (see [`Collage::stage_shape`]) in the active layer.
    pub fn create(
        collage: &Collage,
        target: ShapeID,
        resource: ResourceIdentifier,
        boundary: LinePointBoundary,
    ) -> Result<Self, CommandError> {
        collage.shape(target).ok_or(CommandError::UnknownResource)?;
        let layer = collage
            .current_layer()
            .ok_or(CommandError::UnknownResource)?;
        Ok(Self::Created {
            target,
            layer,
            resource,
            boundary,
        })
    }
    pub fn delete(collage: &Collage, target: ShapeID) -> Result<Self, CommandError> {
        let parent = collage
            .shape(target)
            .and_then(Shape::parent)
            .ok_or(CommandError::UnknownResource)?;
        let index = collage
            .shape_list(parent.layer, &parent.resource)
            .and_then(|list| list.index_of(target))
            .ok_or(CommandError::MismatchedState)?;
        Ok(Self::Deleted { target, index })
    }
    pub fn set_constraint(
        collage: &Collage,
        target: ShapeID,
        request: BoundsRequest,
        to: LinePointBoundary,
    ) -> Result<Self, CommandError> {
        let shape = collage.shape(target).ok_or(CommandError::UnknownResource)?;
        Ok(Self::ConstraintSet {
            target,
            request,
            from: *shape.boundary(),
            to,
        })
    }
    pub fn restyle(
        collage: &Collage,
        target: ShapeID,
        to: Appearance,
    ) -> Result<Self, CommandError> {
        let shape = collage.shape(target).ok_or(CommandError::UnknownResource)?;
        let from = shape
            .appearance(to.property())
            .ok_or(CommandError::Refused("shape has no such property"))?;
        Ok(Self::Restyled { target, from, to })
    }
    /// The command setting one property of `shape` from its text form.
    /// Read-only and unsupported properties and invalid values are refused here.
    pub fn set_property(
        target: ShapeID,
        shape: &Shape,
        id: PropertyId,
        value: &str,
    ) -> Result<Self, PropertyError> {
        if LinePointBoundary::has_property(id) {
            return Ok(Self::ConstraintSet {
                target,
                request: BoundsRequest::Resize,
                from: *shape.boundary(),
                to: shape.boundary().with_property(id, value)?,
            });
        }
        let to = shape.parse_appearance(id, value)?;
        let from = shape
            .appearance(to.property())
            .ok_or(PropertyError::Unsupported(id.into()))?;
        Ok(Self::Restyled { target, from, to })
    }
}
