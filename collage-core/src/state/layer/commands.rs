use super::LayerID;
use crate::commands::CommandError;
use crate::dependency::{self, PluginDependency};
use crate::state::Collage;

#[derive(Clone, Debug)]
pub enum Command {
    Created {
        target: LayerID,
        name: String,
        index: usize,
    },
    Deleted {
        target: LayerID,
        /// Position before deletion, restored on undo.
        index: usize,
    },
    Renamed {
        target: LayerID,
        from: String,
        to: String,
    },
    /// Move a layer, keeping whichever layer is active active.
    Reordered {
        target: LayerID,
        from: usize,
        to: usize,
    },
    VisibilityToggled {
        target: LayerID,
    },
    ActiveChanged {
        from: LayerID,
        to: LayerID,
        /// Activating shows the layer, undo hides it again.
        to_was_hidden: bool,
    },
    /// Layers staged from another collage, appended in order.
    Imported {
        layers: Box<[LayerID]>,
        dependencies_before: Vec<PluginDependency>,
        dependencies_after: Vec<PluginDependency>,
    },
}
impl Command {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created { .. } => "layer creation",
            Self::Deleted { .. } => "layer deletion",
            Self::Renamed { .. } => "layer rename",
            Self::Reordered { .. } => "layer reorder",
            Self::VisibilityToggled { .. } => "layer show/hide",
            Self::ActiveChanged { .. } => "active layer change",
            Self::Imported { .. } => "layer import",
        }
    }
    /// The layer this command is about, or None for imports.
    #[must_use]
    pub fn target(&self) -> Option<LayerID> {
        match self {
            Self::Created { target, .. }
            | Self::Deleted { target, .. }
            | Self::Renamed { target, .. }
            | Self::Reordered { target, .. }
            | Self::VisibilityToggled { target } => Some(*target),
            Self::ActiveChanged { to, .. } => Some(*to),
            Self::Imported { .. } => None,
        }
    }
}
// Constructors capture the present state of the collage.
// Whether the command may run is left to `CommandConsumer::check`.
impl Command {
    /// A fresh layer with the next free name, on top of the others.
    #[must_use]
    pub fn create(collage: &Collage) -> Self {
        Self::Created {
            target: LayerID::next(),
            name: collage.new_layer_name(),
            index: collage.layer_count(),
        }
    }
    pub fn delete(collage: &Collage, target: LayerID) -> Result<Self, CommandError> {
        let index = collage
            .layer_index(target)
            .ok_or(CommandError::UnknownResource)?;
        Ok(Self::Deleted { target, index })
    }
    pub fn rename(
        collage: &Collage,
        target: LayerID,
        name: impl Into<String>,
    ) -> Result<Self, CommandError> {
        let layer = collage.layer(target).ok_or(CommandError::UnknownResource)?;
        Ok(Self::Renamed {
            target,
            from: layer.name().to_owned(),
            to: name.into(),
        })
    }
    pub fn reorder(collage: &Collage, target: LayerID, to: usize) -> Result<Self, CommandError> {
        let from = collage
            .layer_index(target)
            .ok_or(CommandError::UnknownResource)?;
        Ok(Self::Reordered { target, from, to })
    }
    pub fn toggle_visible(collage: &Collage, target: LayerID) -> Result<Self, CommandError> {
        collage
            .layer_index(target)
            .ok_or(CommandError::UnknownResource)?;
        Ok(Self::VisibilityToggled { target })
    }
    pub fn activate(collage: &Collage, target: LayerID) -> Result<Self, CommandError> {
        let layer = collage.layer(target).ok_or(CommandError::UnknownResource)?;
        let from = collage
            .current_layer()
            .ok_or(CommandError::UnknownResource)?;
        Ok(Self::ActiveChanged {
            from,
            to: target,
            to_was_hidden: !layer.is_visible(),
        })
    }
    /// Append layers previously staged with [`Collage::stage_layers`], folding in the missing
    /// dependencies of the collage they came from.
    #[must_use]
    pub fn import(
        collage: &Collage,
        layers: impl Into<Box<[LayerID]>>,
        imported_dependencies: &[PluginDependency],
    ) -> Self {
        let dependencies_before = collage.dependencies().to_vec();
        let mut dependencies_after = dependencies_before.clone();
        dependency::absorb_missing(&mut dependencies_after, imported_dependencies);
        Self::Imported {
            layers: layers.into(),
            dependencies_before,
            dependencies_after,
        }
    }
}
