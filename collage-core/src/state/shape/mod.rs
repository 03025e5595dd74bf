//! # Shapes
//!
//! Annotations drawn over a resource. Every shape has a [`LinePointBoundary`] and creation metadata,
//! and a kind which decides what else it carries: all kinds are coloured, the drawn kinds have a line
//! width, sketches carry their stroke and notes carry their text.

pub mod commands;

use super::{events::ShapeProperty, LayerID};
use crate::boundary::{Boundary, LinePointBoundary};
use crate::color::Rgb;
use crate::dependency;
use crate::points::PointList;
use crate::property::{self, Category, PropertyDescriptor, PropertyError, PropertyId, PropertyKind};
use crate::resource::ResourceIdentifier;

pub type ShapeID = crate::id::Handle<Shape>;

pub const DEFAULT_LINE_WIDTH: u32 = 3;
const CONDENSED_LINE_LENGTH: usize = 40;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    /// Stroke points, relative to the shape's origin.
    Sketch(PointList),
    TextNote(String),
}
impl ShapeKind {
    /// Name of the kind in saved files.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Ellipse => "ellipse",
            Self::Sketch(_) => "sketch",
            Self::TextNote(_) => "textNote",
        }
    }
    /// Plugin providing this kind, for dependency pruning.
    #[must_use]
    pub fn plugin_id(&self) -> &'static str {
        match self {
            Self::Rectangle | Self::Ellipse | Self::Sketch(_) => dependency::DRAW_PLUGIN_ID,
            Self::TextNote(_) => dependency::TEXT_PLUGIN_ID,
        }
    }
    #[must_use]
    pub fn has_line_width(&self) -> bool {
        !matches!(self, Self::TextNote(_))
    }
}

/// One part of a shape's look, as replaced by a style edit.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Appearance {
    Colour(Rgb),
    LineWidth(u32),
    Text(String),
    Points(PointList),
}
impl Appearance {
    #[must_use]
    pub fn property(&self) -> ShapeProperty {
        match self {
            Self::Colour(_) => ShapeProperty::Colour,
            Self::LineWidth(_) => ShapeProperty::LineWidth,
            Self::Text(_) => ShapeProperty::Text,
            Self::Points(_) => ShapeProperty::Points,
        }
    }
}

/// Where a shape lives. Kept after deletion, so the deletion can be undone.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ShapeParent {
    pub layer: LayerID,
    pub resource: ResourceIdentifier,
}

#[derive(Clone, Debug)]
pub struct Shape {
    kind: ShapeKind,
    boundary: LinePointBoundary,
    colour: Rgb,
    line_width: Option<u32>,
    creator: String,
    date_created: chrono::DateTime<chrono::Utc>,
    date_last_modified: chrono::DateTime<chrono::Utc>,
    /// Set once a create command has placed the shape in a list.
    created: bool,
    deleted: bool,
    parent: Option<ShapeParent>,
}

const METADATA_DESCRIPTORS: [PropertyDescriptor; 3] = [
    PropertyDescriptor::new(
        PropertyId::Creator,
        "Creator",
        "",
        Category::Metadata,
        PropertyKind::ReadOnly,
    ),
    PropertyDescriptor::new(
        PropertyId::DateCreated,
        "Date created",
        "",
        Category::Metadata,
        PropertyKind::ReadOnly,
    ),
    PropertyDescriptor::new(
        PropertyId::DateLastModified,
        "Date last modified",
        "",
        Category::Metadata,
        PropertyKind::ReadOnly,
    ),
];
const COLOUR_DESCRIPTOR: PropertyDescriptor = PropertyDescriptor::new(
    PropertyId::Colour,
    "Colour",
    "",
    Category::Appearance,
    PropertyKind::Colour,
);
const LINE_WIDTH_DESCRIPTOR: PropertyDescriptor = PropertyDescriptor::new(
    PropertyId::LineWidth,
    "Line width",
    "",
    Category::Appearance,
    PropertyKind::Numeric,
);
const TEXT_DESCRIPTOR: PropertyDescriptor = PropertyDescriptor::new(
    PropertyId::Text,
    "Text",
    "Text",
    Category::Appearance,
    PropertyKind::Text,
);

// Public methods for client
impl Shape {
    /// A new, not yet created, shape of the default size and colour.
    #[must_use]
    pub fn new(kind: ShapeKind, creator: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            line_width: kind.has_line_width().then_some(DEFAULT_LINE_WIDTH),
            kind,
            boundary: LinePointBoundary::default(),
            colour: Rgb::BLACK,
            creator: creator.into(),
            date_created: now,
            date_last_modified: now,
            created: false,
            deleted: false,
            parent: None,
        }
    }
    #[must_use]
    pub fn with_boundary(mut self, boundary: LinePointBoundary) -> Self {
        self.boundary = boundary;
        self
    }
    #[must_use]
    pub fn with_colour(mut self, colour: Rgb) -> Self {
        self.colour = colour;
        self
    }
    /// Ignored for kinds without a line width.
    #[must_use]
    pub fn with_line_width(mut self, width: u32) -> Self {
        if self.kind.has_line_width() {
            self.line_width = Some(width.max(1));
        }
        self
    }
    #[must_use]
    pub fn with_dates(
        mut self,
        created: chrono::DateTime<chrono::Utc>,
        last_modified: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        self.date_created = created;
        self.date_last_modified = last_modified;
        self
    }
    #[must_use]
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }
    #[must_use]
    pub fn boundary(&self) -> &LinePointBoundary {
        &self.boundary
    }
    #[must_use]
    pub fn colour(&self) -> Rgb {
        self.colour
    }
    #[must_use]
    pub fn line_width(&self) -> Option<u32> {
        self.line_width
    }
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            ShapeKind::TextNote(text) => Some(text),
            _ => None,
        }
    }
    #[must_use]
    pub fn points(&self) -> Option<&PointList> {
        match &self.kind {
            ShapeKind::Sketch(points) => Some(points),
            _ => None,
        }
    }
    #[must_use]
    pub fn creator(&self) -> &str {
        &self.creator
    }
    #[must_use]
    pub fn date_created(&self) -> chrono::DateTime<chrono::Utc> {
        self.date_created
    }
    #[must_use]
    pub fn date_last_modified(&self) -> chrono::DateTime<chrono::Utc> {
        self.date_last_modified
    }
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.created
    }
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
    /// Created and not deleted.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.created && !self.deleted
    }
    #[must_use]
    pub fn parent(&self) -> Option<&ShapeParent> {
        self.parent.as_ref()
    }
    /// Current value of one part of the appearance, if this kind has it.
    #[must_use]
    pub fn appearance(&self, property: ShapeProperty) -> Option<Appearance> {
        match property {
            ShapeProperty::Colour => Some(Appearance::Colour(self.colour)),
            ShapeProperty::LineWidth => self.line_width.map(Appearance::LineWidth),
            ShapeProperty::Text => self.text().map(|text| Appearance::Text(text.to_owned())),
            ShapeProperty::Points => self.points().cloned().map(Appearance::Points),
            ShapeProperty::Constraints | ShapeProperty::LastModified => None,
        }
    }
    #[must_use]
    pub fn property_descriptors(&self) -> Vec<PropertyDescriptor> {
        let mut descriptors = Vec::with_capacity(10);
        descriptors.extend_from_slice(&METADATA_DESCRIPTORS);
        descriptors.extend_from_slice(&LinePointBoundary::DESCRIPTORS);
        descriptors.push(COLOUR_DESCRIPTOR);
        if self.line_width.is_some() {
            descriptors.push(LINE_WIDTH_DESCRIPTOR);
        }
        if self.text().is_some() {
            descriptors.push(TEXT_DESCRIPTOR);
        }
        descriptors
    }
    /// Text form of a property, or None if this shape doesn't have it.
    #[must_use]
    pub fn property_value(&self, id: PropertyId) -> Option<String> {
        match id {
            PropertyId::Creator => Some(self.creator.clone()),
            PropertyId::DateCreated => Some(format_date(self.date_created)),
            PropertyId::DateLastModified => Some(format_date(self.date_last_modified)),
            PropertyId::Colour => Some(self.colour.to_string()),
            PropertyId::LineWidth => self.line_width.map(|width| width.to_string()),
            PropertyId::Text => self.text().map(str::to_owned),
            boundary => self.boundary.property_value(boundary),
        }
    }
    /// Parse a new value for an appearance property.
    pub fn parse_appearance(&self, id: PropertyId, value: &str) -> Result<Appearance, PropertyError> {
        match id {
            PropertyId::Colour => Ok(Appearance::Colour(value.parse()?)),
            PropertyId::LineWidth if self.line_width.is_some() => {
                Ok(Appearance::LineWidth(property::positive_integer(value)?))
            }
            PropertyId::Text if self.text().is_some() => Ok(Appearance::Text(value.to_owned())),
            PropertyId::Creator | PropertyId::DateCreated | PropertyId::DateLastModified => {
                Err(PropertyError::ReadOnly(id.into()))
            }
            other => Err(PropertyError::Unsupported(other.into())),
        }
    }
}
impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let location = self.boundary.description();
        match &self.kind {
            ShapeKind::Rectangle => write!(f, "Rectangle ({location})"),
            ShapeKind::Ellipse => write!(f, "Ellipse ({location})"),
            ShapeKind::Sketch(points) => {
                write!(f, "Freehand sketch ({} points, {location})", points.len())
            }
            ShapeKind::TextNote(text) => write!(f, "{} ({location})", condense(text)),
        }
    }
}
// Private methods for writer/applier
impl Shape {
    fn touch(&mut self) {
        self.date_last_modified = chrono::Utc::now();
    }
    /// Returns whether anything changed.
    fn set_boundary(&mut self, boundary: LinePointBoundary) -> bool {
        if self.boundary == boundary {
            return false;
        }
        self.boundary = boundary;
        self.touch();
        true
    }
    /// Returns whether anything changed, or None if this kind has no such part.
    fn set_appearance(&mut self, appearance: &Appearance) -> Option<bool> {
        let changed = match (appearance, &mut self.kind) {
            (Appearance::Colour(colour), _) => {
                std::mem::replace(&mut self.colour, *colour) != *colour
            }
            (Appearance::LineWidth(width), _) => {
                let current = self.line_width.as_mut()?;
                std::mem::replace(current, *width) != *width
            }
            (Appearance::Text(new), ShapeKind::TextNote(text)) => {
                if *text == *new {
                    false
                } else {
                    *text = new.clone();
                    true
                }
            }
            (Appearance::Points(new), ShapeKind::Sketch(points)) => {
                if *points == *new {
                    false
                } else {
                    *points = new.clone();
                    true
                }
            }
            _ => return None,
        };
        if changed {
            self.touch();
        }
        Some(changed)
    }
    fn set_created(&mut self, created: bool) {
        self.created = created;
    }
    fn set_deleted(&mut self, deleted: bool) {
        self.deleted = deleted;
    }
    fn set_parent(&mut self, parent: ShapeParent) {
        self.parent = Some(parent);
    }
}
// Loading bypasses the command layer: a loaded shape is created from the start.
impl Shape {
    pub(crate) fn loaded(mut self, parent: ShapeParent) -> Self {
        self.created = true;
        self.deleted = false;
        self.parent = Some(parent);
        self
    }
}

use super::{events::Event, Collage};
use crate::commands::{CommandConsumer, CommandError, DoUndo};
use commands::Command;
impl CommandConsumer<Command> for Collage {
    fn check(&self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
        let shape = self
            .shapes
            .get(&command.command().target())
            .ok_or(CommandError::UnknownResource)?;
        match command {
            DoUndo::Do(Command::Created { layer, .. }) => {
                if shape.created || shape.deleted {
                    Err(CommandError::MismatchedState)
                } else if !self.is_active(*layer) {
                    Err(CommandError::Refused("shapes are only created in the active layer"))
                } else {
                    Ok(())
                }
            }
            DoUndo::Undo(Command::Created { boundary, .. }) => {
                if !shape.is_live() || shape.boundary != *boundary {
                    Err(CommandError::MismatchedState)
                } else if !shape
                    .parent
                    .as_ref()
                    .is_some_and(|parent| self.is_active(parent.layer))
                {
                    Err(CommandError::Refused("shape is not in the active layer"))
                } else {
                    Ok(())
                }
            }
            DoUndo::Do(Command::Deleted { target, .. }) => {
                let parent = shape.parent.as_ref().ok_or(CommandError::UnknownResource)?;
                if !shape.is_live() {
                    return Err(CommandError::MismatchedState);
                }
                let list = self
                    .shape_list(parent.layer, &parent.resource)
                    .ok_or(CommandError::UnknownResource)?;
                if list.contains(*target) {
                    Ok(())
                } else {
                    Err(CommandError::MismatchedState)
                }
            }
            DoUndo::Undo(Command::Deleted { .. }) => {
                let parent = shape.parent.as_ref().ok_or(CommandError::UnknownResource)?;
                if !(shape.created && shape.deleted) {
                    Err(CommandError::MismatchedState)
                } else if self.layer_index(parent.layer).is_none() {
                    Err(CommandError::UnknownResource)
                } else {
                    Ok(())
                }
            }
            DoUndo::Do(Command::ConstraintSet {
                request, from, to, ..
            })
            | DoUndo::Undo(Command::ConstraintSet {
                request,
                from: to,
                to: from,
                ..
            }) => {
                if !request.sets_constraint() {
                    Err(CommandError::Refused("request does not set bounds"))
                } else if from == to {
                    Err(CommandError::NoOp)
                } else if !shape.is_live() || shape.boundary != *from {
                    Err(CommandError::MismatchedState)
                } else {
                    Ok(())
                }
            }
            DoUndo::Do(Command::Restyled { from, to, .. })
            | DoUndo::Undo(Command::Restyled {
                from: to, to: from, ..
            }) => {
                if from == to {
                    Err(CommandError::NoOp)
                } else if from.property() != to.property() {
                    Err(CommandError::Refused("style change between different properties"))
                } else if !shape.is_live() || shape.appearance(from.property()).as_ref() != Some(from)
                {
                    Err(CommandError::MismatchedState)
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
                layer,
                resource,
                boundary,
            }) => {
                let parent = ShapeParent {
                    layer: *layer,
                    resource: resource.clone(),
                };
                self.place_shape(*target, parent, usize::MAX)?;
                self.update_shape(*target, |shape| {
                    shape.set_created(true);
                    shape
                        .set_boundary(*boundary)
                        .then_some(ShapeProperty::Constraints)
                });
            }
            DoUndo::Undo(Command::Created { target, .. }) => {
                self.unplace_shape(*target)?;
                self.update_shape(*target, |shape| {
                    shape.set_created(false);
                    None
                });
            }
            DoUndo::Do(Command::Deleted { target, .. }) => {
                self.unplace_shape(*target)?;
                self.update_shape(*target, |shape| {
                    shape.set_deleted(true);
                    None
                });
            }
            DoUndo::Undo(Command::Deleted { target, index }) => {
                let parent = self
                    .shapes
                    .get(target)
                    .and_then(|shape| shape.parent.clone())
                    .ok_or(CommandError::UnknownResource)?;
                self.place_shape(*target, parent, *index)?;
                self.update_shape(*target, |shape| {
                    shape.set_deleted(false);
                    None
                });
            }
            DoUndo::Do(Command::ConstraintSet { target, to, .. })
            | DoUndo::Undo(Command::ConstraintSet {
                target, from: to, ..
            }) => {
                self.update_shape(*target, |shape| {
                    shape
                        .set_boundary(*to)
                        .then_some(ShapeProperty::Constraints)
                });
            }
            DoUndo::Do(Command::Restyled { target, to, .. })
            | DoUndo::Undo(Command::Restyled {
                target, from: to, ..
            }) => {
                self.update_shape(*target, |shape| {
                    shape
                        .set_appearance(to)
                        .unwrap_or_default()
                        .then(|| to.property())
                });
            }
        }
        Ok(())
    }
}
impl Collage {
    /// Run `f` on a shape, reporting the property it says changed along with the modification time.
    fn update_shape(
        &mut self,
        target: ShapeID,
        f: impl FnOnce(&mut Shape) -> Option<ShapeProperty>,
    ) {
        let Some(shape) = self.shapes.get_mut(&target) else {
            return;
        };
        if let Some(property) = f(shape) {
            self.emit(Event::Shape { target, property });
            self.emit(Event::Shape {
                target,
                property: ShapeProperty::LastModified,
            });
        }
    }
    /// Insert a shape into its parent's list, making the list if needed.
    fn place_shape(
        &mut self,
        target: ShapeID,
        parent: ShapeParent,
        index: usize,
    ) -> Result<(), CommandError> {
        let layer = self
            .layers
            .get_mut(&parent.layer)
            .ok_or(CommandError::UnknownResource)?;
        let (list, made) = layer.shapes_for_mut(&parent.resource);
        if !list.insert(index, target) {
            return Err(CommandError::MismatchedState);
        }
        let populated = list.len() == 1;

        if made {
            self.emit(Event::ShapeListAdded {
                layer: parent.layer,
                resource: parent.resource.clone(),
            });
        }
        if populated {
            self.emit(Event::ShapeListPopulated {
                layer: parent.layer,
                resource: parent.resource.clone(),
                populated: true,
            });
        }
        self.emit(Event::ShapeAdded {
            layer: parent.layer,
            resource: parent.resource.clone(),
            shape: target,
        });
        if let Some(shape) = self.shapes.get_mut(&target) {
            shape.set_parent(parent);
        }
        Ok(())
    }
    /// Take a shape out of its parent's list. The shape remembers the parent.
    fn unplace_shape(&mut self, target: ShapeID) -> Result<usize, CommandError> {
        let parent = self
            .shapes
            .get(&target)
            .and_then(|shape| shape.parent.clone())
            .ok_or(CommandError::UnknownResource)?;
        let list = self
            .layers
            .get_mut(&parent.layer)
            .and_then(|layer| layer.shape_list_mut(&parent.resource))
            .ok_or(CommandError::UnknownResource)?;
        let index = list.remove(target).ok_or(CommandError::MismatchedState)?;
        let emptied = list.is_empty();

        let ShapeParent { layer, resource } = parent;
        self.emit(Event::ShapeRemoved {
            layer,
            resource: resource.clone(),
            shape: target,
        });
        if emptied {
            self.emit(Event::ShapeListPopulated {
                layer,
                resource,
                populated: false,
            });
        }
        Ok(index)
    }
}

fn format_date(date: chrono::DateTime<chrono::Utc>) -> String {
    date.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Fold text onto one line, each line break with its surrounding whitespace becoming a single space,
/// then cut it short.
fn condense(text: &str) -> String {
    use unicode_segmentation::UnicodeSegmentation;

    let mut single_line = String::with_capacity(text.len());
    let mut run = String::new();
    let flush = |single_line: &mut String, run: &mut String| {
        if run.contains(['\r', '\n']) {
            single_line.push(' ');
        } else {
            single_line.push_str(run);
        }
        run.clear();
    };
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            run.push(c);
        } else {
            flush(&mut single_line, &mut run);
            single_line.push(c);
        }
    }
    flush(&mut single_line, &mut run);

    if single_line.graphemes(true).count() > CONDENSED_LINE_LENGTH {
        let mut cut: String = single_line
            .graphemes(true)
            .take(CONDENSED_LINE_LENGTH)
            .collect();
        cut.push_str("...");
        cut
    } else {
        single_line
    }
}
