//! # Properties
//!
//! Shapes expose their editable and read-only fields to a property sheet as text. Each property is
//! described by a [`PropertyDescriptor`], read with [`Shape::property_value`] and written through the
//! command built by [`ShapeCommand::set_property`]. Writes are validated first and rejected without
//! touching the model.
//!
//! [`Shape::property_value`]: crate::state::Shape::property_value
//! [`ShapeCommand::set_property`]: crate::commands::ShapeCommand::set_property

use crate::util::Point;

/// Every property a shape can expose. The string form is the stable property id.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    strum::AsRefStr,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
pub enum PropertyId {
    #[strum(serialize = "Shape.topLine")]
    TopLine,
    #[strum(serialize = "Shape.topOffset")]
    TopOffset,
    #[strum(serialize = "Shape.bottomLine")]
    BottomLine,
    #[strum(serialize = "Shape.bottomOffset")]
    BottomOffset,
    #[strum(serialize = "shape.creator")]
    Creator,
    #[strum(serialize = "shape.dateCreated")]
    DateCreated,
    #[strum(serialize = "shape.dateLastModified")]
    DateLastModified,
    #[strum(serialize = "ColouredShape.colour")]
    Colour,
    #[strum(serialize = "VariableLineWidthShape.lineWidth")]
    LineWidth,
    #[strum(serialize = "TextNoteShape.text")]
    Text,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, strum::Display, strum::AsRefStr)]
pub enum Category {
    #[strum(serialize = "Location & Size")]
    LocationAndSize,
    #[strum(serialize = "Appearance")]
    Appearance,
    #[strum(serialize = "Metadata")]
    Metadata,
}

/// How a property sheet should edit the value.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PropertyKind {
    Text,
    /// Text that must parse as a positive integer.
    Numeric,
    Colour,
    ReadOnly,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PropertyDescriptor {
    pub id: PropertyId,
    pub display_name: &'static str,
    pub description: &'static str,
    pub category: Category,
    pub kind: PropertyKind,
}
impl PropertyDescriptor {
    #[must_use]
    pub const fn new(
        id: PropertyId,
        display_name: &'static str,
        description: &'static str,
        category: Category,
        kind: PropertyKind,
    ) -> Self {
        Self {
            id,
            display_name,
            description,
            category,
            kind,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[error("Value must be positive")]
    NotPositive,
    #[error("Not a number")]
    NotANumber,
    #[error("String must be in format (x, y), where x and y are non-negative integers")]
    MalformedPoint,
    #[error("Top line must be less than or equal to bottom line")]
    LinesInverted,
    #[error("Left x-offset must be less than right x-offset")]
    XOffsetsInverted,
    #[error("Top y-offset must be less than bottom y-offset")]
    YOffsetsInverted,
    #[error(transparent)]
    Colour(#[from] crate::color::ParseColourError),
    #[error("property {0} is read-only")]
    ReadOnly(&'static str),
    #[error("shape has no property {0}")]
    Unsupported(&'static str),
}

/// Parse a strictly positive integer.
pub fn positive_integer(value: &str) -> Result<u32, PropertyError> {
    let parsed: i64 = value.parse().map_err(|_| PropertyError::NotANumber)?;
    if parsed > 0 {
        u32::try_from(parsed).map_err(|_| PropertyError::NotANumber)
    } else {
        Err(PropertyError::NotPositive)
    }
}

/// Format an offset for display, `(x, y)`.
#[must_use]
pub fn point_to_string(point: Point) -> String {
    format!("({}, {})", point.x, point.y)
}

/// Parse `(x, y)` with any amount of surrounding whitespace. Both coordinates are unsigned decimal.
pub fn string_to_point(value: &str) -> Result<Point, PropertyError> {
    let inner = value
        .trim()
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or(PropertyError::MalformedPoint)?;
    let (x, y) = inner.split_once(',').ok_or(PropertyError::MalformedPoint)?;
    let coordinate = |c: &str| {
        let c = c.trim();
        if c.is_empty() || !c.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PropertyError::MalformedPoint);
        }
        c.parse::<i32>().map_err(|_| PropertyError::MalformedPoint)
    };
    Ok(Point::new(coordinate(x)?, coordinate(y)?))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ids_round_trip() {
        use strum::IntoEnumIterator;
        for id in PropertyId::iter() {
            assert_eq!(id.as_ref().parse::<PropertyId>(), Ok(id));
        }
        assert_eq!(PropertyId::TopLine.as_ref(), "Shape.topLine");
    }
    #[test]
    fn positive() {
        assert_eq!(positive_integer("12"), Ok(12));
        assert_eq!(positive_integer("0"), Err(PropertyError::NotPositive));
        assert_eq!(positive_integer("-3"), Err(PropertyError::NotPositive));
        assert_eq!(positive_integer("three"), Err(PropertyError::NotANumber));
        assert_eq!(PropertyError::NotANumber.to_string(), "Not a number");
    }
    #[test]
    fn points() {
        assert_eq!(string_to_point("(3, 4)"), Ok(Point::new(3, 4)));
        assert_eq!(string_to_point("  ( 10 ,20 )  "), Ok(Point::new(10, 20)));
        assert_eq!(string_to_point("(-1, 4)"), Err(PropertyError::MalformedPoint));
        assert_eq!(string_to_point("3, 4"), Err(PropertyError::MalformedPoint));
        assert_eq!(string_to_point("(3 4)"), Err(PropertyError::MalformedPoint));
        assert_eq!(point_to_string(Point::new(7, 8)), "(7, 8)");
    }
    #[test]
    fn categories() {
        assert_eq!(Category::LocationAndSize.to_string(), "Location & Size");
    }
}
