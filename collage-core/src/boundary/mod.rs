//! # Boundaries
//!
//! A shape is positioned relative to the document it annotates, not to the canvas. Each corner is
//! anchored to a document line plus a pixel offset from the top-left of that line, so shapes scroll,
//! fold and move with the text. Converting to canvas space needs a [`ViewerContext`], which knows the
//! current line heights and scroll position.
//!
//! When the document is edited, [`Boundary::reconcile`] decides whether the shape stays put, moves or
//! stretches along with the edited lines, or is swallowed by a deletion and must go.

mod change;

pub use change::DocumentChange;

use crate::property::{self, Category, PropertyDescriptor, PropertyError, PropertyId, PropertyKind};
use crate::util::{Point, Rect};

/// Line/pixel mapping of the text viewer the shapes are drawn over.
pub trait ViewerContext {
    /// Canvas y of the top of `line` (1-based) under the current scroll and folding state.
    fn top_pixel_for_line(&self, line: u32) -> i32;
    /// Document line (1-based) shown at a canvas point.
    fn line_at_point(&self, point: Point) -> u32;
}

/// A viewer where every line has the same height and nothing is folded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformLines {
    pub line_height: u32,
    /// Canvas pixels scrolled off the top.
    pub scroll_top: u32,
}
impl ViewerContext for UniformLines {
    fn top_pixel_for_line(&self, line: u32) -> i32 {
        let top = i64::from(line.saturating_sub(1)) * i64::from(self.line_height)
            - i64::from(self.scroll_top);
        top.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }
    fn line_at_point(&self, point: Point) -> u32 {
        let document_y = (i64::from(point.y) + i64::from(self.scroll_top)).max(0);
        let line = document_y / i64::from(self.line_height.max(1)) + 1;
        u32::try_from(line).unwrap_or(u32::MAX)
    }
}

/// Result of reconciling a boundary against a document change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reconciled<B> {
    /// The edit doesn't concern this boundary.
    Unchanged,
    /// The boundary moved or resized along with the text.
    Moved(B),
    /// Everything under the shape was deleted.
    Delete,
}

/// Position of a shape, independent of how it is anchored.
pub trait Boundary: Clone + PartialEq + Sized {
    fn to_rectangle(&self, viewer: &impl ViewerContext) -> Rect;
    fn from_rectangle(viewer: &impl ViewerContext, rect: Rect) -> Self;
    fn reconcile(&self, change: &DocumentChange) -> Reconciled<Self>;
    /// Short human readable location, for outlines.
    fn description(&self) -> String;
}

/// One corner of a shape. Line is at least 1 and offsets are non-negative,
/// enforced on every construction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct LinePoint {
    line: u32,
    offset: Point,
}
impl LinePoint {
    #[must_use]
    pub fn new(line: i64, offset: Point) -> Self {
        Self {
            line: u32::try_from(line.max(1)).unwrap_or(u32::MAX),
            offset: offset.clamp_non_negative(),
        }
    }
    /// Anchor for a canvas point.
    #[must_use]
    pub fn from_viewer(viewer: &impl ViewerContext, point: Point) -> Self {
        let line = viewer.line_at_point(point);
        let top = viewer.top_pixel_for_line(line);
        Self::new(i64::from(line), point.translate(0, top.saturating_neg()))
    }
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }
    #[must_use]
    pub fn offset(&self) -> Point {
        self.offset
    }
    #[must_use]
    pub fn to_viewer(&self, viewer: &impl ViewerContext) -> Point {
        self.offset.translate(0, viewer.top_pixel_for_line(self.line))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct LinePointBoundary {
    top_left: LinePoint,
    bottom_right: LinePoint,
}
impl Default for LinePointBoundary {
    fn default() -> Self {
        Self {
            top_left: LinePoint::new(1, Point::new(0, 0)),
            bottom_right: LinePoint::new(1, Point::new(10, 10)),
        }
    }
}
impl LinePointBoundary {
    pub const DESCRIPTORS: [PropertyDescriptor; 4] = [
        PropertyDescriptor::new(
            PropertyId::TopLine,
            "Top line",
            "",
            Category::LocationAndSize,
            PropertyKind::Numeric,
        ),
        PropertyDescriptor::new(
            PropertyId::TopOffset,
            "Top left corner",
            "Top left corner of shape (specified relative to top left corner of top line)",
            Category::LocationAndSize,
            PropertyKind::Text,
        ),
        PropertyDescriptor::new(
            PropertyId::BottomLine,
            "Bottom line",
            "",
            Category::LocationAndSize,
            PropertyKind::Numeric,
        ),
        PropertyDescriptor::new(
            PropertyId::BottomOffset,
            "Bottom right corner",
            "Bottom right corner of shape (specified relative to top left corner of bottom line)",
            Category::LocationAndSize,
            PropertyKind::Text,
        ),
    ];

    /// Does not check ordering of the corners, see [`Self::validate`].
    #[must_use]
    pub fn new(top_left: LinePoint, bottom_right: LinePoint) -> Self {
        Self {
            top_left,
            bottom_right,
        }
    }
    /// Convenience for `(top line, top offset, bottom line, bottom offset)`.
    #[must_use]
    pub fn from_lines(top: u32, top_offset: Point, bottom: u32, bottom_offset: Point) -> Self {
        Self::new(
            LinePoint::new(top.into(), top_offset),
            LinePoint::new(bottom.into(), bottom_offset),
        )
    }
    #[must_use]
    pub fn top_left(&self) -> LinePoint {
        self.top_left
    }
    #[must_use]
    pub fn bottom_right(&self) -> LinePoint {
        self.bottom_right
    }
    #[must_use]
    pub fn top_line(&self) -> u32 {
        self.top_left.line
    }
    #[must_use]
    pub fn bottom_line(&self) -> u32 {
        self.bottom_right.line
    }
    /// Check the corners are ordered: lines top to bottom, x left to right, and y top to
    /// bottom when both corners sit on the same line.
    pub fn validate(&self) -> Result<(), PropertyError> {
        let (top, bottom) = (self.top_left, self.bottom_right);
        if top.line > bottom.line {
            Err(PropertyError::LinesInverted)
        } else if top.offset.x >= bottom.offset.x {
            Err(PropertyError::XOffsetsInverted)
        } else if top.line == bottom.line && top.offset.y >= bottom.offset.y {
            Err(PropertyError::YOffsetsInverted)
        } else {
            Ok(())
        }
    }
    #[must_use]
    pub fn has_property(id: PropertyId) -> bool {
        Self::DESCRIPTORS.iter().any(|d| d.id == id)
    }
    /// Text form of one of the four boundary properties.
    #[must_use]
    pub fn property_value(&self, id: PropertyId) -> Option<String> {
        match id {
            PropertyId::TopLine => Some(self.top_left.line.to_string()),
            PropertyId::BottomLine => Some(self.bottom_right.line.to_string()),
            PropertyId::TopOffset => Some(property::point_to_string(self.top_left.offset)),
            PropertyId::BottomOffset => Some(property::point_to_string(self.bottom_right.offset)),
            _ => None,
        }
    }
    /// The boundary with one property replaced, if the result is still a valid boundary.
    pub fn with_property(&self, id: PropertyId, value: &str) -> Result<Self, PropertyError> {
        let mut new = *self;
        match id {
            PropertyId::TopLine => {
                let line = property::positive_integer(value)?;
                new.top_left = LinePoint::new(line.into(), new.top_left.offset);
            }
            PropertyId::BottomLine => {
                let line = property::positive_integer(value)?;
                new.bottom_right = LinePoint::new(line.into(), new.bottom_right.offset);
            }
            PropertyId::TopOffset => {
                let offset = property::string_to_point(value)?;
                new.top_left = LinePoint::new(new.top_left.line.into(), offset);
            }
            PropertyId::BottomOffset => {
                let offset = property::string_to_point(value)?;
                new.bottom_right = LinePoint::new(new.bottom_right.line.into(), offset);
            }
            other => return Err(PropertyError::Unsupported(other.into())),
        }
        new.validate()?;
        Ok(new)
    }
}

/// Where a line ends up after a change.
/// Lines above the change stay, lines inside it are spread proportionally over the
/// replacement, lines below shift by the line delta.
fn transform_line(line: u32, change: &DocumentChange) -> i64 {
    let line = i64::from(line);
    let start = i64::from(change.start_line());
    let old_last = i64::from(change.old_last_line());
    let new_last = i64::from(change.new_last_line());
    if line <= start {
        line
    } else if line < old_last {
        // All terms non-negative, so integer division is the floor.
        let relative = line - start;
        start + relative * (new_last - start) / (old_last - start).max(1)
    } else {
        line + change.line_delta()
    }
}

impl Boundary for LinePointBoundary {
    fn to_rectangle(&self, viewer: &impl ViewerContext) -> Rect {
        let top_left = self.top_left.to_viewer(viewer);
        let bottom_right = self.bottom_right.to_viewer(viewer);
        // Difference of the corners, not the inclusive box between them.
        Rect {
            origin: top_left,
            width: bottom_right.x.saturating_sub(top_left.x),
            height: bottom_right.y.saturating_sub(top_left.y),
        }
    }
    fn from_rectangle(viewer: &impl ViewerContext, rect: Rect) -> Self {
        Self {
            top_left: LinePoint::from_viewer(viewer, rect.top_left()),
            bottom_right: LinePoint::from_viewer(viewer, rect.bottom_right()),
        }
    }
    fn reconcile(&self, change: &DocumentChange) -> Reconciled<Self> {
        let top = self.top_line();
        let bottom = self.bottom_line();

        if change.is_pure_deletion() && change.start_line() <= top && bottom < change.old_last_line()
        {
            return Reconciled::Delete;
        }
        if change.line_delta() == 0 || change.start_line() >= bottom {
            return Reconciled::Unchanged;
        }

        let mut new_top = transform_line(top, change);
        let new_bottom = transform_line(bottom, change);
        // Text under the shape collapsed onto the start line: sit just above it rather than on it.
        if change.start_line() == change.new_last_line()
            && new_top == i64::from(change.start_line())
            && top < change.old_last_line()
        {
            new_top -= 1;
        }

        let moved = Self {
            top_left: LinePoint::new(new_top, self.top_left.offset),
            bottom_right: LinePoint::new(new_bottom, self.bottom_right.offset),
        };
        if moved == *self {
            Reconciled::Unchanged
        } else {
            Reconciled::Moved(moved)
        }
    }
    fn description(&self) -> String {
        let (top, bottom) = (self.top_line(), self.bottom_line());
        if top == bottom {
            format!("line {top}")
        } else {
            format!("lines {top}-{bottom}")
        }
    }
}
