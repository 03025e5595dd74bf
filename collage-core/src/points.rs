//! # Point lists
//!
//! Freehand sketches store their stroke as a list of points relative to the shape origin.
//! Persisted as whitespace separated decimal integers, `x1 y1 x2 y2 ...`.
//! Single points (anchor offsets) are persisted as `x,y`.

use crate::util::{Point, Rect};

#[derive(Clone, PartialEq, Eq, Hash, Default, Debug)]
pub struct PointList(Vec<Point>);
impl PointList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Pair up a flat `[x1, y1, x2, y2, ...]` array.
    pub fn from_flat(flat: &[i32]) -> Result<Self, ParsePointsError> {
        if flat.len() % 2 != 0 {
            return Err(ParsePointsError::OddCount(flat.len()));
        }
        Ok(Self(
            flat.chunks_exact(2)
                .map(|pair| Point::new(pair[0], pair[1]))
                .collect(),
        ))
    }
    #[must_use]
    pub fn to_flat(&self) -> Vec<i32> {
        self.0.iter().flat_map(|p| [p.x, p.y]).collect()
    }
    pub fn push(&mut self, point: Point) {
        self.0.push(point);
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Point> + '_ {
        self.0.iter()
    }
    /// Smallest rectangle containing every point, or None if empty.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        let first = *self.0.first()?;
        let (min, max) = self.0.iter().fold((first, first), |(min, max), p| {
            (
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )
        });
        Some(Rect::from_corners(min, max))
    }
    /// Shift every point so that the bounds start at the origin, returning the old bounds origin.
    /// Sketches are drawn in canvas space and then stored relative to their shape.
    pub fn make_relative(&mut self) -> Point {
        let Some(origin) = self.bounds().map(|b| b.origin) else {
            return Point::ORIGIN;
        };
        for point in &mut self.0 {
            *point = point.translate(-origin.x, -origin.y);
        }
        origin
    }
}
impl FromIterator<Point> for PointList {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsePointsError {
    #[error("point list needs an even number of coordinates, found {0}")]
    OddCount(usize),
    #[error("not an integer coordinate: {0:?}")]
    NotAnInteger(String),
    #[error("point must be written \"x,y\"")]
    MalformedPoint,
}

impl std::str::FromStr for PointList {
    type Err = ParsePointsError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let flat = s
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<i32>()
                    .map_err(|_| ParsePointsError::NotAnInteger(token.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_flat(&flat)
    }
}
impl std::fmt::Display for PointList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for point in &self.0 {
            if first {
                first = false;
            } else {
                f.write_str(" ")?;
            }
            write!(f, "{} {}", point.x, point.y)?;
        }
        Ok(())
    }
}
impl serde::Serialize for PointList {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
impl<'de> serde::Deserialize<'de> for PointList {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        string.parse().map_err(serde::de::Error::custom)
    }
}

/// `x,y` form of a single point, for use with `#[serde(with = "...")]`.
pub mod comma_point {
    use super::ParsePointsError;
    use crate::util::Point;

    pub fn format(point: Point) -> String {
        format!("{},{}", point.x, point.y)
    }
    pub fn parse(s: &str) -> Result<Point, ParsePointsError> {
        let (x, y) = s.split_once(',').ok_or(ParsePointsError::MalformedPoint)?;
        let coordinate = |c: &str| {
            c.trim()
                .parse::<i32>()
                .map_err(|_| ParsePointsError::NotAnInteger(c.to_owned()))
        };
        Ok(Point::new(coordinate(x)?, coordinate(y)?))
    }
    pub fn serialize<S: serde::Serializer>(point: &Point, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(*point))
    }
    pub fn deserialize<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Point, D::Error> {
        let string = <std::borrow::Cow<'de, str> as serde::Deserialize>::deserialize(deserializer)?;
        parse(&string).map_err(serde::de::Error::custom)
    }
}
