//! Layered annotation shapes anchored to lines of text documents.
//!
//! Shapes are drawn over a resource and anchored to its lines by [`boundary::LinePointBoundary`], so
//! they follow the text as it is edited ([`reconcile`]). All modification of a [`state::Collage`]
//! happens through undoable [`commands`], executed by a [`queue::CollageQueue`].

pub mod boundary;
pub mod color;
pub mod commands;
pub mod dependency;
pub mod id;
pub mod io;
pub mod points;
pub mod property;
pub mod queue;
pub mod reconcile;
pub mod resource;
pub mod state;
pub mod util;
