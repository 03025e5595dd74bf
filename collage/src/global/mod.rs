//! Global singletons.

pub mod preferences;
mod provider;

pub use provider::provider;
