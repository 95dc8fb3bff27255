//! Deep merge of TOML value trees with tighten-only restriction
//! enforcement for the workspace layer (SPEC_FULL §10.3).
//!
//! The merge operates on raw [`toml::Value`] trees rather than
//! deserialized structs, so a key absent from an overlay never clobbers
//! the base layer with a struct default.

mod deep;
mod enforce;
pub(crate) mod path;
mod restrict;
mod types;

pub use deep::deep_merge;
pub use restrict::enforce_restrictions;
pub use types::ConfigLayer;

#[cfg(test)]
mod tests;
