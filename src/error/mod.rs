//! Error module orchestrator.
//!
//! Call sites import [`NavigationError`] and [`Result`] from here; the
//! variants live in the private `types` module.

mod types;

pub use types::{NavigationError, Result};
