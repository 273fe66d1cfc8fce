//! Navigation stack module orchestrator.
//!
//! `entry` holds the immutable navigation entry value; the arena-backed stack
//! lives in the private `core` module.

mod core;
pub mod entry;

pub use self::core::{EntryId, NavigationStack};
pub use entry::NavigationEntry;
