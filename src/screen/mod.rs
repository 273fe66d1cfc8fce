//! Screen module orchestrator.
//!
//! The screen contract, its embedded state and the identity-compared handle
//! the stack stores live in the private `core` module.

mod core;

pub use self::core::{BackPressResult, Screen, ScreenContext, ScreenRef, ScreenState};
