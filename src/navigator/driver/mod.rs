//! Drivers that run a navigator against a concrete host.

pub mod terminal;

pub use terminal::{DriverInput, KeyHandler, TerminalDriver, classify, host_event_for};
