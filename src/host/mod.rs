//! Host container seams.
//!
//! The navigator only talks to the host through the traits re-exported here;
//! `memory` provides an in-process host used by tests, benches and the
//! terminal driver.

mod core;
pub mod memory;

pub(crate) use self::core::HostBinding;
pub use self::core::{
    Anchor, HostContainer, LayoutDescriptor, LayoutInflater, LifecycleObserver, RenderingSurface,
};
pub use memory::{MemoryCanvas, MemoryHost};
