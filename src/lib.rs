//! Single-host screen navigator.
//!
//! Keeps a stack of screens rendered into one surface owned by an external
//! host container, mirrors the host's lifecycle onto the visible screen, and
//! keeps the stack alive across the host being torn down and recreated.
//! The modules follow the same `mod.rs` orchestrator layout throughout so
//! each concern can be read on its own.

pub mod error;
pub mod host;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod navigator;
pub mod screen;
pub mod stack;
pub mod transition;

pub use error::{NavigationError, Result};
pub use host::{
    Anchor, HostContainer, LayoutDescriptor, LayoutInflater, LifecycleObserver, MemoryCanvas,
    MemoryHost, RenderingSurface,
};
pub use lifecycle::{
    HostLifecycleEvent, HostPhase, LifecycleAction, LifecycleTracker, ScreenLifecycleEvent,
};
pub use logging::{LogEvent, LogFields, LogLevel, Logger, LoggingError, LoggingResult};
pub use metrics::{MetricSnapshot, NavigatorMetrics};
pub use navigator::audit::{
    BufferedNavigatorAudit, NavigatorAudit, NavigatorAuditEvent, NavigatorAuditEventBuilder,
    NavigatorAuditStage, NullNavigatorAudit,
};
pub use navigator::driver::{DriverInput, TerminalDriver};
pub use navigator::{
    DEFAULT_LOG_TARGET, EntrySnapshot, Navigator, NavigatorConfig, StackSnapshot, WeakNavigator,
};
pub use screen::{BackPressResult, Screen, ScreenContext, ScreenRef, ScreenState};
pub use stack::{EntryId, NavigationEntry, NavigationStack};
pub use transition::{
    InstantTransition, Scene, Transition, TransitionDirection, TransitionInvoker, TransitionStyle,
};
