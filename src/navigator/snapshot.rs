use serde::Serialize;

use crate::lifecycle::{HostPhase, ScreenLifecycleEvent};
use crate::logging::{LogEvent, LogFields, LogLevel};
use crate::stack::NavigationEntry;
use crate::transition::TransitionStyle;

use super::Navigator;

/// Serializable view of one stack entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySnapshot {
    pub screen: String,
    pub single_instance: bool,
    pub clear_stack: bool,
    pub needs_restart: bool,
    pub lifecycle: ScreenLifecycleEvent,
    pub anchored: bool,
    pub transition: TransitionStyle,
}

impl<D> From<&NavigationEntry<D>> for EntrySnapshot {
    fn from(entry: &NavigationEntry<D>) -> Self {
        let screen = entry.screen();
        Self {
            screen: screen.name().to_string(),
            single_instance: entry.is_single_instance(),
            clear_stack: entry.is_clear_stack(),
            needs_restart: entry.needs_restart(),
            lifecycle: screen.latest_lifecycle_event(),
            anchored: screen.rendering_anchor().is_some(),
            transition: entry.transition(),
        }
    }
}

/// Point-in-time view of a navigator, entries listed top first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackSnapshot {
    pub attached: bool,
    pub host_phase: HostPhase,
    pub entries: Vec<EntrySnapshot>,
}

impl StackSnapshot {
    pub fn screen_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.screen.as_str())
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_log_event(&self, target: &str) -> LogEvent {
        let fields = match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => LogFields::new(),
        };
        LogEvent::with_fields(LogLevel::Debug, target, "stack_snapshot", fields)
    }
}

impl<D: 'static> Navigator<D> {
    pub fn snapshot(&self) -> StackSnapshot {
        let core = self.inner.core.borrow();
        StackSnapshot {
            attached: core.binding.is_some(),
            host_phase: core.tracker.phase(),
            entries: core.stack.iter().map(EntrySnapshot::from).collect(),
        }
    }

    /// Write the current snapshot through the configured logger.
    pub fn log_snapshot(&self) {
        if let Some(logger) = self.inner.config.logger.as_ref() {
            let event = self.snapshot().to_log_event(&self.inner.config.log_target);
            let _ = logger.log_event(event);
        }
    }
}
