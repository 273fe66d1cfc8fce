//! Navigator audit trail.
//!
//! Every stack mutation and lifecycle forward is reported as a stage plus
//! structured details, so callers can buffer or visualise what the navigator
//! did without scraping logs.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

/// Distinct checkpoints emitted by the navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigatorAuditStage {
    /// A host container was bound.
    HostAttached,
    /// The host binding was dropped and live screens destroyed.
    HostDetached,
    /// The host's first screen was pushed onto an empty stack.
    FirstScreenRendered,
    /// The top entry was re-issued after (re)attachment or a deferred resume.
    StackReplayed,
    /// An entry was pushed and its screen started.
    ScreenPushed,
    /// An entry was pushed without rendering because no visible host exists.
    NavigationDeferred,
    /// A single-instance request folded an existing entry into the new one.
    SingleInstanceMerged,
    /// The stack was emptied on behalf of a clear-stack entry.
    StackCleared,
    /// A screen was removed from the stack.
    ScreenFinished,
    /// A finish request referenced a screen no longer on the stack.
    StaleFinishIgnored,
    /// A back press was offered to the top screen.
    BackPressHandled,
    /// A host lifecycle event was processed.
    LifecycleDispatched,
}

/// Structured audit entry.
#[derive(Debug, Clone)]
pub struct NavigatorAuditEvent {
    pub timestamp: SystemTime,
    pub stage: NavigatorAuditStage,
    pub details: Vec<(String, Value)>,
}

impl NavigatorAuditEvent {
    fn new(stage: NavigatorAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

/// Builder helper to append fields ergonomically.
pub struct NavigatorAuditEventBuilder {
    event: NavigatorAuditEvent,
}

impl NavigatorAuditEventBuilder {
    pub fn new(stage: NavigatorAuditStage) -> Self {
        Self {
            event: NavigatorAuditEvent::new(stage),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.details.push((key.into(), value.into()));
        self
    }

    pub fn finish(self) -> NavigatorAuditEvent {
        self.event
    }
}

/// Trait implemented by any audit sink.
pub trait NavigatorAudit: Send + Sync {
    fn record(&self, event: NavigatorAuditEvent);
}

/// Default no-op implementation used when auditing is disabled.
#[derive(Debug, Default)]
pub struct NullNavigatorAudit;

impl NavigatorAudit for NullNavigatorAudit {
    fn record(&self, _event: NavigatorAuditEvent) {}
}

/// Keeps every event in memory for later inspection.
#[derive(Debug, Default)]
pub struct BufferedNavigatorAudit {
    events: Mutex<Vec<NavigatorAuditEvent>>,
}

impl BufferedNavigatorAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NavigatorAuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn stages(&self) -> Vec<NavigatorAuditStage> {
        self.events().into_iter().map(|event| event.stage).collect()
    }
}

impl NavigatorAudit for BufferedNavigatorAudit {
    fn record(&self, event: NavigatorAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
