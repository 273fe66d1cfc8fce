use crate::logging::{LogEvent, LogFields, LogLevel};
use serde::Serialize;
use serde_json::json;

/// Counters accumulated by a navigator over its lifetime.
#[derive(Debug, Default, Clone)]
pub struct NavigatorMetrics {
    navigations: u64,
    deferred: u64,
    merges: u64,
    stack_clears: u64,
    finishes: u64,
    stale_finishes: u64,
    back_presses_handled: u64,
    back_presses_declined: u64,
    lifecycle_events: u64,
    replays: u64,
    restarts: u64,
}

impl NavigatorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_navigation(&mut self, deferred: bool) {
        self.navigations = self.navigations.saturating_add(1);
        if deferred {
            self.deferred = self.deferred.saturating_add(1);
        }
    }

    pub fn record_merge(&mut self) {
        self.merges = self.merges.saturating_add(1);
    }

    pub fn record_stack_clear(&mut self) {
        self.stack_clears = self.stack_clears.saturating_add(1);
    }

    pub fn record_finish(&mut self, stale: bool) {
        if stale {
            self.stale_finishes = self.stale_finishes.saturating_add(1);
        } else {
            self.finishes = self.finishes.saturating_add(1);
        }
    }

    pub fn record_back_press(&mut self, handled: bool) {
        if handled {
            self.back_presses_handled = self.back_presses_handled.saturating_add(1);
        } else {
            self.back_presses_declined = self.back_presses_declined.saturating_add(1);
        }
    }

    pub fn record_lifecycle_event(&mut self) {
        self.lifecycle_events = self.lifecycle_events.saturating_add(1);
    }

    pub fn record_replay(&mut self) {
        self.replays = self.replays.saturating_add(1);
    }

    pub fn record_restart(&mut self) {
        self.restarts = self.restarts.saturating_add(1);
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            navigations: self.navigations,
            deferred: self.deferred,
            merges: self.merges,
            stack_clears: self.stack_clears,
            finishes: self.finishes,
            stale_finishes: self.stale_finishes,
            back_presses_handled: self.back_presses_handled,
            back_presses_declined: self.back_presses_declined,
            lifecycle_events: self.lifecycle_events,
            replays: self.replays,
            restarts: self.restarts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricSnapshot {
    pub navigations: u64,
    pub deferred: u64,
    pub merges: u64,
    pub stack_clears: u64,
    pub finishes: u64,
    pub stale_finishes: u64,
    pub back_presses_handled: u64,
    pub back_presses_declined: u64,
    pub lifecycle_events: u64,
    pub replays: u64,
    pub restarts: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "navigator_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => {
                let mut map = LogFields::new();
                map.insert("navigations".to_string(), json!(self.navigations));
                map
            }
        }
    }
}
