//! Lifecycle vocabularies for screens and host containers, plus the host
//! phase state machine that gates which host events reach the top screen.

use serde::Serialize;

/// Latest lifecycle callback a screen has received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenLifecycleEvent {
    #[default]
    Unknown,
    Create,
    Resume,
    Pause,
    Destroy,
}

/// Events broadcast by the host container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostLifecycleEvent {
    Create,
    Start,
    Resume,
    Pause,
    Stop,
    Destroy,
    Unknown,
}

impl HostLifecycleEvent {
    /// Whether a host whose latest event is `self` is showing its surface.
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Create | Self::Start | Self::Resume)
    }
}

/// Host-level state as seen by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPhase {
    #[default]
    Unknown,
    Paused,
    Resumed,
}

/// What the dispatcher must do with the top screen for a given event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    None,
    PauseTop,
    ResumeTop,
}

impl HostPhase {
    /// Transition table. A RESUME is only forwarded when it directly follows a
    /// PAUSE; every other event moves the machine without touching the screen.
    pub fn on_event(self, event: HostLifecycleEvent) -> (HostPhase, LifecycleAction) {
        use HostLifecycleEvent as E;
        match (self, event) {
            (_, E::Pause) => (HostPhase::Paused, LifecycleAction::PauseTop),
            (HostPhase::Paused, E::Resume) => (HostPhase::Resumed, LifecycleAction::ResumeTop),
            (_, E::Resume) => (HostPhase::Resumed, LifecycleAction::None),
            (_, E::Create | E::Start | E::Stop | E::Destroy | E::Unknown) => {
                (HostPhase::Unknown, LifecycleAction::None)
            }
        }
    }
}

/// Holds the host phase between events.
#[derive(Debug, Default, Clone)]
pub struct LifecycleTracker {
    phase: HostPhase,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    /// Action owed for `event` in the current phase. The phase itself is only
    /// moved by [`LifecycleTracker::commit`].
    pub fn plan(&self, event: HostLifecycleEvent) -> (HostPhase, LifecycleAction) {
        self.phase.on_event(event)
    }

    pub fn commit(&mut self, next: HostPhase) {
        self.phase = next;
    }
}
