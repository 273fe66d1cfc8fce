use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::error::{NavigationError, Result};
use crate::host::{HostBinding, HostContainer, LifecycleObserver};
use crate::lifecycle::{
    HostLifecycleEvent, HostPhase, LifecycleAction, LifecycleTracker, ScreenLifecycleEvent,
};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::{MetricSnapshot, NavigatorMetrics};
use crate::screen::{ScreenContext, ScreenRef};
use crate::stack::{NavigationEntry, NavigationStack};
use crate::transition::{Scene, Transition, TransitionDirection, TransitionInvoker};

pub mod audit;
mod back;
pub mod driver;
mod snapshot;

#[cfg(test)]
mod tests;

use audit::{
    NavigatorAudit, NavigatorAuditEvent, NavigatorAuditEventBuilder, NavigatorAuditStage,
    NullNavigatorAudit,
};
pub use snapshot::{EntrySnapshot, StackSnapshot};

pub const DEFAULT_LOG_TARGET: &str = "screen_stack::navigator";
const DEFAULT_STACK_CAPACITY: usize = 5;

/// Configuration knobs for a [`Navigator`].
#[derive(Clone)]
pub struct NavigatorConfig {
    /// Optional structured logger used by the navigator.
    pub logger: Option<Logger>,
    /// Counters updated on every operation when present.
    pub metrics: Option<Arc<Mutex<NavigatorMetrics>>>,
    /// Sink for audit events.
    pub audit: Arc<dyn NavigatorAudit>,
    /// Target field used for every log event.
    pub log_target: String,
    /// Initial capacity of the entry arena.
    pub stack_capacity: usize,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            logger: None,
            metrics: None,
            audit: Arc::new(NullNavigatorAudit),
            log_target: DEFAULT_LOG_TARGET.to_string(),
            stack_capacity: DEFAULT_STACK_CAPACITY,
        }
    }
}

impl NavigatorConfig {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn NavigatorAudit>) -> Self {
        self.audit = audit;
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(NavigatorMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<NavigatorMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

struct Core<D> {
    stack: NavigationStack<D>,
    binding: Option<HostBinding<D>>,
    tracker: LifecycleTracker,
    attach_count: u64,
}

struct Inner<D> {
    core: RefCell<Core<D>>,
    deps: Rc<D>,
    transitions: Box<dyn TransitionInvoker>,
    config: NavigatorConfig,
}

/// Stack-based screen navigator bound to at most one host container.
///
/// Cloning yields another handle to the same navigator. Handles are `!Send`,
/// which pins every operation to the thread that created the navigator.
///
/// No `RefCell` borrow is held while a screen hook, host call or transition
/// runs, so screens may call back into the navigator from any hook.
pub struct Navigator<D> {
    inner: Rc<Inner<D>>,
}

impl<D> Clone for Navigator<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Non-owning navigator handle given to screens and host observers.
pub struct WeakNavigator<D> {
    inner: Weak<Inner<D>>,
}

impl<D> Clone for WeakNavigator<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<D> Default for WeakNavigator<D> {
    fn default() -> Self {
        Self { inner: Weak::new() }
    }
}

impl<D: 'static> WeakNavigator<D> {
    pub fn upgrade(&self) -> Option<Navigator<D>> {
        self.inner.upgrade().map(|inner| Navigator { inner })
    }

    pub fn navigate(&self, entry: NavigationEntry<D>) -> Result<()> {
        self.upgrade()
            .ok_or(NavigationError::ControllerGone)?
            .navigate(entry)
    }

    pub fn finish(&self, screen: &ScreenRef<D>) -> Result<()> {
        self.upgrade()
            .ok_or(NavigationError::ControllerGone)?
            .finish(screen)
    }
}

impl<D: 'static> Navigator<D> {
    pub fn new<T>(deps: D, transitions: T) -> Self
    where
        T: TransitionInvoker + 'static,
    {
        Self::with_config(deps, transitions, NavigatorConfig::default())
    }

    pub fn with_config<T>(deps: D, transitions: T, config: NavigatorConfig) -> Self
    where
        T: TransitionInvoker + 'static,
    {
        let core = Core {
            stack: NavigationStack::with_capacity(config.stack_capacity),
            binding: None,
            tracker: LifecycleTracker::new(),
            attach_count: 0,
        };
        Self {
            inner: Rc::new(Inner {
                core: RefCell::new(core),
                deps: Rc::new(deps),
                transitions: Box::new(transitions),
                config,
            }),
        }
    }

    pub fn downgrade(&self) -> WeakNavigator<D> {
        WeakNavigator {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.inner.config
    }

    pub fn deps(&self) -> &D {
        &self.inner.deps
    }

    pub fn depth(&self) -> usize {
        self.inner.core.borrow().stack.len()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.core.borrow().binding.is_some()
    }

    pub fn host_phase(&self) -> HostPhase {
        self.inner.core.borrow().tracker.phase()
    }

    pub fn top_entry(&self) -> Option<NavigationEntry<D>> {
        self.inner.core.borrow().stack.top().cloned()
    }

    pub fn top_screen(&self) -> Option<ScreenRef<D>> {
        self.top_entry().map(|entry| entry.screen().clone())
    }

    /// Entries from top to bottom.
    pub fn entries(&self) -> Vec<NavigationEntry<D>> {
        self.inner.core.borrow().stack.iter().cloned().collect()
    }

    pub fn contains(&self, screen: &ScreenRef<D>) -> bool {
        self.inner.core.borrow().stack.contains(screen)
    }

    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let metrics = self.inner.config.metrics.as_ref()?;
        metrics.lock().ok().map(|guard| guard.snapshot())
    }

    /// Bind a host container. Renders the host's first screen onto an empty
    /// stack, or replays the current top after a previous detach.
    pub fn attach(&self, host: Rc<dyn HostContainer<D>>) -> Result<()> {
        if self.is_attached() {
            return Err(NavigationError::AlreadyAttached);
        }
        let surface = host
            .rendering_surface()
            .ok_or(NavigationError::IncompleteHost("rendering surface"))?;
        let inflater = host
            .layout_inflater()
            .ok_or(NavigationError::IncompleteHost("layout inflater"))?;

        let (generation, stack_empty) = {
            let mut core = self.inner.core.borrow_mut();
            core.attach_count += 1;
            let generation = core.attach_count;
            core.binding = Some(HostBinding {
                host: Rc::clone(&host),
                surface,
                inflater,
                generation,
            });
            (generation, core.stack.is_empty())
        };
        host.hook_into_lifecycle(LifecycleObserver::new(self.downgrade(), generation));

        self.log(
            LogLevel::Info,
            "host_attached",
            [
                json_kv("generation", generation),
                json_kv("depth", self.depth()),
            ],
        );
        self.audit(
            NavigatorAuditEventBuilder::new(NavigatorAuditStage::HostAttached)
                .detail("generation", generation)
                .detail("replay", !stack_empty)
                .finish(),
        );

        if stack_empty {
            self.render_first_screen(host.first_screen())
        } else {
            self.replay_top()
        }
    }

    /// Drop the host binding and destroy every live screen, oldest first. The
    /// stack keeps its order with every entry marked as needing restart. A
    /// failing destroy hook does not stop the others; the first error is
    /// returned afterwards.
    pub fn detach(&self) -> Result<()> {
        let live: Vec<ScreenRef<D>> = {
            let mut core = self.inner.core.borrow_mut();
            core.binding = None;
            let drained = core.stack.drain();
            let live: Vec<ScreenRef<D>> = drained
                .iter()
                .filter(|entry| !entry.needs_restart())
                .map(|entry| entry.screen().clone())
                .collect();
            let ghosts: Vec<NavigationEntry<D>> = drained
                .into_iter()
                .map(NavigationEntry::mark_restart_needed)
                .collect();
            core.stack.insert_bottom(ghosts);
            live
        };

        self.log(
            LogLevel::Info,
            "host_detached",
            [
                json_kv("destroyed", live.len()),
                json_kv("depth", self.depth()),
            ],
        );
        self.audit(
            NavigatorAuditEventBuilder::new(NavigatorAuditStage::HostDetached)
                .detail("destroyed", live.len())
                .finish(),
        );

        let mut first_error = None;
        for screen in &live {
            self.keep_first_error(&mut first_error, screen, screen.destroy());
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Feed a host lifecycle event through the phase state machine.
    pub fn dispatch_lifecycle_event(&self, event: HostLifecycleEvent) -> Result<()> {
        let (next, action) = self.inner.core.borrow().tracker.plan(event);
        self.record_metric(NavigatorMetrics::record_lifecycle_event);
        self.log(
            LogLevel::Debug,
            "lifecycle_event",
            [
                json_kv("event", json!(event)),
                json_kv("action", format!("{action:?}")),
            ],
        );

        let outcome = match action {
            LifecycleAction::PauseTop => self.pause_top().map(|_| ()),
            LifecycleAction::ResumeTop => self.resume_top(),
            LifecycleAction::None => Ok(()),
        };
        self.inner.core.borrow_mut().tracker.commit(next);

        self.audit(
            NavigatorAuditEventBuilder::new(NavigatorAuditStage::LifecycleDispatched)
                .detail("event", json!(event))
                .detail("forwarded", action != LifecycleAction::None)
                .finish(),
        );
        outcome
    }

    pub(crate) fn dispatch_host_event(
        &self,
        generation: u64,
        event: HostLifecycleEvent,
    ) -> Result<()> {
        let current = self
            .inner
            .core
            .borrow()
            .binding
            .as_ref()
            .map(|binding| binding.generation);
        if current != Some(generation) {
            self.log(
                LogLevel::Debug,
                "stale_host_event_ignored",
                [
                    json_kv("event", json!(event)),
                    json_kv("generation", generation),
                ],
            );
            return Ok(());
        }
        self.dispatch_lifecycle_event(event)
    }

    /// Push `entry`, merging with an existing single-instance entry and
    /// clearing the stack when requested. Renders immediately when a visible
    /// host is attached; otherwise the entry waits for the next attach.
    pub fn navigate(&self, entry: NavigationEntry<D>) -> Result<()> {
        let mut entry = entry;
        let mut new_instance = true;

        if entry.is_single_instance() {
            let merged = {
                let mut core = self.inner.core.borrow_mut();
                let top_matches = core
                    .stack
                    .top()
                    .map(|top| top.screen() == entry.screen());
                match top_matches {
                    Some(true) => None,
                    Some(false) => Some(core.stack.remove_screen(entry.screen())),
                    None => Some(None),
                }
            };
            let Some(merged) = merged else {
                self.log(
                    LogLevel::Debug,
                    "navigation_skipped",
                    [json_kv("screen", entry.screen().name())],
                );
                return Ok(());
            };

            if let Some((removed, _)) = merged {
                let reused = !removed.needs_restart();
                entry = if reused {
                    new_instance = false;
                    entry.with_screen(removed.screen().clone())
                } else {
                    entry.with_screen(removed.screen().duplicate())
                };
                self.record_metric(NavigatorMetrics::record_merge);
                self.log(
                    LogLevel::Debug,
                    "single_instance_merged",
                    [
                        json_kv("screen", entry.screen().name()),
                        json_kv("reused", reused),
                    ],
                );
                self.audit(
                    NavigatorAuditEventBuilder::new(NavigatorAuditStage::SingleInstanceMerged)
                        .detail("screen", entry.screen().name())
                        .detail("reused", reused)
                        .finish(),
                );
            }
        }

        if entry.is_clear_stack() {
            self.clear_stack()?;
        }

        if self.is_rendering() {
            self.record_metric(|metrics| metrics.record_navigation(false));
            return self.push_and_start(entry, new_instance);
        }

        self.record_metric(|metrics| metrics.record_navigation(true));
        if !new_instance {
            // A deferred entry must hold a destroyed screen.
            entry.screen().destroy()?;
        }
        self.log(
            LogLevel::Debug,
            "navigation_deferred",
            [
                json_kv("screen", entry.screen().name()),
                json_kv("attached", self.is_attached()),
            ],
        );
        self.audit(
            NavigatorAuditEventBuilder::new(NavigatorAuditStage::NavigationDeferred)
                .detail("screen", entry.screen().name())
                .finish(),
        );
        self.inner
            .core
            .borrow_mut()
            .stack
            .push(entry.mark_restart_needed());
        Ok(())
    }

    fn render_first_screen(&self, entry: NavigationEntry<D>) -> Result<()> {
        let binding = self.binding().ok_or(NavigationError::NotAttached)?;
        let screen = entry.screen().clone();
        self.inner.core.borrow_mut().stack.push(entry);

        let anchor = binding.inflater.inflate(&screen.layout())?;
        binding.surface.clear();
        binding.surface.attach(anchor)?;
        screen
            .state()
            .set_rendering_anchor(binding.surface.first_child());

        self.log(
            LogLevel::Info,
            "first_screen_rendered",
            [json_kv("screen", screen.name())],
        );
        self.audit(
            NavigatorAuditEventBuilder::new(NavigatorAuditStage::FirstScreenRendered)
                .detail("screen", screen.name())
                .finish(),
        );
        self.start_screen(&screen, true)
    }

    /// Re-issue the top entry through [`Navigator::navigate`], recreating its
    /// screen if it was destroyed.
    fn replay_top(&self) -> Result<()> {
        let top = self.inner.core.borrow_mut().stack.pop();
        let Some(top) = top else {
            return Ok(());
        };
        let restarting = top.needs_restart();
        self.record_metric(NavigatorMetrics::record_replay);
        if restarting {
            self.record_metric(NavigatorMetrics::record_restart);
        }
        self.log(
            LogLevel::Info,
            "stack_replayed",
            [
                json_kv("screen", top.screen().name()),
                json_kv("restart", restarting),
            ],
        );
        self.audit(
            NavigatorAuditEventBuilder::new(NavigatorAuditStage::StackReplayed)
                .detail("screen", top.screen().name())
                .detail("restart", restarting)
                .finish(),
        );
        self.navigate(top.restart())
    }

    fn push_and_start(&self, entry: NavigationEntry<D>, new_instance: bool) -> Result<()> {
        let previous = self.pause_top()?;
        let screen = entry.screen().clone();
        let depth = {
            let mut core = self.inner.core.borrow_mut();
            core.stack.push(entry.clone());
            core.stack.len()
        };

        self.log(
            LogLevel::Debug,
            "screen_pushed",
            [
                json_kv("screen", screen.name()),
                json_kv("new_instance", new_instance),
                json_kv("depth", depth),
            ],
        );
        self.audit(
            NavigatorAuditEventBuilder::new(NavigatorAuditStage::ScreenPushed)
                .detail("screen", screen.name())
                .detail("new_instance", new_instance)
                .detail("depth", depth)
                .finish(),
        );

        self.transition_between(&entry, previous.as_ref(), TransitionDirection::Forward)?;
        self.start_screen(&screen, new_instance)
    }

    /// Create (for new instances) and resume `screen`. Resume is skipped when
    /// the screen finished itself during create or something was pushed over
    /// it in the meantime.
    fn start_screen(&self, screen: &ScreenRef<D>, new_instance: bool) -> Result<()> {
        if new_instance {
            screen.create(&self.screen_context(screen))?;
        }
        let destroyed = screen.latest_lifecycle_event() == ScreenLifecycleEvent::Destroy;
        let still_top = self
            .inner
            .core
            .borrow()
            .stack
            .top()
            .map(|top| top.screen() == screen)
            .unwrap_or(false);
        if !destroyed && still_top {
            screen.resume()?;
        }
        Ok(())
    }

    /// Pause the current top unless it is awaiting restart or already paused.
    /// Returns the top as it was before pausing.
    fn pause_top(&self) -> Result<Option<NavigationEntry<D>>> {
        let top = self.top_entry();
        if let Some(entry) = &top {
            let latest = entry.screen().latest_lifecycle_event();
            let settled = matches!(
                latest,
                ScreenLifecycleEvent::Pause | ScreenLifecycleEvent::Destroy
            );
            if !entry.needs_restart() && !settled {
                entry.screen().pause()?;
            }
        }
        Ok(top)
    }

    fn resume_top(&self) -> Result<()> {
        let Some(top) = self.top_entry() else {
            return Ok(());
        };
        if top.needs_restart() {
            if self.is_rendering() {
                return self.replay_top();
            }
            return Err(NavigationError::RestartPending(
                top.screen().name().to_string(),
            ));
        }
        top.screen().resume()
    }

    fn clear_stack(&self) -> Result<()> {
        let drained = self.inner.core.borrow_mut().stack.drain();
        self.record_metric(NavigatorMetrics::record_stack_clear);
        self.log(
            LogLevel::Debug,
            "stack_cleared",
            [json_kv("entries", drained.len())],
        );
        self.audit(
            NavigatorAuditEventBuilder::new(NavigatorAuditStage::StackCleared)
                .detail("entries", drained.len())
                .finish(),
        );

        let mut first_error = None;
        for (position, entry) in drained.iter().rev().enumerate() {
            if entry.needs_restart() {
                continue;
            }
            let screen = entry.screen();
            if position == 0 && screen.latest_lifecycle_event() == ScreenLifecycleEvent::Resume {
                self.keep_first_error(&mut first_error, screen, screen.pause());
            }
            self.keep_first_error(&mut first_error, screen, screen.destroy());
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Bulk teardown keeps going past a failing hook; the first failure is
    /// reported once every screen has been handled.
    fn keep_first_error(
        &self,
        first: &mut Option<NavigationError>,
        screen: &ScreenRef<D>,
        outcome: Result<()>,
    ) {
        let Err(err) = outcome else {
            return;
        };
        self.log(
            LogLevel::Warn,
            "screen_hook_failed",
            [
                json_kv("screen", screen.name()),
                json_kv("error", err.to_string()),
            ],
        );
        if first.is_none() {
            *first = Some(err);
        }
    }

    fn transition_between(
        &self,
        entering: &NavigationEntry<D>,
        leaving: Option<&NavigationEntry<D>>,
        direction: TransitionDirection,
    ) -> Result<()> {
        let binding = self.binding().ok_or(NavigationError::NotAttached)?;
        let transition = Transition::between(entering, leaving, direction);
        let screen = entering.screen();
        let surface = binding.surface.as_ref();
        let inflater = binding.inflater.as_ref();

        match screen.rendering_anchor() {
            Some(anchor) => {
                self.inner
                    .transitions
                    .go(surface, inflater, &Scene::Existing(anchor), &transition)
            }
            None => {
                let scene = Scene::Inflate(screen.layout());
                self.inner
                    .transitions
                    .go(surface, inflater, &scene, &transition)?;
                screen.state().set_rendering_anchor(surface.first_child());
                Ok(())
            }
        }
    }

    fn is_rendering(&self) -> bool {
        let host = self
            .inner
            .core
            .borrow()
            .binding
            .as_ref()
            .map(|binding| Rc::clone(&binding.host));
        host.map(|host| host.is_visible()).unwrap_or(false)
    }

    fn binding(&self) -> Option<HostBinding<D>> {
        self.inner.core.borrow().binding.clone()
    }

    fn screen_context(&self, screen: &ScreenRef<D>) -> ScreenContext<D> {
        ScreenContext::new(Rc::clone(&self.inner.deps), self.downgrade(), screen)
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.inner.config.logger.as_ref() {
            let event = event_with_fields(level, &self.inner.config.log_target, message, fields);
            let _ = logger.log_event(event);
        }
    }

    fn audit(&self, event: NavigatorAuditEvent) {
        self.inner.config.audit.record(event);
    }

    fn record_metric<F>(&self, record: F)
    where
        F: FnOnce(&mut NavigatorMetrics),
    {
        if let Some(metrics) = self.inner.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut *guard);
            }
        }
    }
}
