use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use super::audit::{BufferedNavigatorAudit, NavigatorAuditStage};
use super::{Navigator, NavigatorConfig};
use crate::error::{NavigationError, Result};
use crate::host::{LayoutDescriptor, LayoutInflater, MemoryHost, RenderingSurface};
use crate::lifecycle::{HostLifecycleEvent, HostPhase, ScreenLifecycleEvent};
use crate::logging::{LogLevel, Logger, MemorySink};
use crate::screen::{BackPressResult, Screen, ScreenContext, ScreenRef, ScreenState};
use crate::stack::NavigationEntry;
use crate::transition::{
    InstantTransition, Scene, Transition, TransitionDirection, TransitionInvoker, TransitionStyle,
};

struct Deps {
    app_name: &'static str,
}

/// Shared record of every hook call, tagged with the instance serial.
#[derive(Clone, Default)]
struct Journal {
    records: Rc<RefCell<Vec<(&'static str, u64, &'static str)>>>,
    next_serial: Rc<Cell<u64>>,
}

impl Journal {
    fn serial(&self) -> u64 {
        let serial = self.next_serial.get();
        self.next_serial.set(serial + 1);
        serial
    }

    fn push(&self, name: &'static str, serial: u64, event: &'static str) {
        self.records.borrow_mut().push((name, serial, event));
    }

    fn len(&self) -> usize {
        self.records.borrow().len()
    }

    fn lines(&self) -> Vec<String> {
        self.since(0)
    }

    fn since(&self, mark: usize) -> Vec<String> {
        self.records.borrow()[mark..]
            .iter()
            .map(|(name, _, event)| format!("{name}:{event}"))
            .collect()
    }

    fn count(&self, line: &str) -> usize {
        self.lines().iter().filter(|l| l.as_str() == line).count()
    }

    fn per_instance(&self) -> HashMap<u64, Vec<&'static str>> {
        let mut grouped: HashMap<u64, Vec<&'static str>> = HashMap::new();
        for (_, serial, event) in self.records.borrow().iter() {
            grouped.entry(*serial).or_default().push(*event);
        }
        grouped
    }
}

/// Screen that journals its hooks and can be told to re-enter the navigator.
struct JournaledScreen {
    name: &'static str,
    key: Option<String>,
    serial: u64,
    journal: Journal,
    state: ScreenState,
    ctx: RefCell<Option<ScreenContext<Deps>>>,
    seen_app: Cell<Option<&'static str>>,
    finish_on_create: Cell<bool>,
    finish_on_pause: Cell<bool>,
    back: Cell<BackPressResult>,
    navigate_on_destroy: RefCell<Option<NavigationEntry<Deps>>>,
    fail_on_destroy: Cell<bool>,
}

impl JournaledScreen {
    fn new(name: &'static str, journal: &Journal) -> Rc<Self> {
        Self::build(name, None, journal)
    }

    fn keyed(name: &'static str, journal: &Journal) -> Rc<Self> {
        Self::build(name, Some(name.to_string()), journal)
    }

    fn build(name: &'static str, key: Option<String>, journal: &Journal) -> Rc<Self> {
        Rc::new(Self {
            name,
            key,
            serial: journal.serial(),
            journal: journal.clone(),
            state: ScreenState::new(),
            ctx: RefCell::new(None),
            seen_app: Cell::new(None),
            finish_on_create: Cell::new(false),
            finish_on_pause: Cell::new(false),
            back: Cell::new(BackPressResult::NavigateBack),
            navigate_on_destroy: RefCell::new(None),
            fail_on_destroy: Cell::new(false),
        })
    }

    fn handle(self: &Rc<Self>) -> ScreenRef<Deps> {
        ScreenRef::from_rc(self.clone())
    }

    fn entry(self: &Rc<Self>) -> NavigationEntry<Deps> {
        NavigationEntry::new(self.handle())
    }

    fn context(&self) -> Option<ScreenContext<Deps>> {
        self.ctx.borrow().clone()
    }

    fn note(&self, event: &'static str) {
        self.journal.push(self.name, self.serial, event);
    }
}

impl Screen<Deps> for JournaledScreen {
    fn name(&self) -> &str {
        self.name
    }

    fn layout(&self) -> LayoutDescriptor {
        LayoutDescriptor::new(self.name)
    }

    fn state(&self) -> &ScreenState {
        &self.state
    }

    fn identity_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn duplicate(&self) -> Rc<dyn Screen<Deps>> {
        let fresh = JournaledScreen::build(self.name, self.key.clone(), &self.journal);
        fresh.back.set(self.back.get());
        fresh
    }

    fn on_create(&self, ctx: &ScreenContext<Deps>) -> Result<()> {
        *self.ctx.borrow_mut() = Some(ctx.clone());
        self.seen_app.set(Some(ctx.deps().app_name));
        self.note("create");
        if self.finish_on_create.get() {
            ctx.finish()?;
        }
        Ok(())
    }

    fn on_resume(&self) -> Result<()> {
        self.note("resume");
        Ok(())
    }

    fn on_pause(&self) -> Result<()> {
        self.note("pause");
        if self.finish_on_pause.get() {
            if let Some(ctx) = self.context() {
                ctx.finish()?;
            }
        }
        Ok(())
    }

    fn on_destroy(&self) -> Result<()> {
        self.note("destroy");
        let next = self.navigate_on_destroy.borrow_mut().take();
        if let (Some(entry), Some(ctx)) = (next, self.context()) {
            ctx.navigate(entry)?;
        }
        if self.fail_on_destroy.get() {
            return Err(NavigationError::screen(format!("{} refused to close", self.name)));
        }
        Ok(())
    }

    fn on_back_pressed(&self) -> BackPressResult {
        self.back.get()
    }
}

#[derive(Clone, Default)]
struct RecordingTransitions {
    seen: Rc<RefCell<Vec<Transition>>>,
}

impl RecordingTransitions {
    fn last(&self) -> Option<Transition> {
        self.seen.borrow().last().cloned()
    }

    fn count(&self) -> usize {
        self.seen.borrow().len()
    }
}

impl TransitionInvoker for RecordingTransitions {
    fn go(
        &self,
        surface: &dyn RenderingSurface,
        inflater: &dyn LayoutInflater,
        scene: &Scene,
        transition: &Transition,
    ) -> Result<()> {
        self.seen.borrow_mut().push(transition.clone());
        InstantTransition.go(surface, inflater, scene, transition)
    }
}

struct Harness {
    nav: Navigator<Deps>,
    host: Rc<MemoryHost<Deps>>,
    journal: Journal,
    transitions: RecordingTransitions,
    audit: Arc<BufferedNavigatorAudit>,
    sink: MemorySink,
    home: Rc<JournaledScreen>,
}

impl Harness {
    fn new() -> Self {
        let journal = Journal::default();
        let home = JournaledScreen::new("A", &journal);
        let host = Rc::new(home_host(&home));
        let transitions = RecordingTransitions::default();
        let audit = Arc::new(BufferedNavigatorAudit::new());
        let sink = MemorySink::new();
        let mut config = NavigatorConfig::default()
            .with_logger(Logger::new(sink.clone()))
            .with_audit(audit.clone());
        config.enable_metrics();
        let nav = Navigator::with_config(
            Deps { app_name: "demo" },
            transitions.clone(),
            config,
        );
        Self {
            nav,
            host,
            journal,
            transitions,
            audit,
            sink,
            home,
        }
    }

    fn attached() -> Self {
        let harness = Self::new();
        harness.nav.attach(harness.host.clone()).unwrap();
        harness
    }

    fn journaled(&self, name: &'static str) -> Rc<JournaledScreen> {
        JournaledScreen::new(name, &self.journal)
    }

    fn names(&self) -> Vec<String> {
        self.nav
            .snapshot()
            .screen_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn top_is(&self, screen: &Rc<JournaledScreen>) -> bool {
        self.nav
            .top_screen()
            .map(|top| Rc::ptr_eq(top.as_rc(), &(screen.clone() as Rc<dyn Screen<Deps>>)))
            .unwrap_or(false)
    }

    /// Replace the host with a fresh one, the way a recreated window would.
    fn recreate_host(&mut self) {
        self.nav.detach().unwrap();
        self.host = Rc::new(home_host(&self.home));
        self.nav.attach(self.host.clone()).unwrap();
    }
}

fn home_host(home: &Rc<JournaledScreen>) -> MemoryHost<Deps> {
    let first = home.handle();
    MemoryHost::new(move || NavigationEntry::new(first.clone()))
}

fn strings(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|line| line.to_string()).collect()
}

#[test]
fn attach_on_empty_stack_renders_first_screen() {
    let h = Harness::attached();

    assert_eq!(h.journal.lines(), strings(&["A:create", "A:resume"]));
    assert_eq!(h.names(), strings(&["A"]));
    assert!(h.nav.is_attached());
    assert!(h.host.is_observed());
    assert_eq!(
        h.host.canvas().current_layout(),
        Some(LayoutDescriptor::new("A"))
    );
    assert!(h.home.state().rendering_anchor().is_some());
    assert_eq!(h.home.seen_app.get(), Some("demo"));
    assert_eq!(
        &h.audit.stages()[..2],
        &[
            NavigatorAuditStage::HostAttached,
            NavigatorAuditStage::FirstScreenRendered
        ]
    );
}

#[test]
fn navigate_pauses_previous_top_and_starts_new_screen() {
    let h = Harness::attached();
    let b = h.journaled("B");
    let mark = h.journal.len();

    h.nav
        .navigate(b.entry().with_transition(TransitionStyle::Slide))
        .unwrap();

    assert_eq!(
        h.journal.since(mark),
        strings(&["A:pause", "B:create", "B:resume"])
    );
    assert_eq!(h.names(), strings(&["B", "A"]));
    assert_eq!(
        h.host.canvas().current_layout(),
        Some(LayoutDescriptor::new("B"))
    );
    let transition = h.transitions.last().unwrap();
    assert_eq!(transition.entering, "B");
    assert_eq!(transition.leaving.as_deref(), Some("A"));
    assert_eq!(transition.style, TransitionStyle::Slide);
    assert_eq!(transition.direction, TransitionDirection::Forward);
}

#[test]
fn detach_destroys_everything_once_and_reattach_restarts_top() {
    let mut h = Harness::attached();
    let b = h.journaled("B");
    h.nav.navigate(b.entry()).unwrap();

    let mark = h.journal.len();
    h.nav.detach().unwrap();
    assert_eq!(h.journal.since(mark), strings(&["A:destroy", "B:destroy"]));
    assert!(!h.nav.is_attached());
    let snapshot = h.nav.snapshot();
    assert_eq!(snapshot.screen_names(), vec!["B", "A"]);
    assert!(snapshot.entries.iter().all(|entry| entry.needs_restart));
    assert!(snapshot.entries.iter().all(|entry| !entry.anchored));

    // A second detach owes nothing to already destroyed screens.
    let mark = h.journal.len();
    h.nav.detach().unwrap();
    assert!(h.journal.since(mark).is_empty());

    h.host = Rc::new(home_host(&h.home));
    h.nav.attach(h.host.clone()).unwrap();
    assert_eq!(
        h.journal.since(mark),
        strings(&["B:create", "B:resume"])
    );
    assert_eq!(h.names(), strings(&["B", "A"]));
    assert!(!h.top_is(&b));
    let entries = h.nav.entries();
    assert!(!entries[0].needs_restart());
    assert!(entries[1].needs_restart());
    assert_eq!(h.journal.count("B:destroy"), 1);
    assert_eq!(h.journal.count("A:destroy"), 1);
}

#[test]
fn single_instance_brings_existing_screen_forward_without_create() {
    let h = Harness::attached();
    let b = h.journaled("B");
    h.nav.navigate(b.entry()).unwrap();
    let mark = h.journal.len();

    h.nav
        .navigate(h.home.entry().single_instance(true))
        .unwrap();

    assert_eq!(h.journal.since(mark), strings(&["B:pause", "A:resume"]));
    assert_eq!(h.names(), strings(&["A", "B"]));
    assert!(h.top_is(&h.home));
    assert_eq!(h.journal.count("A:create"), 1);
    assert!(
        h.audit
            .stages()
            .contains(&NavigatorAuditStage::SingleInstanceMerged)
    );
}

#[test]
fn single_instance_matching_top_is_a_no_op() {
    let h = Harness::attached();
    let mark = h.journal.len();
    let transitions = h.transitions.count();

    h.nav
        .navigate(h.home.entry().single_instance(true))
        .unwrap();

    assert!(h.journal.since(mark).is_empty());
    assert_eq!(h.transitions.count(), transitions);
    assert_eq!(h.nav.depth(), 1);
    assert!(h.sink.messages().contains(&"navigation_skipped".to_string()));
}

#[test]
fn single_instance_matches_by_identity_key() {
    let h = Harness::attached();
    let first = JournaledScreen::keyed("Settings", &h.journal);
    let b = h.journaled("B");
    h.nav.navigate(first.entry()).unwrap();
    h.nav.navigate(b.entry()).unwrap();
    let mark = h.journal.len();

    let second = JournaledScreen::keyed("Settings", &h.journal);
    h.nav.navigate(second.entry().single_instance(true)).unwrap();

    assert_eq!(
        h.journal.since(mark),
        strings(&["B:pause", "Settings:resume"])
    );
    assert_eq!(h.names(), strings(&["Settings", "B", "A"]));
    assert!(h.top_is(&first));
}

#[test]
fn single_instance_over_destroyed_entry_creates_fresh_instance() {
    let mut h = Harness::attached();
    let b = h.journaled("B");
    h.nav.navigate(b.entry()).unwrap();
    h.recreate_host();
    // Stack is [B (restarted), A (awaiting restart)].
    let mark = h.journal.len();

    h.nav
        .navigate(h.home.entry().single_instance(true))
        .unwrap();

    assert_eq!(
        h.journal.since(mark),
        strings(&["B:pause", "A:create", "A:resume"])
    );
    assert_eq!(h.names(), strings(&["A", "B"]));
    assert!(!h.top_is(&h.home));
    assert!(h.nav.entries().iter().all(|entry| !entry.needs_restart()));
}

#[test]
fn clear_stack_destroys_everything_before_pushing() {
    let h = Harness::attached();
    let b = h.journaled("B");
    let c = h.journaled("C");
    h.nav.navigate(b.entry()).unwrap();
    let mark = h.journal.len();

    h.nav.navigate(c.entry().clear_stack(true)).unwrap();

    assert_eq!(
        h.journal.since(mark),
        strings(&["B:pause", "B:destroy", "A:destroy", "C:create", "C:resume"])
    );
    assert_eq!(h.names(), strings(&["C"]));
    let transition = h.transitions.last().unwrap();
    assert_eq!(transition.leaving, None);
}

#[test]
fn finish_from_on_pause_during_host_pause_runs_each_hook_once() {
    let h = Harness::attached();
    let b = h.journaled("B");
    h.nav.navigate(b.entry()).unwrap();
    b.finish_on_pause.set(true);
    let mark = h.journal.len();

    h.host.emit(HostLifecycleEvent::Pause).unwrap();

    assert_eq!(h.journal.since(mark), strings(&["B:pause", "B:destroy"]));
    assert_eq!(h.names(), strings(&["A"]));
    assert_eq!(h.journal.count("B:pause"), 1);

    let mark = h.journal.len();
    h.host.emit(HostLifecycleEvent::Resume).unwrap();
    assert_eq!(h.journal.since(mark), strings(&["A:resume"]));
}

#[test]
fn finish_from_on_pause_while_navigating_leaves_new_screen_on_top() {
    let h = Harness::attached();
    let b = h.journaled("B");
    let c = h.journaled("C");
    h.nav.navigate(b.entry()).unwrap();
    b.finish_on_pause.set(true);
    let mark = h.journal.len();

    h.nav.navigate(c.entry()).unwrap();

    assert_eq!(
        h.journal.since(mark),
        strings(&["B:pause", "B:destroy", "C:create", "C:resume"])
    );
    assert_eq!(h.names(), strings(&["C", "A"]));
}

#[test]
fn finish_during_create_never_resumes_the_screen() {
    let h = Harness::attached();
    let b = h.journaled("B");
    b.finish_on_create.set(true);
    let mark = h.journal.len();

    h.nav.navigate(b.entry()).unwrap();

    assert_eq!(
        h.journal.since(mark),
        strings(&["A:pause", "B:create", "B:pause", "B:destroy", "A:resume"])
    );
    assert_eq!(h.names(), strings(&["A"]));
    assert_eq!(b.state().latest_lifecycle_event(), ScreenLifecycleEvent::Destroy);
}

#[test]
fn destroy_hook_may_navigate_during_finish() {
    let h = Harness::attached();
    let b = h.journaled("B");
    let c = h.journaled("C");
    h.nav.navigate(b.entry()).unwrap();
    *b.navigate_on_destroy.borrow_mut() = Some(c.entry());
    let mark = h.journal.len();

    assert!(h.nav.handle_back_press().unwrap());

    assert_eq!(
        h.journal.since(mark),
        strings(&["B:pause", "B:destroy", "C:create", "C:resume"])
    );
    assert_eq!(h.names(), strings(&["C", "A"]));
    assert_eq!(h.journal.count("C:resume"), 1);
    assert_eq!(h.journal.count("A:resume"), 1);
}

#[test]
fn finish_below_top_only_destroys() {
    let h = Harness::attached();
    let b = h.journaled("B");
    h.nav.navigate(b.entry()).unwrap();
    let mark = h.journal.len();

    h.nav.finish(&h.home.handle()).unwrap();

    assert_eq!(h.journal.since(mark), strings(&["A:destroy"]));
    assert_eq!(h.names(), strings(&["B"]));
    assert!(h.top_is(&b));
}

#[test]
fn finish_of_unknown_screen_is_ignored() {
    let h = Harness::attached();
    let stranger = h.journaled("Stranger");
    let mark = h.journal.len();

    h.nav.finish(&stranger.handle()).unwrap();

    assert!(h.journal.since(mark).is_empty());
    assert_eq!(h.names(), strings(&["A"]));
    assert!(
        h.audit
            .stages()
            .contains(&NavigatorAuditStage::StaleFinishIgnored)
    );
    let warning = h
        .sink
        .events()
        .into_iter()
        .find(|event| event.message == "stale_finish_ignored")
        .unwrap();
    assert_eq!(warning.level, LogLevel::Warn);
    assert_eq!(h.nav.metrics_snapshot().unwrap().stale_finishes, 1);
}

#[test]
fn finish_top_restarts_ghost_beneath() {
    let mut h = Harness::attached();
    let b = h.journaled("B");
    h.nav.navigate(b.entry()).unwrap();
    h.recreate_host();
    let mark = h.journal.len();

    assert!(h.nav.handle_back_press().unwrap());

    assert_eq!(
        h.journal.since(mark),
        strings(&["B:pause", "B:destroy", "A:create", "A:resume"])
    );
    assert_eq!(h.names(), strings(&["A"]));
    assert!(!h.nav.entries()[0].needs_restart());
    let transition = h.transitions.last().unwrap();
    assert_eq!(transition.direction, TransitionDirection::Backward);
    assert_eq!(transition.leaving.as_deref(), Some("B"));
}

#[test]
fn finishing_a_pending_top_resumes_the_screen_beneath() {
    let h = Harness::attached();
    let b = h.journaled("B");
    h.host.emit(HostLifecycleEvent::Pause).unwrap();
    h.nav.navigate(b.entry()).unwrap();
    // Not a direct PAUSE -> RESUME, so the deferred entry stays pending.
    h.host.emit(HostLifecycleEvent::Stop).unwrap();
    h.host.emit(HostLifecycleEvent::Start).unwrap();
    h.host.emit(HostLifecycleEvent::Resume).unwrap();
    assert!(h.nav.entries()[0].needs_restart());
    let mark = h.journal.len();

    assert!(h.nav.handle_back_press().unwrap());

    assert_eq!(h.journal.since(mark), strings(&["A:resume"]));
    assert_eq!(h.names(), strings(&["A"]));
    assert_eq!(
        h.home.state().latest_lifecycle_event(),
        ScreenLifecycleEvent::Resume
    );
    let transition = h.transitions.last().unwrap();
    assert_eq!(transition.direction, TransitionDirection::Backward);
    assert_eq!(transition.leaving.as_deref(), Some("B"));
}

#[test]
fn finishing_a_pending_top_while_hidden_leaves_the_rest_paused() {
    let h = Harness::attached();
    let b = h.journaled("B");
    h.host.emit(HostLifecycleEvent::Pause).unwrap();
    h.nav.navigate(b.entry()).unwrap();
    let mark = h.journal.len();

    h.nav.finish(&b.handle()).unwrap();

    assert!(h.journal.since(mark).is_empty());
    assert_eq!(h.names(), strings(&["A"]));

    h.host.emit(HostLifecycleEvent::Resume).unwrap();
    assert_eq!(h.journal.since(mark), strings(&["A:resume"]));
}

#[test]
fn detach_destroys_every_screen_even_when_one_fails() {
    let h = Harness::attached();
    let b = h.journaled("B");
    h.nav.navigate(b.entry()).unwrap();
    h.home.fail_on_destroy.set(true);
    let mark = h.journal.len();

    let err = h.nav.detach().unwrap_err();

    assert!(matches!(err, NavigationError::Screen(_)));
    assert_eq!(h.journal.since(mark), strings(&["A:destroy", "B:destroy"]));
    assert_eq!(b.state().latest_lifecycle_event(), ScreenLifecycleEvent::Destroy);
    assert!(h.nav.entries().iter().all(|entry| entry.needs_restart()));
    assert!(!h.nav.is_attached());
    assert!(h.sink.messages().contains(&"screen_hook_failed".to_string()));

    // Nothing is owed to either screen on a later detach.
    h.nav.detach().unwrap();
    assert_eq!(h.journal.count("B:destroy"), 1);
    assert_eq!(h.journal.count("A:destroy"), 1);
}

#[test]
fn clear_stack_destroys_every_screen_even_when_one_fails() {
    let h = Harness::attached();
    let b = h.journaled("B");
    let c = h.journaled("C");
    h.nav.navigate(b.entry()).unwrap();
    b.fail_on_destroy.set(true);
    let mark = h.journal.len();

    let err = h.nav.navigate(c.entry().clear_stack(true)).unwrap_err();

    assert!(matches!(err, NavigationError::Screen(ref message) if message.contains("B")));
    assert_eq!(
        h.journal.since(mark),
        strings(&["B:pause", "B:destroy", "A:destroy"])
    );
    assert_eq!(
        h.home.state().latest_lifecycle_event(),
        ScreenLifecycleEvent::Destroy
    );
    assert_eq!(h.nav.depth(), 0);
}

#[test]
fn back_press_finishes_top_and_uses_its_transition() {
    let h = Harness::attached();
    let b = h.journaled("B");
    h.nav
        .navigate(b.entry().with_transition(TransitionStyle::Fade))
        .unwrap();
    let mark = h.journal.len();

    assert!(h.nav.handle_back_press().unwrap());

    assert_eq!(
        h.journal.since(mark),
        strings(&["B:pause", "B:destroy", "A:resume"])
    );
    let transition = h.transitions.last().unwrap();
    assert_eq!(transition.entering, "A");
    assert_eq!(transition.style, TransitionStyle::Fade);
    assert_eq!(transition.direction, TransitionDirection::Backward);
    assert_eq!(
        h.host.canvas().current_layout(),
        Some(LayoutDescriptor::new("A"))
    );
}

#[test]
fn back_press_on_last_screen_falls_through() {
    let h = Harness::attached();
    let mark = h.journal.len();

    assert!(!h.nav.handle_back_press().unwrap());

    assert!(h.journal.since(mark).is_empty());
    assert_eq!(h.names(), strings(&["A"]));
    assert_eq!(h.nav.metrics_snapshot().unwrap().back_presses_declined, 1);
}

#[test]
fn back_press_consumed_by_screen_keeps_stack() {
    let h = Harness::attached();
    let b = h.journaled("B");
    h.nav.navigate(b.entry()).unwrap();
    b.back.set(BackPressResult::Stay);
    let mark = h.journal.len();

    assert!(h.nav.handle_back_press().unwrap());

    assert!(h.journal.since(mark).is_empty());
    assert_eq!(h.names(), strings(&["B", "A"]));
}

#[test]
fn back_press_on_empty_stack_is_an_error() {
    let h = Harness::new();
    let err = h.nav.handle_back_press().unwrap_err();
    assert!(matches!(err, NavigationError::EmptyStack));
    assert!(err.is_invariant_violation());
}

#[test]
fn attaching_twice_is_rejected() {
    let h = Harness::attached();
    let other = Rc::new(home_host(&h.home));
    let err = h.nav.attach(other.clone()).unwrap_err();
    assert!(matches!(err, NavigationError::AlreadyAttached));
    assert!(!other.is_observed());
    assert_eq!(h.journal.count("A:create"), 1);
}

#[test]
fn incomplete_host_is_rejected() {
    let h = Harness::new();
    let no_surface = Rc::new(home_host(&h.home).without_surface());
    let err = h.nav.attach(no_surface).unwrap_err();
    assert!(matches!(err, NavigationError::IncompleteHost("rendering surface")));

    let no_inflater = Rc::new(home_host(&h.home).without_inflater());
    let err = h.nav.attach(no_inflater).unwrap_err();
    assert!(matches!(err, NavigationError::IncompleteHost("layout inflater")));

    assert!(!h.nav.is_attached());
    assert!(h.journal.lines().is_empty());
}

#[test]
fn resume_is_forwarded_only_after_pause() {
    let h = Harness::attached();
    let mark = h.journal.len();

    h.host.emit(HostLifecycleEvent::Start).unwrap();
    h.host.emit(HostLifecycleEvent::Resume).unwrap();
    assert!(h.journal.since(mark).is_empty());
    assert_eq!(h.nav.host_phase(), HostPhase::Resumed);

    h.host.emit(HostLifecycleEvent::Pause).unwrap();
    assert_eq!(h.nav.host_phase(), HostPhase::Paused);
    h.host.emit(HostLifecycleEvent::Resume).unwrap();
    h.host.emit(HostLifecycleEvent::Resume).unwrap();
    assert_eq!(h.journal.since(mark), strings(&["A:pause", "A:resume"]));

    h.host.emit(HostLifecycleEvent::Pause).unwrap();
    h.host.emit(HostLifecycleEvent::Stop).unwrap();
    h.host.emit(HostLifecycleEvent::Resume).unwrap();
    assert_eq!(
        h.journal.since(mark),
        strings(&["A:pause", "A:resume", "A:pause"])
    );
    assert_eq!(h.nav.metrics_snapshot().unwrap().lifecycle_events, 8);
}

#[test]
fn events_from_a_replaced_host_are_ignored() {
    let mut h = Harness::attached();
    let old_host = h.host.clone();
    h.recreate_host();
    let mark = h.journal.len();

    old_host.emit(HostLifecycleEvent::Pause).unwrap();

    assert!(h.journal.since(mark).is_empty());
    assert!(
        h.sink
            .messages()
            .contains(&"stale_host_event_ignored".to_string())
    );
}

#[test]
fn navigation_while_host_is_paused_is_deferred_until_resume() {
    let h = Harness::attached();
    let b = h.journaled("B");
    h.host.emit(HostLifecycleEvent::Pause).unwrap();
    let mark = h.journal.len();

    h.nav.navigate(b.entry()).unwrap();

    assert!(h.journal.since(mark).is_empty());
    assert_eq!(h.names(), strings(&["B", "A"]));
    assert!(h.nav.entries()[0].needs_restart());
    assert_eq!(h.nav.metrics_snapshot().unwrap().deferred, 1);

    h.host.emit(HostLifecycleEvent::Resume).unwrap();

    assert_eq!(h.journal.since(mark), strings(&["B:create", "B:resume"]));
    assert_eq!(h.names(), strings(&["B", "A"]));
    assert!(h.nav.entries().iter().all(|entry| !entry.needs_restart()));
    assert_eq!(h.journal.count("A:pause"), 1);
    assert!(!h.top_is(&b));
}

#[test]
fn single_instance_of_live_screen_while_paused_destroys_it() {
    let h = Harness::attached();
    let b = h.journaled("B");
    h.nav.navigate(b.entry()).unwrap();
    h.host.emit(HostLifecycleEvent::Pause).unwrap();
    let mark = h.journal.len();

    h.nav
        .navigate(h.home.entry().single_instance(true))
        .unwrap();

    assert_eq!(h.journal.since(mark), strings(&["A:destroy"]));
    assert_eq!(h.names(), strings(&["A", "B"]));
    assert!(h.nav.entries()[0].needs_restart());
}

#[test]
fn navigation_before_attach_is_replayed_on_attach() {
    let h = Harness::new();
    let b = h.journaled("B");

    h.nav.navigate(b.entry()).unwrap();
    assert!(h.journal.lines().is_empty());

    h.nav.attach(h.host.clone()).unwrap();

    assert_eq!(h.journal.lines(), strings(&["B:create", "B:resume"]));
    assert_eq!(h.names(), strings(&["B"]));
    assert!(
        h.audit
            .stages()
            .contains(&NavigatorAuditStage::StackReplayed)
    );
}

#[test]
fn resume_with_ghost_top_and_no_host_reports_restart_pending() {
    let h = Harness::attached();
    let b = h.journaled("B");
    h.nav.navigate(b.entry()).unwrap();
    h.nav.detach().unwrap();

    h.nav
        .dispatch_lifecycle_event(HostLifecycleEvent::Pause)
        .unwrap();
    let err = h
        .nav
        .dispatch_lifecycle_event(HostLifecycleEvent::Resume)
        .unwrap_err();

    assert!(matches!(err, NavigationError::RestartPending(ref name) if name == "B"));
    assert!(err.is_invariant_violation());
}

#[test]
fn weak_handles_report_a_dropped_navigator() {
    let h = Harness::attached();
    let weak = h.nav.downgrade();
    let stray = h.journaled("Stray");
    let Harness { nav, host, .. } = h;
    nav.detach().unwrap();
    drop(nav);

    let err = weak.navigate(stray.entry()).unwrap_err();
    assert!(matches!(err, NavigationError::ControllerGone));
    // The observer outlives the navigator and quietly drops events.
    host.emit(HostLifecycleEvent::Pause).unwrap();
}

#[test]
fn snapshot_and_logs_describe_the_stack() {
    let h = Harness::attached();
    let b = h.journaled("B");
    h.nav.navigate(b.entry().single_instance(true)).unwrap();
    h.nav.log_snapshot();

    let snapshot = h.nav.snapshot();
    assert!(snapshot.attached);
    assert_eq!(snapshot.entries[0].lifecycle, ScreenLifecycleEvent::Resume);
    assert_eq!(snapshot.entries[1].lifecycle, ScreenLifecycleEvent::Pause);
    assert!(snapshot.entries[0].single_instance);
    assert!(snapshot.to_json().unwrap().contains("\"screen\":\"B\""));

    let messages = h.sink.messages();
    for expected in [
        "host_attached",
        "first_screen_rendered",
        "screen_pushed",
        "stack_snapshot",
    ] {
        assert!(messages.contains(&expected.to_string()), "missing {expected}");
    }
    let pushed = h
        .sink
        .events()
        .into_iter()
        .find(|event| event.message == "screen_pushed")
        .unwrap();
    assert_eq!(pushed.target, super::DEFAULT_LOG_TARGET);
    assert_eq!(pushed.field("screen"), Some(&serde_json::json!("B")));

    let metrics = h.nav.metrics_snapshot().unwrap();
    assert_eq!(metrics.navigations, 1);
    assert_eq!(metrics.deferred, 0);
}

#[test]
fn navigator_without_metrics_reports_none() {
    let journal = Journal::default();
    let home = JournaledScreen::new("A", &journal);
    let nav = Navigator::new(Deps { app_name: "bare" }, InstantTransition);
    nav.attach(Rc::new(home_host(&home))).unwrap();

    assert!(nav.metrics_snapshot().is_none());
    assert_eq!(journal.lines(), strings(&["A:create", "A:resume"]));
    assert_eq!(nav.deps().app_name, "bare");
}

/// Small deterministic generator for the operation sequences below.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next() % bound as u64) as usize
    }
}

const KEYS: [&str; 3] = ["K0", "K1", "K2"];
const PLAIN: [&str; 3] = ["P0", "P1", "P2"];

fn assert_unique(nav: &Navigator<Deps>) {
    let entries = nav.entries();
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            assert_ne!(a.screen(), b.screen(), "duplicate entry {}", a.screen().name());
        }
    }
}

fn assert_lifecycle_contract(journal: &Journal) {
    for (serial, events) in journal.per_instance() {
        let mut previous = "none";
        for event in events {
            let allowed = match (previous, event) {
                ("none", "create") => true,
                ("create", "resume" | "pause" | "destroy") => true,
                ("resume", "pause") => true,
                ("pause", "resume" | "destroy") => true,
                _ => false,
            };
            assert!(allowed, "instance {serial}: {event} after {previous}");
            previous = event;
        }
    }
}

fn run_random_session(seed: u64, steps: usize) {
    let mut h = Harness::attached();
    let mut rng = XorShift(seed);

    for _ in 0..steps {
        match rng.below(8) {
            0 => {
                let screen = h.journaled(PLAIN[rng.below(PLAIN.len())]);
                h.nav.navigate(screen.entry()).unwrap();
            }
            1 => {
                let screen = JournaledScreen::keyed(KEYS[rng.below(KEYS.len())], &h.journal);
                h.nav
                    .navigate(screen.entry().single_instance(true))
                    .unwrap();
            }
            2 => {
                if h.nav.depth() > 0 {
                    h.nav.handle_back_press().unwrap();
                }
            }
            3 => {
                // Keep at least one entry so a recreated host never re-renders
                // its already destroyed first screen.
                let entries = h.nav.entries();
                if entries.len() > 1 {
                    let victim = entries[rng.below(entries.len())].screen().clone();
                    h.nav.finish(&victim).unwrap();
                }
            }
            4 => h.host.emit(HostLifecycleEvent::Pause).unwrap(),
            5 => h.host.emit(HostLifecycleEvent::Resume).unwrap(),
            6 => {
                h.host.emit(HostLifecycleEvent::Pause).unwrap();
                h.host.emit(HostLifecycleEvent::Stop).unwrap();
                h.recreate_host();
                h.host.emit(HostLifecycleEvent::Start).unwrap();
                h.host.emit(HostLifecycleEvent::Resume).unwrap();
            }
            _ => {
                let screen = h.journaled(PLAIN[rng.below(PLAIN.len())]);
                h.nav.navigate(screen.entry().clear_stack(true)).unwrap();
            }
        }
        assert_unique(&h.nav);
    }
    assert_lifecycle_contract(&h.journal);
}

#[test]
fn random_sessions_keep_stack_unique_and_lifecycles_ordered() {
    for seed in [0x9e37_79b9_7f4a_7c15, 0x2545_f491_4f6c_dd1d, 42] {
        run_random_session(seed, 300);
    }
}
