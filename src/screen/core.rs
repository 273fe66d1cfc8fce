use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::Result;
use crate::host::{Anchor, LayoutDescriptor};
use crate::lifecycle::ScreenLifecycleEvent;
use crate::navigator::WeakNavigator;
use crate::stack::NavigationEntry;

/// Outcome of asking a screen how it wants to react to a back press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackPressResult {
    /// The screen consumed the press.
    Stay,
    /// The screen wants to be finished.
    NavigateBack,
}

/// Per-screen bookkeeping embedded by every [`Screen`] implementation.
///
/// The navigator stamps the lifecycle event here right before it runs the
/// matching hook, so a hook that re-enters the navigator sees its own
/// in-progress state.
#[derive(Debug, Default)]
pub struct ScreenState {
    latest: Cell<ScreenLifecycleEvent>,
    anchor: Cell<Option<Anchor>>,
}

impl ScreenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest_lifecycle_event(&self) -> ScreenLifecycleEvent {
        self.latest.get()
    }

    pub fn rendering_anchor(&self) -> Option<Anchor> {
        self.anchor.get()
    }

    pub(crate) fn record(&self, event: ScreenLifecycleEvent) {
        self.latest.set(event);
    }

    pub(crate) fn set_rendering_anchor(&self, anchor: Option<Anchor>) {
        self.anchor.set(anchor);
    }
}

/// Everything a screen receives when it is created.
///
/// Holds only weak references to the navigator and the screen itself, so a
/// screen may keep its context without creating a reference cycle.
pub struct ScreenContext<D> {
    deps: Rc<D>,
    navigator: WeakNavigator<D>,
    screen: Weak<dyn Screen<D>>,
}

impl<D: 'static> ScreenContext<D> {
    pub(crate) fn new(deps: Rc<D>, navigator: WeakNavigator<D>, screen: &ScreenRef<D>) -> Self {
        Self {
            deps,
            navigator,
            screen: Rc::downgrade(screen.as_rc()),
        }
    }

    pub fn deps(&self) -> &D {
        &self.deps
    }

    /// Handle for requesting navigation from later callbacks.
    pub fn navigator(&self) -> WeakNavigator<D> {
        self.navigator.clone()
    }

    pub fn navigate(&self, entry: NavigationEntry<D>) -> Result<()> {
        self.navigator.navigate(entry)
    }

    /// Finish the screen this context was created for.
    pub fn finish(&self) -> Result<()> {
        match self.screen.upgrade() {
            Some(screen) => self.navigator.finish(&ScreenRef::from_rc(screen)),
            None => Ok(()),
        }
    }
}

impl<D> Clone for ScreenContext<D> {
    fn clone(&self) -> Self {
        Self {
            deps: Rc::clone(&self.deps),
            navigator: self.navigator.clone(),
            screen: Weak::clone(&self.screen),
        }
    }
}

/// A unit of presented content with its own lifecycle.
///
/// Hooks take `&self`: a hook may call back into the navigator, which in turn
/// reads this screen's [`ScreenState`], so implementations keep their own
/// mutable data behind `Cell`/`RefCell`.
pub trait Screen<D> {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn layout(&self) -> LayoutDescriptor;

    fn state(&self) -> &ScreenState;

    /// Opt-in logical identity. Two screens reporting the same key compare
    /// equal even when they are different instances.
    fn identity_key(&self) -> Option<&str> {
        None
    }

    /// Fresh, never-created instance standing in for this one after restart.
    fn duplicate(&self) -> Rc<dyn Screen<D>>;

    fn on_create(&self, _ctx: &ScreenContext<D>) -> Result<()> {
        Ok(())
    }

    fn on_resume(&self) -> Result<()> {
        Ok(())
    }

    fn on_pause(&self) -> Result<()> {
        Ok(())
    }

    fn on_destroy(&self) -> Result<()> {
        Ok(())
    }

    fn on_back_pressed(&self) -> BackPressResult {
        BackPressResult::NavigateBack
    }
}

/// Shared handle to a screen, compared by identity.
pub struct ScreenRef<D>(Rc<dyn Screen<D>>);

impl<D> ScreenRef<D> {
    pub fn new<S>(screen: S) -> Self
    where
        S: Screen<D> + 'static,
    {
        Self(Rc::new(screen))
    }

    pub fn from_rc(screen: Rc<dyn Screen<D>>) -> Self {
        Self(screen)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn layout(&self) -> LayoutDescriptor {
        self.0.layout()
    }

    pub fn state(&self) -> &ScreenState {
        self.0.state()
    }

    pub fn latest_lifecycle_event(&self) -> ScreenLifecycleEvent {
        self.0.state().latest_lifecycle_event()
    }

    pub fn rendering_anchor(&self) -> Option<Anchor> {
        self.0.state().rendering_anchor()
    }

    pub fn duplicate(&self) -> Self {
        Self(self.0.duplicate())
    }

    pub fn on_back_pressed(&self) -> BackPressResult {
        self.0.on_back_pressed()
    }

    pub fn as_rc(&self) -> &Rc<dyn Screen<D>> {
        &self.0
    }

    pub(crate) fn create(&self, ctx: &ScreenContext<D>) -> Result<()> {
        self.state().record(ScreenLifecycleEvent::Create);
        self.0.on_create(ctx)
    }

    pub(crate) fn resume(&self) -> Result<()> {
        self.state().record(ScreenLifecycleEvent::Resume);
        self.0.on_resume()
    }

    pub(crate) fn pause(&self) -> Result<()> {
        self.state().record(ScreenLifecycleEvent::Pause);
        self.0.on_pause()
    }

    pub(crate) fn destroy(&self) -> Result<()> {
        self.state().record(ScreenLifecycleEvent::Destroy);
        self.state().set_rendering_anchor(None);
        self.0.on_destroy()
    }
}

impl<D> Clone for ScreenRef<D> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<D> PartialEq for ScreenRef<D> {
    fn eq(&self, other: &Self) -> bool {
        if Rc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        match (self.0.identity_key(), other.0.identity_key()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl<D> fmt::Debug for ScreenRef<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenRef")
            .field("name", &self.name())
            .field("lifecycle", &self.latest_lifecycle_event())
            .finish()
    }
}
