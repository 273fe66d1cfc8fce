use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::lifecycle::HostLifecycleEvent;
use crate::navigator::WeakNavigator;
use crate::stack::NavigationEntry;

/// Opaque handle to a region the host rendered for a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor(u64);

impl Anchor {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Names the layout a screen inflates into the rendering surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutDescriptor(Cow<'static, str>);

impl LayoutDescriptor {
    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayoutDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The single region of the host that shows the current screen.
pub trait RenderingSurface {
    /// Detach whatever is currently shown.
    fn clear(&self);

    /// Show a previously inflated region.
    fn attach(&self, anchor: Anchor) -> Result<()>;

    fn first_child(&self) -> Option<Anchor>;
}

/// Builds regions from layout descriptors.
pub trait LayoutInflater {
    fn inflate(&self, layout: &LayoutDescriptor) -> Result<Anchor>;
}

/// The external container the navigator renders into.
pub trait HostContainer<D> {
    fn rendering_surface(&self) -> Option<Rc<dyn RenderingSurface>>;

    fn layout_inflater(&self) -> Option<Rc<dyn LayoutInflater>>;

    /// Reflects the host's current lifecycle phase.
    fn is_visible(&self) -> bool;

    /// Entry rendered when the navigator attaches with an empty stack.
    fn first_screen(&self) -> NavigationEntry<D>;

    /// Called once per attach; the host feeds its lifecycle events to the
    /// observer until it is detached.
    fn hook_into_lifecycle(&self, observer: LifecycleObserver<D>);
}

/// Resources captured from a host on attach.
pub(crate) struct HostBinding<D> {
    pub(crate) host: Rc<dyn HostContainer<D>>,
    pub(crate) surface: Rc<dyn RenderingSurface>,
    pub(crate) inflater: Rc<dyn LayoutInflater>,
    pub(crate) generation: u64,
}

impl<D> Clone for HostBinding<D> {
    fn clone(&self) -> Self {
        Self {
            host: Rc::clone(&self.host),
            surface: Rc::clone(&self.surface),
            inflater: Rc::clone(&self.inflater),
            generation: self.generation,
        }
    }
}

/// Subscription handed to a host. Tagged with the attach it belongs to, so
/// events from a host that has since been detached are dropped.
pub struct LifecycleObserver<D> {
    navigator: WeakNavigator<D>,
    generation: u64,
}

impl<D: 'static> LifecycleObserver<D> {
    pub(crate) fn new(navigator: WeakNavigator<D>, generation: u64) -> Self {
        Self {
            navigator,
            generation,
        }
    }

    pub fn on_event(&self, event: HostLifecycleEvent) -> Result<()> {
        match self.navigator.upgrade() {
            Some(navigator) => navigator.dispatch_host_event(self.generation, event),
            None => Ok(()),
        }
    }
}

impl<D> Clone for LifecycleObserver<D> {
    fn clone(&self) -> Self {
        Self {
            navigator: self.navigator.clone(),
            generation: self.generation,
        }
    }
}
