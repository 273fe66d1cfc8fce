use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{NavigationError, Result};
use crate::lifecycle::HostLifecycleEvent;
use crate::stack::NavigationEntry;

use super::{Anchor, HostContainer, LayoutDescriptor, LayoutInflater, LifecycleObserver, RenderingSurface};

/// In-memory surface and inflater. Regions are numbered in inflation order.
#[derive(Debug, Default)]
pub struct MemoryCanvas {
    next_id: Cell<u64>,
    nodes: RefCell<HashMap<Anchor, LayoutDescriptor>>,
    children: RefCell<Vec<Anchor>>,
}

impl MemoryCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layout of the region currently shown, if any.
    pub fn current_layout(&self) -> Option<LayoutDescriptor> {
        let first = self.first_child()?;
        self.nodes.borrow().get(&first).cloned()
    }

    pub fn layout_of(&self, anchor: Anchor) -> Option<LayoutDescriptor> {
        self.nodes.borrow().get(&anchor).cloned()
    }

    pub fn inflation_count(&self) -> u64 {
        self.next_id.get()
    }
}

impl RenderingSurface for MemoryCanvas {
    fn clear(&self) {
        self.children.borrow_mut().clear();
    }

    fn attach(&self, anchor: Anchor) -> Result<()> {
        if !self.nodes.borrow().contains_key(&anchor) {
            return Err(NavigationError::Host(format!(
                "anchor {} was never inflated",
                anchor.id()
            )));
        }
        self.children.borrow_mut().push(anchor);
        Ok(())
    }

    fn first_child(&self) -> Option<Anchor> {
        self.children.borrow().first().copied()
    }
}

impl LayoutInflater for MemoryCanvas {
    fn inflate(&self, layout: &LayoutDescriptor) -> Result<Anchor> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let anchor = Anchor::new(id);
        self.nodes.borrow_mut().insert(anchor, layout.clone());
        Ok(anchor)
    }
}

/// Host container backed by a [`MemoryCanvas`]. Visibility follows the last
/// event passed to [`MemoryHost::emit`].
pub struct MemoryHost<D> {
    canvas: Rc<MemoryCanvas>,
    provides_surface: bool,
    provides_inflater: bool,
    latest: Cell<HostLifecycleEvent>,
    observer: RefCell<Option<LifecycleObserver<D>>>,
    first_screen: Box<dyn Fn() -> NavigationEntry<D>>,
}

impl<D: 'static> MemoryHost<D> {
    pub fn new<F>(first_screen: F) -> Self
    where
        F: Fn() -> NavigationEntry<D> + 'static,
    {
        Self {
            canvas: Rc::new(MemoryCanvas::new()),
            provides_surface: true,
            provides_inflater: true,
            latest: Cell::new(HostLifecycleEvent::Create),
            observer: RefCell::new(None),
            first_screen: Box::new(first_screen),
        }
    }

    pub fn without_surface(mut self) -> Self {
        self.provides_surface = false;
        self
    }

    pub fn without_inflater(mut self) -> Self {
        self.provides_inflater = false;
        self
    }

    pub fn canvas(&self) -> Rc<MemoryCanvas> {
        Rc::clone(&self.canvas)
    }

    pub fn latest_event(&self) -> HostLifecycleEvent {
        self.latest.get()
    }

    pub fn is_observed(&self) -> bool {
        self.observer.borrow().is_some()
    }

    /// Record `event` as the host's phase and broadcast it.
    pub fn emit(&self, event: HostLifecycleEvent) -> Result<()> {
        self.latest.set(event);
        let observer = self.observer.borrow().clone();
        match observer {
            Some(observer) => observer.on_event(event),
            None => Ok(()),
        }
    }
}

impl<D: 'static> HostContainer<D> for MemoryHost<D> {
    fn rendering_surface(&self) -> Option<Rc<dyn RenderingSurface>> {
        if !self.provides_surface {
            return None;
        }
        let surface: Rc<dyn RenderingSurface> = self.canvas.clone();
        Some(surface)
    }

    fn layout_inflater(&self) -> Option<Rc<dyn LayoutInflater>> {
        if !self.provides_inflater {
            return None;
        }
        let inflater: Rc<dyn LayoutInflater> = self.canvas.clone();
        Some(inflater)
    }

    fn is_visible(&self) -> bool {
        self.latest.get().is_visible()
    }

    fn first_screen(&self) -> NavigationEntry<D> {
        (self.first_screen)()
    }

    fn hook_into_lifecycle(&self, observer: LifecycleObserver<D>) {
        *self.observer.borrow_mut() = Some(observer);
    }
}
