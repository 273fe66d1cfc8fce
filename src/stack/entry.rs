use std::fmt;

use crate::screen::{Screen, ScreenRef};
use crate::transition::TransitionStyle;

/// A screen plus the navigation intent it was pushed with.
///
/// Entries are values: every modifier consumes the entry and returns an
/// updated copy.
pub struct NavigationEntry<D> {
    screen: ScreenRef<D>,
    single_instance: bool,
    clear_stack: bool,
    needs_restart: bool,
    transition: TransitionStyle,
}

impl<D> NavigationEntry<D> {
    pub fn new(screen: ScreenRef<D>) -> Self {
        Self {
            screen,
            single_instance: false,
            clear_stack: false,
            needs_restart: false,
            transition: TransitionStyle::default(),
        }
    }

    pub fn of<S>(screen: S) -> Self
    where
        S: Screen<D> + 'static,
    {
        Self::new(ScreenRef::new(screen))
    }

    pub fn screen(&self) -> &ScreenRef<D> {
        &self.screen
    }

    pub fn is_single_instance(&self) -> bool {
        self.single_instance
    }

    pub fn is_clear_stack(&self) -> bool {
        self.clear_stack
    }

    /// True once the bound screen has been destroyed; it must be recreated
    /// before any other lifecycle call.
    pub fn needs_restart(&self) -> bool {
        self.needs_restart
    }

    pub fn transition(&self) -> TransitionStyle {
        self.transition
    }

    pub fn single_instance(mut self, single_instance: bool) -> Self {
        self.single_instance = single_instance;
        self
    }

    pub fn clear_stack(mut self, clear_stack: bool) -> Self {
        self.clear_stack = clear_stack;
        self
    }

    pub fn with_transition(mut self, transition: TransitionStyle) -> Self {
        self.transition = transition;
        self
    }

    pub fn with_screen(mut self, screen: ScreenRef<D>) -> Self {
        self.screen = screen;
        self
    }

    pub fn mark_restart_needed(mut self) -> Self {
        self.needs_restart = true;
        self
    }

    /// Entry ready to be rendered again. A destroyed screen is swapped for a
    /// fresh duplicate; a live one is kept as is.
    pub fn restart(self) -> Self {
        if !self.needs_restart {
            return self;
        }
        let fresh = self.screen.duplicate();
        Self {
            needs_restart: false,
            ..self.with_screen(fresh)
        }
    }
}

impl<D> Clone for NavigationEntry<D> {
    fn clone(&self) -> Self {
        Self {
            screen: self.screen.clone(),
            single_instance: self.single_instance,
            clear_stack: self.clear_stack,
            needs_restart: self.needs_restart,
            transition: self.transition,
        }
    }
}

impl<D> fmt::Debug for NavigationEntry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationEntry")
            .field("screen", &self.screen)
            .field("single_instance", &self.single_instance)
            .field("clear_stack", &self.clear_stack)
            .field("needs_restart", &self.needs_restart)
            .field("transition", &self.transition)
            .finish()
    }
}
