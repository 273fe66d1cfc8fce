//! Glue between the navigator and the external transition engine.
//!
//! The navigator describes each screen change as a [`Scene`] plus a
//! [`Transition`]; a [`TransitionInvoker`] is responsible for actually
//! swapping regions on the rendering surface.

use serde::Serialize;

use crate::error::Result;
use crate::host::{Anchor, LayoutDescriptor, LayoutInflater, RenderingSurface};
use crate::stack::NavigationEntry;

/// Animation flavour requested by a navigation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStyle {
    #[default]
    Default,
    Fade,
    Slide,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionDirection {
    /// A screen is pushed over the previous top.
    Forward,
    /// The top was finished and the screen beneath comes back.
    Backward,
}

/// What the surface should show once the transition completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scene {
    /// Entering screen has never been rendered; inflate its layout.
    Inflate(LayoutDescriptor),
    /// Entering screen already owns a region.
    Existing(Anchor),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub entering: String,
    pub leaving: Option<String>,
    pub style: TransitionStyle,
    pub direction: TransitionDirection,
}

impl Transition {
    /// Forward transitions use the entering entry's style; backward ones replay
    /// the style of the entry being left.
    pub fn between<D>(
        entering: &NavigationEntry<D>,
        leaving: Option<&NavigationEntry<D>>,
        direction: TransitionDirection,
    ) -> Self {
        let style = match (direction, leaving) {
            (TransitionDirection::Backward, Some(leaving)) => leaving.transition(),
            _ => entering.transition(),
        };
        Self {
            entering: entering.screen().name().to_string(),
            leaving: leaving.map(|entry| entry.screen().name().to_string()),
            style,
            direction,
        }
    }
}

pub trait TransitionInvoker {
    /// Move `surface` to `scene`. After an [`Scene::Inflate`] the freshly
    /// inflated region must be the surface's first child.
    fn go(
        &self,
        surface: &dyn RenderingSurface,
        inflater: &dyn LayoutInflater,
        scene: &Scene,
        transition: &Transition,
    ) -> Result<()>;
}

/// Swaps regions without animating.
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantTransition;

impl TransitionInvoker for InstantTransition {
    fn go(
        &self,
        surface: &dyn RenderingSurface,
        inflater: &dyn LayoutInflater,
        scene: &Scene,
        _transition: &Transition,
    ) -> Result<()> {
        let anchor = match scene {
            Scene::Inflate(layout) => inflater.inflate(layout)?,
            Scene::Existing(anchor) => *anchor,
        };
        surface.clear();
        surface.attach(anchor)
    }
}
