use crate::error::{NavigationError, Result};
use crate::lifecycle::ScreenLifecycleEvent;
use crate::logging::{LogLevel, json_kv};
use crate::metrics::NavigatorMetrics;
use crate::screen::{BackPressResult, ScreenRef};
use crate::stack::NavigationEntry;
use crate::transition::TransitionDirection;

use super::Navigator;
use super::audit::{NavigatorAuditEventBuilder, NavigatorAuditStage};

impl<D: 'static> Navigator<D> {
    /// Offer a back press to the top screen.
    ///
    /// Returns `Ok(false)` when the press should fall through to the host's
    /// default behaviour: the top screen wants to go back but it is the only
    /// entry left.
    pub fn handle_back_press(&self) -> Result<bool> {
        let top = self.top_screen().ok_or(NavigationError::EmptyStack)?;
        let result = top.on_back_pressed();
        let handled = match result {
            BackPressResult::Stay => true,
            BackPressResult::NavigateBack if self.depth() > 1 => {
                self.finish(&top)?;
                true
            }
            BackPressResult::NavigateBack => false,
        };

        self.record_metric(|metrics| metrics.record_back_press(handled));
        self.log(
            LogLevel::Debug,
            "back_press",
            [
                json_kv("screen", top.name()),
                json_kv("result", format!("{result:?}")),
                json_kv("handled", handled),
            ],
        );
        self.audit(
            NavigatorAuditEventBuilder::new(NavigatorAuditStage::BackPressHandled)
                .detail("screen", top.name())
                .detail("handled", handled)
                .finish(),
        );
        Ok(handled)
    }

    /// Remove `screen` from wherever it sits in the stack and destroy it.
    ///
    /// Finishing the visible top pauses it first and brings the entry beneath
    /// back. A finish issued from the screen's own `on_pause` skips both: the
    /// pause already happened and whoever paused it settles the new top.
    /// Finishing an entry that awaits restart runs no hooks, but a visible host
    /// still gets the entry beneath brought back. Unknown screens are logged
    /// and ignored.
    pub fn finish(&self, screen: &ScreenRef<D>) -> Result<()> {
        let removed = self.inner.core.borrow_mut().stack.remove_screen(screen);
        let Some((removed, was_top)) = removed else {
            self.record_metric(|metrics| metrics.record_finish(true));
            self.log(
                LogLevel::Warn,
                "stale_finish_ignored",
                [json_kv("screen", screen.name())],
            );
            self.audit(
                NavigatorAuditEventBuilder::new(NavigatorAuditStage::StaleFinishIgnored)
                    .detail("screen", screen.name())
                    .finish(),
            );
            return Ok(());
        };

        let removed_screen = removed.screen().clone();
        let latest = removed_screen.latest_lifecycle_event();
        let settle_top = was_top && latest != ScreenLifecycleEvent::Pause;

        self.record_metric(|metrics| metrics.record_finish(false));
        self.log(
            LogLevel::Debug,
            "screen_finished",
            [
                json_kv("screen", removed_screen.name()),
                json_kv("was_top", was_top),
                json_kv("needs_restart", removed.needs_restart()),
                json_kv("latest", format!("{latest:?}")),
            ],
        );
        self.audit(
            NavigatorAuditEventBuilder::new(NavigatorAuditStage::ScreenFinished)
                .detail("screen", removed_screen.name())
                .detail("was_top", was_top)
                .finish(),
        );

        if removed.needs_restart() {
            // Already destroyed (or never created); only the top is owed a repair.
            if settle_top && self.is_rendering() {
                self.repair_top(&removed)?;
            }
            return Ok(());
        }

        if settle_top {
            removed_screen.pause()?;
        }
        removed_screen.destroy()?;

        if settle_top && self.is_attached() {
            self.repair_top(&removed)?;
        }
        Ok(())
    }

    /// Bring the entry beneath a finished top back to the foreground.
    fn repair_top(&self, removed: &NavigationEntry<D>) -> Result<()> {
        let Some(new_top) = self.top_entry() else {
            return Ok(());
        };

        if new_top.needs_restart() {
            self.inner.core.borrow_mut().stack.pop();
            let restarted = new_top.restart();
            self.inner
                .core
                .borrow_mut()
                .stack
                .push(restarted.clone());
            self.record_metric(NavigatorMetrics::record_restart);
            self.log(
                LogLevel::Debug,
                "top_restarted",
                [json_kv("screen", restarted.screen().name())],
            );
            self.transition_between(&restarted, Some(removed), TransitionDirection::Backward)?;
            return self.start_screen(restarted.screen(), true);
        }

        self.transition_between(&new_top, Some(removed), TransitionDirection::Backward)?;
        // A destroy hook may already have navigated somewhere and resumed the top.
        let screen = new_top.screen();
        if screen.latest_lifecycle_event() != ScreenLifecycleEvent::Resume {
            screen.resume()?;
        }
        Ok(())
    }
}
