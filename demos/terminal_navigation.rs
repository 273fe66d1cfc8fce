//! Terminal Navigation - a screen stack driven from the keyboard
//!
//! Keys:
//! - `n` opens a new detail screen
//! - `s` brings the settings screen to the front (single instance)
//! - `h` clears the stack back to a fresh home screen
//! - Esc/Backspace goes back, Ctrl-C quits
//! - Focus loss pauses the top screen, focus gain resumes it
//!
//! Set `HEADLESS=1` (or run under CI) to play a scripted session instead and
//! print the resulting stack as JSON. `SCREEN_STACK_LOG=<path>` writes the
//! navigator's JSON-line log.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use crossterm::event::KeyCode;
use screen_stack::logging::FileSink;
use screen_stack::{
    BufferedNavigatorAudit, HostLifecycleEvent, InstantTransition, LayoutDescriptor, Logger,
    MemoryHost, NavigationEntry, Navigator, NavigatorConfig, Result, Screen, ScreenContext,
    ScreenState, TerminalDriver, TransitionStyle,
};

struct AppDeps {
    title: &'static str,
    opened: Cell<u32>,
}

struct PageScreen {
    name: String,
    key: Option<String>,
    state: ScreenState,
}

impl PageScreen {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: None,
            state: ScreenState::new(),
        }
    }

    fn single(name: &str) -> Self {
        Self {
            key: Some(name.to_string()),
            ..Self::new(name)
        }
    }
}

impl Screen<AppDeps> for PageScreen {
    fn name(&self) -> &str {
        &self.name
    }

    fn layout(&self) -> LayoutDescriptor {
        LayoutDescriptor::new(format!("layout:{}", self.name))
    }

    fn state(&self) -> &ScreenState {
        &self.state
    }

    fn identity_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn duplicate(&self) -> Rc<dyn Screen<AppDeps>> {
        Rc::new(Self {
            name: self.name.clone(),
            key: self.key.clone(),
            state: ScreenState::new(),
        })
    }

    fn on_create(&self, ctx: &ScreenContext<AppDeps>) -> Result<()> {
        let deps = ctx.deps();
        deps.opened.set(deps.opened.get() + 1);
        Ok(())
    }
}

fn home() -> NavigationEntry<AppDeps> {
    NavigationEntry::of(PageScreen::new("home"))
}

fn detail(n: u32) -> NavigationEntry<AppDeps> {
    NavigationEntry::of(PageScreen::new(format!("detail-{n}")))
        .with_transition(TransitionStyle::Slide)
}

fn settings() -> NavigationEntry<AppDeps> {
    NavigationEntry::of(PageScreen::single("settings"))
        .single_instance(true)
        .with_transition(TransitionStyle::Fade)
}

fn build_navigator() -> std::result::Result<Navigator<AppDeps>, Box<dyn std::error::Error>> {
    let mut config =
        NavigatorConfig::default().with_audit(Arc::new(BufferedNavigatorAudit::new()));
    config.enable_metrics();
    if let Ok(path) = std::env::var("SCREEN_STACK_LOG") {
        config = config.with_logger(Logger::new(FileSink::new(path, 1 << 20)?));
    }
    let deps = AppDeps {
        title: "terminal navigation",
        opened: Cell::new(0),
    };
    Ok(Navigator::with_config(deps, InstantTransition, config))
}

fn run_headless(
    navigator: Navigator<AppDeps>,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let host = Rc::new(MemoryHost::new(home));
    navigator.attach(host.clone())?;
    host.emit(HostLifecycleEvent::Start)?;
    host.emit(HostLifecycleEvent::Resume)?;

    navigator.navigate(detail(1))?;
    navigator.navigate(settings())?;
    navigator.navigate(detail(2))?;

    // Window goes away while settings is buried; it comes back restarted.
    host.emit(HostLifecycleEvent::Pause)?;
    host.emit(HostLifecycleEvent::Stop)?;
    navigator.detach()?;
    let host = Rc::new(MemoryHost::new(home));
    navigator.attach(host.clone())?;
    host.emit(HostLifecycleEvent::Start)?;
    host.emit(HostLifecycleEvent::Resume)?;

    navigator.navigate(settings())?;
    navigator.handle_back_press()?;

    let snapshot = navigator.snapshot();
    println!("{}", snapshot.to_json()?);
    if let Some(metrics) = navigator.metrics_snapshot() {
        println!("{}", serde_json::to_string(&metrics)?);
    }
    println!(
        "{}: {} screens created",
        navigator.deps().title,
        navigator.deps().opened.get()
    );
    Ok(())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let navigator = build_navigator()?;

    let is_headless = std::env::var("CI").is_ok() || std::env::var("HEADLESS").is_ok();
    if is_headless {
        run_headless(navigator)?;
        return Ok(());
    }

    let host = Rc::new(MemoryHost::new(home));
    let next_detail = Cell::new(0u32);
    TerminalDriver::new(navigator, host)
        .with_key_handler(move |navigator, key| match key.code {
            KeyCode::Char('n') => {
                next_detail.set(next_detail.get() + 1);
                navigator.navigate(detail(next_detail.get()))
            }
            KeyCode::Char('s') => navigator.navigate(settings()),
            KeyCode::Char('h') => navigator.navigate(home().clear_stack(true)),
            _ => Ok(()),
        })
        .run()?;
    Ok(())
}
