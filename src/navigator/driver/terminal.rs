use std::io::{self, Write};
use std::rc::Rc;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{
    self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};

use crate::error::{NavigationError, Result};
use crate::host::MemoryHost;
use crate::lifecycle::HostLifecycleEvent;
use crate::navigator::Navigator;

/// Callback for keys the driver does not interpret itself.
pub type KeyHandler<D> = Box<dyn FnMut(&Navigator<D>, &KeyEvent) -> Result<()>>;

/// What a terminal event means to the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverInput {
    Lifecycle(HostLifecycleEvent),
    Back,
    Exit,
    Key(KeyEvent),
    Ignore,
}

/// Terminal focus changes stand in for the host pausing and resuming.
pub fn host_event_for(event: &Event) -> Option<HostLifecycleEvent> {
    match event {
        Event::FocusGained => Some(HostLifecycleEvent::Resume),
        Event::FocusLost => Some(HostLifecycleEvent::Pause),
        _ => None,
    }
}

pub fn classify(event: &Event) -> DriverInput {
    if let Some(lifecycle) = host_event_for(event) {
        return DriverInput::Lifecycle(lifecycle);
    }
    let Event::Key(key) = event else {
        return DriverInput::Ignore;
    };
    if key.kind != KeyEventKind::Press {
        return DriverInput::Ignore;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => DriverInput::Exit,
        KeyCode::Esc | KeyCode::Backspace => DriverInput::Back,
        _ => DriverInput::Key(*key),
    }
}

/// Runs a [`Navigator`] against a [`MemoryHost`] inside a raw-mode alternate
/// screen, drawing the stack after every input. A back press the navigator
/// declines ends the session, as does Ctrl-C.
pub struct TerminalDriver<D> {
    navigator: Navigator<D>,
    host: Rc<MemoryHost<D>>,
    on_key: Option<KeyHandler<D>>,
}

impl<D: 'static> TerminalDriver<D> {
    pub fn new(navigator: Navigator<D>, host: Rc<MemoryHost<D>>) -> Self {
        Self {
            navigator,
            host,
            on_key: None,
        }
    }

    pub fn with_key_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&Navigator<D>, &KeyEvent) -> Result<()> + 'static,
    {
        self.on_key = Some(Box::new(handler));
        self
    }

    pub fn run(mut self) -> Result<()> {
        let mut stdout = io::stdout();
        self.enter(&mut stdout)?;
        let result = self.run_inner(&mut stdout);
        self.exit(&mut stdout);
        result
    }

    fn run_inner(&mut self, stdout: &mut impl Write) -> Result<()> {
        self.host.emit(HostLifecycleEvent::Start)?;
        self.navigator.attach(self.host.clone())?;
        self.host.emit(HostLifecycleEvent::Resume)?;
        self.draw(stdout)?;

        loop {
            let event = event::read()?;
            match classify(&event) {
                DriverInput::Lifecycle(lifecycle) => self.host.emit(lifecycle)?,
                DriverInput::Back => {
                    if !self.navigator.handle_back_press()? {
                        break;
                    }
                }
                DriverInput::Exit => break,
                DriverInput::Key(key) => {
                    if let Some(handler) = self.on_key.as_mut() {
                        handler(&self.navigator, &key)?;
                    }
                }
                DriverInput::Ignore => {}
            }
            self.draw(stdout)?;
        }

        self.host.emit(HostLifecycleEvent::Pause)?;
        self.host.emit(HostLifecycleEvent::Stop)?;
        self.navigator.detach()?;
        self.host.emit(HostLifecycleEvent::Destroy)
    }

    fn draw(&self, stdout: &mut impl Write) -> Result<()> {
        let snapshot = self.navigator.snapshot();
        let showing = self
            .host
            .canvas()
            .current_layout()
            .map(|layout| layout.to_string())
            .unwrap_or_else(|| "<nothing>".to_string());

        execute!(
            stdout,
            Clear(ClearType::All),
            MoveTo(0, 0),
            Print(format!(
                "showing: {showing} | host: {:?} | depth: {}",
                snapshot.host_phase,
                snapshot.entries.len()
            ))
        )?;
        for (row, entry) in snapshot.entries.iter().enumerate() {
            let marker = if entry.needs_restart { "*" } else { " " };
            execute!(
                stdout,
                MoveTo(2, row as u16 + 2),
                Print(format!("{marker} {} ({:?})", entry.screen, entry.lifecycle))
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn enter(&self, stdout: &mut impl Write) -> Result<()> {
        terminal::enable_raw_mode().map_err(|err| NavigationError::Host(err.to_string()))?;
        execute!(
            stdout,
            EnterAlternateScreen,
            EnableFocusChange,
            Hide,
            Clear(ClearType::All)
        )?;
        Ok(())
    }

    fn exit(&self, stdout: &mut impl Write) {
        execute!(stdout, Show, DisableFocusChange, LeaveAlternateScreen).ok();
        terminal::disable_raw_mode().ok();
    }
}
