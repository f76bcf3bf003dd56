//! Own the terminal for the life of the session.

use std::io::{self, Stdout, Write};

use crossbeam_channel::{Receiver, Sender};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event as TermEvent};
use crossterm::style::Print;
use crossterm::terminal::{
    Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};
use crossterm::{execute, queue};

use super::render::frame;
use crate::app::{Dispatcher, Event, Model};

/// Raw mode and the alternate screen, restored on drop.
struct TerminalGuard {
    stdout: Stdout,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        Ok(Self { stdout })
    }

    fn draw(&mut self, lines: &[String]) -> io::Result<()> {
        for (row, line) in (0u16..).zip(lines) {
            queue!(
                self.stdout,
                MoveTo(0, row),
                Print(line),
                Clear(ClearType::UntilNewLine)
            )?;
        }
        queue!(self.stdout, Clear(ClearType::FromCursorDown))?;
        self.stdout.flush()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(self.stdout, Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Forward key presses and resizes into the event channel until it closes.
fn spawn_input_reader(tx: Sender<Event>) {
    std::thread::spawn(move || {
        loop {
            let event = match event::read() {
                Ok(TermEvent::Key(key)) => Event::Input(key),
                Ok(TermEvent::Resize(columns, rows)) => Event::Resize(columns, rows),
                Ok(_) => continue,
                Err(e) => {
                    log::warn!("Terminal input failed: {e}");
                    break;
                }
            };
            if tx.send(event).is_err() {
                break;
            }
        }
    });
}

/// Run the session until the model asks to quit.
///
/// Returns text to print once the terminal has been restored.
pub fn run(
    mut model: Model,
    dispatcher: &Dispatcher,
    tx: Sender<Event>,
    rx: Receiver<Event>,
) -> anyhow::Result<Option<String>> {
    let mut terminal = TerminalGuard::enter()?;
    if let Ok(size) = crossterm::terminal::size() {
        model.viewport = size;
    }
    spawn_input_reader(tx);
    dispatcher.dispatch_all(model.init());

    loop {
        terminal.draw(&frame(&model))?;

        let Ok(event) = rx.recv() else {
            break;
        };
        // Apply everything already queued before drawing again.
        let mut pending = vec![event];
        pending.extend(rx.try_iter());
        for event in pending {
            let (next, commands) = model.update(event);
            model = next;
            dispatcher.dispatch_all(commands);
            if model.should_quit {
                break;
            }
        }
        if model.should_quit {
            break;
        }
    }

    drop(terminal);
    log::debug!("Session ended");
    Ok(model.exit_output)
}
