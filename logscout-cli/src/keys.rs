use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use logscout::ScanControl;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    TogglePause,
    Cancel,
    Ignore,
}

fn key_action(key: &KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Cancel,
        KeyCode::Char('p') | KeyCode::Char(' ') => KeyAction::TogglePause,
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Cancel,
        _ => KeyAction::Ignore,
    }
}

/// Reads single key presses in raw mode and steers the scan.
///
/// `p` or space toggles pause, `q`, Esc or Ctrl-C cancel. Raw mode is left
/// again when the listener is dropped.
pub struct KeyListener {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl KeyListener {
    pub fn spawn(control: ScanControl) -> io::Result<Self> {
        enable_raw_mode()?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let spawned = thread::Builder::new()
            .name("logscout-keys".to_string())
            .spawn(move || {
                if let Err(e) = listen(&control, &thread_stop) {
                    debug!("key listener stopped: {}", e);
                }
            });

        match spawned {
            Ok(handle) => Ok(Self {
                stop,
                handle: Some(handle),
            }),
            Err(e) => {
                let _ = disable_raw_mode();
                Err(e)
            }
        }
    }
}

fn listen(control: &ScanControl, stop: &AtomicBool) -> io::Result<()> {
    while !stop.load(Ordering::Relaxed) {
        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let TermEvent::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key_action(&key) {
            KeyAction::TogglePause => control.set_paused(!control.is_paused()),
            KeyAction::Cancel => {
                control.cancel();
                break;
            }
            KeyAction::Ignore => {}
        }
    }
    Ok(())
}

impl Drop for KeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        let _ = disable_raw_mode();
    }
}
