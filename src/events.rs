//! Event types and the event bus for the facility finder.
//!
//! This module defines the [`Event`] enum (keyboard input, ticks, and the
//! completions of the two background acquisitions) and the [`EventHandler`],
//! which owns the receiving end of the bus. Terminal input is read on a
//! dedicated thread so the single-threaded runtime never blocks on it.

use crate::error::{FetchError, LocationError};
use crate::models::Coordinates;
use crate::mount::MountId;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::error;

/// Events processed by the application event loop.
#[derive(Debug)]
pub enum Event {
    /// Periodic tick used for UI refresh.
    Tick,
    /// User key press from the terminal.
    Input(KeyEvent),
    /// The location acquisition started by `mount` finished.
    Location {
        mount: MountId,
        outcome: Result<Coordinates, LocationError>,
    },
    /// The facility fetch started by `mount` finished; records are still raw.
    Facilities {
        mount: MountId,
        outcome: Result<Vec<Value>, FetchError>,
    },
}

/// Multiplexes terminal input, ticks and acquisition results into one stream.
///
/// The sender ([`tx`](EventHandler::tx)) is cloned into the background
/// acquisitions; the receiver is drained by [`next`](EventHandler::next) in
/// the main loop.
pub struct EventHandler {
    /// Sender for posting events (e.g. from the acquisitions).
    pub tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler {
    /// Creates a bus with no input source attached.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Spawns the terminal input thread.
    ///
    /// The thread polls crossterm with a timeout of `tick_rate_ms`; key
    /// presses become [`Event::Input`] and each elapsed interval an
    /// [`Event::Tick`]. It exits once the receiver is dropped or the
    /// terminal stops answering.
    pub fn spawn_input(&self, tick_rate_ms: u64) {
        let event_tx = self.tx.clone();
        std::thread::spawn(move || {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::from_secs(0));
                match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            if event_tx.send(Event::Input(key)).is_err() {
                                return;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("Terminal read failed: {}", e);
                            return;
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        error!("Terminal poll failed: {}", e);
                        return;
                    }
                }
                if last_tick.elapsed() >= tick_rate {
                    if event_tx.send(Event::Tick).is_err() {
                        return;
                    }
                    last_tick = Instant::now();
                }
            }
        });
    }

    /// Receives the next event; `None` once every sender is gone.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
