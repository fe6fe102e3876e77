use crate::api::FacilitySource;
use crate::events::Event;
use crate::location::LocationProvider;
use crate::map::MapController;
use crate::report::{ReportOption, ReportOutbox};
use crate::state::MapState;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub enum Screen {
    #[default]
    Home,
    Map,
}

/// Everything the map screen needs while it is mounted.
pub struct MapScreen<L, D> {
    pub controller: MapController<L, D>,
    /// Snapshots published by the controller.
    pub view: watch::Receiver<MapState>,
    /// Highlighted row in the facility list.
    pub cursor: usize,
}

pub struct App<L, D> {
    pub screen: Screen,
    pub map: Option<MapScreen<L, D>>,
    pub tick_count: usize,
    pub should_quit: bool,
    pub reports_sent: usize,

    location: Arc<L>,
    source: Arc<D>,
    events: mpsc::UnboundedSender<Event>,
    outbox: ReportOutbox,
}

impl<L: LocationProvider, D: FacilitySource> App<L, D> {
    pub fn new(
        location: L,
        source: D,
        events: mpsc::UnboundedSender<Event>,
        outbox: ReportOutbox,
    ) -> Self {
        Self {
            screen: Screen::Home,
            map: None,
            tick_count: 0,
            should_quit: false,
            reports_sent: 0,
            location: Arc::new(location),
            source: Arc::new(source),
            events,
            outbox,
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Tick => self.on_tick(),
            Event::Input(key) => self.handle_key(key),
            other => {
                if let Some(map) = self.map.as_mut() {
                    map.controller.handle_event(other);
                    clamp_cursor(map);
                }
            }
        }
    }

    pub fn on_tick(&mut self) {
        self.tick_count += 1;
    }

    /// Mounts a fresh map controller and starts its acquisitions.
    pub fn open_map(&mut self) {
        let mut controller = MapController::new(
            Arc::clone(&self.location),
            Arc::clone(&self.source),
            self.events.clone(),
            self.outbox.clone(),
        );
        let view = controller.subscribe();
        controller.initialize();
        self.map = Some(MapScreen {
            controller,
            view,
            cursor: 0,
        });
        self.screen = Screen::Map;
    }

    /// Leaves the map; whatever it was waiting for is dropped on arrival.
    pub fn close_map(&mut self) {
        if let Some(mut map) = self.map.take() {
            map.controller.teardown();
        }
        self.screen = Screen::Home;
        info!("Back to home screen");
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Home => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::Enter | KeyCode::Char(' ') => self.open_map(),
                _ => {}
            },
            Screen::Map => self.handle_map_key(key),
        }
    }

    fn handle_map_key(&mut self, key: KeyEvent) {
        let Some(map) = self.map.as_mut() else {
            self.screen = Screen::Home;
            return;
        };

        if map.controller.state().report_flow_open() {
            let chosen = map
                .controller
                .state()
                .report
                .as_ref()
                .and_then(|r| r.chosen());
            match key.code {
                KeyCode::Esc => map.controller.close_report_flow(),
                KeyCode::Enter => {
                    if map.controller.submit_report().is_ok() {
                        self.reports_sent += 1;
                    }
                }
                KeyCode::Char(c @ '1'..='4') => {
                    let index = c as usize - '1' as usize;
                    map.controller.choose_report_option(ReportOption::ALL[index]);
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    let next = chosen.map(|o| (o.index() + 1) % ReportOption::ALL.len());
                    map.controller
                        .choose_report_option(ReportOption::ALL[next.unwrap_or(0)]);
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    let len = ReportOption::ALL.len();
                    let prev = chosen.map(|o| (o.index() + len - 1) % len);
                    map.controller
                        .choose_report_option(ReportOption::ALL[prev.unwrap_or(len - 1)]);
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => {
                let len = map.controller.state().facilities.len();
                if len > 0 {
                    map.cursor = (map.cursor + 1) % len;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let len = map.controller.state().facilities.len();
                if len > 0 {
                    map.cursor = map.cursor.checked_sub(1).unwrap_or(len - 1);
                }
            }
            KeyCode::Enter => {
                let id = map
                    .controller
                    .state()
                    .facilities
                    .get(map.cursor)
                    .map(|f| f.id.clone());
                if let Some(id) = id {
                    map.controller.select_facility_by_id(&id);
                }
            }
            KeyCode::Char('s') => map.controller.open_report_flow(),
            KeyCode::Char('r') => map.controller.refresh_facilities(),
            KeyCode::Char('x') => map.controller.dismiss_notice(),
            KeyCode::Esc | KeyCode::Char('h') => {
                if map.controller.state().selection.is_some() {
                    map.controller.dismiss_selection();
                } else {
                    self.close_map();
                }
            }
            _ => {}
        }
    }
}

fn clamp_cursor<L, D>(map: &mut MapScreen<L, D>) {
    let len = map.view.borrow().facilities.len();
    if map.cursor >= len {
        map.cursor = len.saturating_sub(1);
    }
}
