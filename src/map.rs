//! The facility map controller.
//!
//! Owns the region, the normalized facilities, the selection and the report
//! modal. On [`initialize`](MapController::initialize) it starts the location
//! and facility acquisitions as independent tasks; their results come back
//! through the event bus tagged with this mount's id and are applied only
//! while the mount is alive.

use crate::api::FacilitySource;
use crate::error::{FetchError, LocationError, ReportError};
use crate::events::Event;
use crate::location::{self, LocationProvider};
use crate::models::{Coordinates, Facility, FacilityId};
use crate::mount::{MountId, MountToken};
use crate::normalize::normalize_batch;
use crate::report::{ReportOption, ReportOutbox, Submission};
use crate::state::{MapState, Notice};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub struct MapController<L, D> {
    mount: MountToken,
    state: MapState,
    publisher: watch::Sender<MapState>,
    location: Arc<L>,
    source: Arc<D>,
    events: mpsc::UnboundedSender<Event>,
    outbox: ReportOutbox,
    initialized: bool,
}

impl<L: LocationProvider, D: FacilitySource> MapController<L, D> {
    pub fn new(
        location: Arc<L>,
        source: Arc<D>,
        events: mpsc::UnboundedSender<Event>,
        outbox: ReportOutbox,
    ) -> Self {
        let state = MapState::default();
        let (publisher, _) = watch::channel(state.clone());
        Self {
            mount: MountToken::new(),
            state,
            publisher,
            location,
            source,
            events,
            outbox,
            initialized: false,
        }
    }

    /// Snapshot stream for the presentation layer.
    pub fn subscribe(&self) -> watch::Receiver<MapState> {
        self.publisher.subscribe()
    }

    pub fn state(&self) -> &MapState {
        &self.state
    }

    pub fn mount_id(&self) -> MountId {
        self.mount.id()
    }

    /// Starts both acquisitions. Runs at most once per mount.
    pub fn initialize(&mut self) {
        if self.initialized || !self.mount.is_alive() {
            return;
        }
        self.initialized = true;
        info!("Map mounted ({:?}), starting acquisitions", self.mount.id());
        self.transition(|s| s.locating().fetching());
        self.spawn_location();
        self.spawn_fetch();
    }

    /// User-requested re-fetch of the dataset.
    pub fn refresh_facilities(&mut self) {
        if !self.mount.is_alive() || self.state.pending.facilities {
            return;
        }
        self.transition(MapState::fetching);
        self.spawn_fetch();
    }

    fn spawn_location(&self) {
        let token = self.mount.clone();
        let tx = self.events.clone();
        let provider = Arc::clone(&self.location);
        tokio::spawn(async move {
            let outcome = location::acquire(provider.as_ref()).await;
            if token.is_alive() {
                let _ = tx.send(Event::Location {
                    mount: token.id(),
                    outcome,
                });
            } else {
                debug!("Location resolved after teardown, dropping it");
            }
        });
    }

    fn spawn_fetch(&self) {
        let token = self.mount.clone();
        let tx = self.events.clone();
        let source = Arc::clone(&self.source);
        tokio::spawn(async move {
            let outcome = source.fetch_all().await;
            if token.is_alive() {
                let _ = tx.send(Event::Facilities {
                    mount: token.id(),
                    outcome,
                });
            } else {
                debug!("Facilities resolved after teardown, dropping them");
            }
        });
    }

    /// Routes an acquisition result to its handler.
    ///
    /// Results from another mount are ignored; input and ticks are not the
    /// controller's business.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Location { mount, outcome } if mount == self.mount.id() => match outcome {
                Ok(coords) => self.on_location_resolved(coords),
                Err(reason) => self.on_location_failed(reason),
            },
            Event::Facilities { mount, outcome } if mount == self.mount.id() => match outcome {
                Ok(records) => self.on_facilities_resolved(records),
                Err(reason) => self.on_facilities_failed(reason),
            },
            Event::Location { .. } | Event::Facilities { .. } => {
                debug!("Ignoring acquisition result from a previous mount");
            }
            Event::Tick | Event::Input(_) => {}
        }
    }

    pub fn on_location_resolved(&mut self, coords: Coordinates) {
        if !self.is_live("location") {
            return;
        }
        info!("Centering map on ({}, {})", coords.latitude, coords.longitude);
        self.transition(|s| s.located(coords));
    }

    pub fn on_location_failed(&mut self, reason: LocationError) {
        if !self.is_live("location") {
            return;
        }
        warn!("Location unavailable: {}", reason);
        let notice = match reason {
            LocationError::PermissionDenied => Notice::LocationRefused,
            LocationError::PositionUnavailable(why) => Notice::LocationUnavailable(why),
        };
        self.transition(|s| s.location_failed(notice));
    }

    pub fn on_facilities_resolved(&mut self, records: Vec<Value>) {
        if !self.is_live("facilities") {
            return;
        }
        let normalized = normalize_batch(&records);
        info!(
            "Loaded {} facilities ({} records dropped)",
            normalized.facilities.len(),
            normalized.rejected.len()
        );
        self.transition(|s| s.with_facilities(normalized.facilities));
    }

    pub fn on_facilities_failed(&mut self, reason: FetchError) {
        if !self.is_live("facilities") {
            return;
        }
        warn!("Facility fetch failed: {}", reason);
        let notice = Notice::FacilitiesUnavailable(reason.to_string());
        self.transition(|s| s.facilities_failed(notice));
    }

    pub fn select_facility(&mut self, facility: Facility) {
        self.transition(|s| s.selecting(facility));
    }

    /// Selects the facility with `id` from the current list. Returns false
    /// (and changes nothing) when no such facility is loaded.
    pub fn select_facility_by_id(&mut self, id: &FacilityId) -> bool {
        match self.state.facility(id).cloned() {
            Some(facility) => {
                self.select_facility(facility);
                true
            }
            None => false,
        }
    }

    pub fn dismiss_selection(&mut self) {
        self.transition(MapState::dismissed);
    }

    /// Opens the report modal; does nothing without a selection.
    pub fn open_report_flow(&mut self) {
        self.transition(MapState::report_opened);
    }

    pub fn close_report_flow(&mut self) {
        self.transition(MapState::report_closed);
    }

    pub fn choose_report_option(&mut self, option: ReportOption) {
        let Some(mut flow) = self.state.report.clone() else {
            return;
        };
        flow.choose(option);
        self.transition(|s| s.with_report(flow));
    }

    /// Submits the open report for the selected facility.
    ///
    /// On success the modal closes. A missing choice leaves the flow as it
    /// was and raises a notice.
    pub fn submit_report(&mut self) -> Result<Submission, ReportError> {
        let (Some(facility), Some(mut flow)) =
            (self.state.selection.clone(), self.state.report.clone())
        else {
            return Err(ReportError::NotOpen);
        };

        match flow.submit(&facility.id, &self.outbox) {
            Ok(submission) => {
                let option = submission.option;
                self.transition(|s| s.report_closed().notify(Notice::ReportSent(option)));
                Ok(submission)
            }
            Err(ReportError::NothingChosen) => {
                self.transition(|s| s.notify(Notice::ReportNeedsOption));
                Err(ReportError::NothingChosen)
            }
            Err(e) => {
                self.transition(|s| s.with_report(flow).notify(Notice::ReportNotDelivered));
                Err(e)
            }
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.transition(MapState::notice_dismissed);
    }

    /// Detaches the controller; in-flight acquisitions become no-ops.
    pub fn teardown(&mut self) {
        if self.mount.is_alive() {
            info!("Map unmounted ({:?})", self.mount.id());
            self.mount.revoke();
        }
    }

    fn is_live(&self, what: &str) -> bool {
        let alive = self.mount.is_alive();
        if !alive {
            debug!("Dropping {} result for torn-down map", what);
        }
        alive
    }

    fn transition(&mut self, f: impl FnOnce(MapState) -> MapState) {
        let next = f(self.state.clone());
        if next != self.state {
            self.state = next.clone();
            self.publisher.send_replace(next);
        }
    }
}

impl<L, D> Drop for MapController<L, D> {
    fn drop(&mut self) {
        self.mount.revoke();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TriState;
    use crate::report::ReportStage;
    use serde_json::json;
    use std::future::pending;

    struct Idle;

    impl LocationProvider for Idle {
        async fn request_permission(&self) -> location::Permission {
            pending().await
        }

        async fn current_position(&self) -> Result<Coordinates, LocationError> {
            pending().await
        }
    }

    impl FacilitySource for Idle {
        async fn fetch_all(&self) -> Result<Vec<Value>, FetchError> {
            pending().await
        }
    }

    fn controller() -> (MapController<Idle, Idle>, mpsc::UnboundedReceiver<Submission>) {
        let (events, _) = mpsc::unbounded_channel();
        let (outbox, reports) = mpsc::unbounded_channel();
        (
            MapController::new(Arc::new(Idle), Arc::new(Idle), events, outbox),
            reports,
        )
    }

    fn facility(i: usize) -> Facility {
        Facility {
            id: FacilityId::Position(i),
            location: Coordinates::new(48.85 + i as f64 * 0.001, 2.35),
            name: None,
            address: Some(format!("{} RUE TEST", i)),
            schedule: None,
            has_accessibility: TriState::Unknown,
            has_baby_changing: TriState::Unknown,
            district: None,
        }
    }

    #[test]
    fn starts_on_default_region_with_nothing_loaded() {
        let (map, _) = controller();
        let state = map.state();
        assert_eq!(state.region, crate::models::Region::default());
        assert!(state.facilities.is_empty());
        assert!(state.selection.is_none());
        assert!(!state.report_flow_open());
    }

    #[test]
    fn selection_survives_refresh_without_it() {
        let (mut map, _) = controller();
        let kept = facility(9);
        map.select_facility(kept.clone());
        map.on_facilities_resolved(vec![json!({"geo_point_2d": [48.1, 2.1]})]);
        assert_eq!(map.state().facilities.len(), 1);
        assert_eq!(map.state().selection, Some(kept));
    }

    #[test]
    fn open_report_without_selection_is_a_no_op() {
        let (mut map, _) = controller();
        map.open_report_flow();
        map.open_report_flow();
        assert!(!map.state().report_flow_open());
    }

    #[test]
    fn dismiss_always_clears_selection_and_report() {
        let (mut map, _) = controller();
        map.dismiss_selection();
        assert!(map.state().selection.is_none());

        map.select_facility(facility(1));
        map.open_report_flow();
        map.choose_report_option(ReportOption::Dirty);
        map.dismiss_selection();
        assert!(map.state().selection.is_none());
        assert!(!map.state().report_flow_open());

        // Reopening starts from a fresh draft.
        map.select_facility(facility(1));
        map.open_report_flow();
        assert_eq!(map.state().report.as_ref().map(|r| r.stage()), Some(ReportStage::Idle));
    }

    #[test]
    fn switching_facility_discards_open_report() {
        let (mut map, mut reports) = controller();
        map.select_facility(facility(1));
        map.open_report_flow();
        map.choose_report_option(ReportOption::Dirty);

        map.select_facility(facility(2));
        assert_eq!(map.state().selection, Some(facility(2)));
        assert!(!map.state().report_flow_open());
        assert_eq!(map.submit_report(), Err(ReportError::NotOpen));
        assert!(reports.try_recv().is_err());
    }

    #[test]
    fn close_report_discards_draft() {
        let (mut map, mut reports) = controller();
        map.select_facility(facility(2));
        map.open_report_flow();
        map.choose_report_option(ReportOption::Broken);
        map.close_report_flow();
        assert!(!map.state().report_flow_open());
        assert_eq!(map.state().selection, Some(facility(2)));
        assert_eq!(map.submit_report(), Err(ReportError::NotOpen));
        assert!(reports.try_recv().is_err());
    }

    #[test]
    fn submit_without_choice_raises_notice_and_keeps_modal() {
        let (mut map, _) = controller();
        map.select_facility(facility(0));
        map.open_report_flow();
        assert_eq!(map.submit_report(), Err(ReportError::NothingChosen));
        assert!(map.state().report_flow_open());
        assert_eq!(map.state().notices, vec![Notice::ReportNeedsOption]);
    }

    #[test]
    fn submit_delivers_and_closes_modal() {
        let (mut map, mut reports) = controller();
        map.select_facility(facility(3));
        map.open_report_flow();
        map.choose_report_option(ReportOption::Closed);

        let sent = map.submit_report().unwrap();
        assert_eq!(sent.facility_id, FacilityId::Position(3));
        assert_eq!(reports.try_recv().unwrap(), sent);
        assert!(!map.state().report_flow_open());
        assert_eq!(map.state().selection, Some(facility(3)));
        assert_eq!(map.state().notices, vec![Notice::ReportSent(ReportOption::Closed)]);
    }

    #[test]
    fn undeliverable_report_keeps_choice() {
        let (mut map, reports) = controller();
        drop(reports);
        map.select_facility(facility(3));
        map.open_report_flow();
        map.choose_report_option(ReportOption::OutOfOrder);

        assert_eq!(map.submit_report(), Err(ReportError::Undeliverable));
        let flow = map.state().report.clone().unwrap();
        assert_eq!(flow.chosen(), Some(ReportOption::OutOfOrder));
    }

    #[test]
    fn location_failures_keep_region_and_notify() {
        let (mut map, _) = controller();
        map.on_location_failed(LocationError::PermissionDenied);
        map.on_location_failed(LocationError::PositionUnavailable("timeout".into()));
        assert_eq!(map.state().region, crate::models::Region::default());
        assert_eq!(
            map.state().notices,
            vec![
                Notice::LocationRefused,
                Notice::LocationUnavailable("timeout".into())
            ]
        );
    }

    #[test]
    fn fetch_failure_keeps_previous_facilities() {
        let (mut map, _) = controller();
        map.on_facilities_resolved(vec![json!({"geo_point_2d": [48.1, 2.1]})]);
        map.on_facilities_failed(FetchError::Network("connection reset".into()));
        assert_eq!(map.state().facilities.len(), 1);
        assert_eq!(map.state().notices.len(), 1);
    }

    #[test]
    fn results_after_teardown_are_ignored() {
        let (mut map, _) = controller();
        map.teardown();
        map.on_location_resolved(Coordinates::new(1.0, 1.0));
        map.on_facilities_resolved(vec![json!({"geo_point_2d": [48.1, 2.1]})]);
        assert_eq!(map.state().region, crate::models::Region::default());
        assert!(map.state().facilities.is_empty());
    }

    #[test]
    fn results_for_another_mount_are_ignored() {
        let (mut map, _) = controller();
        let (other, _) = controller();
        map.handle_event(Event::Location {
            mount: other.mount_id(),
            outcome: Ok(Coordinates::new(1.0, 1.0)),
        });
        assert_eq!(map.state().region, crate::models::Region::default());

        map.handle_event(Event::Location {
            mount: map.mount_id(),
            outcome: Ok(Coordinates::new(1.0, 1.0)),
        });
        assert_eq!(map.state().region.center, Coordinates::new(1.0, 1.0));
    }

    #[test]
    fn select_by_unknown_id_changes_nothing() {
        let (mut map, _) = controller();
        map.on_facilities_resolved(vec![json!({"geo_point_2d": [48.1, 2.1]})]);
        assert!(!map.select_facility_by_id(&FacilityId::Position(5)));
        assert!(map.state().selection.is_none());
        assert!(map.select_facility_by_id(&FacilityId::Position(0)));
        assert!(map.state().selection.is_some());
    }

    #[test]
    fn subscribers_see_each_snapshot() {
        let (mut map, _) = controller();
        let mut view = map.subscribe();
        assert!(!view.has_changed().unwrap());

        map.select_facility(facility(4));
        assert!(view.has_changed().unwrap());
        assert_eq!(view.borrow_and_update().selection, Some(facility(4)));

        // No-op transitions publish nothing.
        map.select_facility(facility(4));
        assert!(!view.has_changed().unwrap());
    }
}
