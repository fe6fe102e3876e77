//! Immutable view-state snapshots of the map screen.
//!
//! Every transition consumes a [`MapState`] and returns the next one. The
//! controller publishes each snapshot on a `watch` channel; the UI only ever
//! reads snapshots.

use crate::models::{Coordinates, Facility, FacilityId, Region};
use crate::report::{ReportFlow, ReportOption};
use std::sync::Arc;

/// Non-fatal, user-visible message.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    LocationRefused,
    LocationUnavailable(String),
    FacilitiesUnavailable(String),
    ReportNeedsOption,
    ReportSent(ReportOption),
    ReportNotDelivered,
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::LocationRefused => {
                "Location permission refused, showing Paris center.".to_string()
            }
            Notice::LocationUnavailable(reason) => {
                format!("Position unavailable ({}), showing Paris center.", reason)
            }
            Notice::FacilitiesUnavailable(reason) => {
                format!("Could not load facilities: {}", reason)
            }
            Notice::ReportNeedsOption => "Please select an option.".to_string(),
            Notice::ReportSent(option) => format!("Report sent: {}", option),
            Notice::ReportNotDelivered => "Report could not be sent.".to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Notice::ReportSent(_))
    }
}

/// Which background acquisitions are still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pending {
    pub location: bool,
    pub facilities: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapState {
    pub region: Region,
    pub facilities: Arc<[Facility]>,
    pub selection: Option<Facility>,
    /// `Some` while the report modal is open.
    pub report: Option<ReportFlow>,
    pub notices: Vec<Notice>,
    /// Last resolved device position.
    pub position: Option<Coordinates>,
    pub pending: Pending,
}

impl Default for MapState {
    fn default() -> Self {
        Self {
            region: Region::default(),
            facilities: Arc::from(Vec::new()),
            selection: None,
            report: None,
            notices: Vec::new(),
            position: None,
            pending: Pending::default(),
        }
    }
}

impl MapState {
    pub fn report_flow_open(&self) -> bool {
        self.report.is_some()
    }

    pub fn facility(&self, id: &FacilityId) -> Option<&Facility> {
        self.facilities.iter().find(|f| &f.id == id)
    }

    /// True when `facility` is the one under inspection. Compares the whole
    /// record, since a positional id can name another facility after a refresh.
    pub fn is_selected(&self, facility: &Facility) -> bool {
        self.selection.as_ref() == Some(facility)
    }

    /// Distance in km from the device to the inspected facility.
    pub fn selection_distance_km(&self) -> Option<f64> {
        let here = self.position?;
        self.selection
            .as_ref()
            .map(|f| here.distance_km(&f.location))
    }

    pub fn located(mut self, coords: Coordinates) -> Self {
        self.region = Region::located(coords);
        self.position = Some(coords);
        self.pending.location = false;
        self
    }

    pub fn location_failed(mut self, notice: Notice) -> Self {
        self.pending.location = false;
        self.notify(notice)
    }

    pub fn with_facilities(mut self, facilities: Vec<Facility>) -> Self {
        self.facilities = facilities.into();
        self.pending.facilities = false;
        self
    }

    pub fn facilities_failed(mut self, notice: Notice) -> Self {
        self.pending.facilities = false;
        self.notify(notice)
    }

    pub fn fetching(mut self) -> Self {
        self.pending.facilities = true;
        self
    }

    pub fn locating(mut self) -> Self {
        self.pending.location = true;
        self
    }

    /// Inspects `facility`. A report open for another facility is discarded.
    pub fn selecting(mut self, facility: Facility) -> Self {
        if self.selection.as_ref() != Some(&facility) {
            self.report = None;
        }
        self.selection = Some(facility);
        self
    }

    /// Clears the selection and, with it, any open report.
    pub fn dismissed(mut self) -> Self {
        self.selection = None;
        self.report = None;
        self
    }

    pub fn report_opened(mut self) -> Self {
        if self.selection.is_some() && self.report.is_none() {
            self.report = Some(ReportFlow::new());
        }
        self
    }

    pub fn report_closed(mut self) -> Self {
        self.report = None;
        self
    }

    pub fn with_report(mut self, flow: ReportFlow) -> Self {
        if self.report.is_some() {
            self.report = Some(flow);
        }
        self
    }

    pub fn notify(mut self, notice: Notice) -> Self {
        self.notices.push(notice);
        self
    }

    /// Drops the oldest notice.
    pub fn notice_dismissed(mut self) -> Self {
        if !self.notices.is_empty() {
            self.notices.remove(0);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TriState, DEFAULT_SPAN, LOCATED_SPAN};

    fn facility(i: usize) -> Facility {
        Facility {
            id: FacilityId::Position(i),
            location: Coordinates::new(48.86, 2.34),
            name: None,
            address: None,
            schedule: None,
            has_accessibility: TriState::Unknown,
            has_baby_changing: TriState::Unknown,
            district: None,
        }
    }

    #[test]
    fn region_replacement_is_atomic() {
        let state = MapState::default().locating().located(Coordinates::new(48.85, 2.35));
        assert_eq!(state.region.center, Coordinates::new(48.85, 2.35));
        assert_eq!(state.region.span, LOCATED_SPAN);
        assert!(!state.pending.location);
    }

    #[test]
    fn location_failure_keeps_region() {
        let state = MapState::default().location_failed(Notice::LocationRefused);
        assert_eq!(state.region.span, DEFAULT_SPAN);
        assert_eq!(state.notices, vec![Notice::LocationRefused]);
    }

    #[test]
    fn report_cannot_open_without_selection() {
        let state = MapState::default().report_opened();
        assert!(!state.report_flow_open());
        let state = state.report_opened();
        assert!(!state.report_flow_open());
    }

    #[test]
    fn dismiss_closes_report() {
        let state = MapState::default().selecting(facility(0)).report_opened();
        assert!(state.report_flow_open());
        let state = state.dismissed();
        assert!(state.selection.is_none());
        assert!(!state.report_flow_open());
    }

    #[test]
    fn selecting_another_facility_closes_report() {
        let state = MapState::default().selecting(facility(0)).report_opened();
        let state = state.selecting(facility(0));
        assert!(state.report_flow_open());
        let state = state.selecting(facility(1));
        assert_eq!(state.selection, Some(facility(1)));
        assert!(!state.report_flow_open());
    }

    #[test]
    fn refreshed_record_with_same_position_is_not_selected() {
        let kept = facility(0);
        let mut moved = facility(0);
        moved.location = Coordinates::new(48.9, 2.4);
        let state = MapState::default()
            .selecting(kept.clone())
            .with_facilities(vec![moved.clone()]);
        assert!(state.is_selected(&kept));
        assert!(!state.is_selected(&moved));
    }

    #[test]
    fn with_report_is_ignored_when_closed() {
        let state = MapState::default().with_report(ReportFlow::new());
        assert!(state.report.is_none());
    }

    #[test]
    fn notices_are_dismissed_oldest_first() {
        let state = MapState::default()
            .notify(Notice::LocationRefused)
            .notify(Notice::ReportNeedsOption)
            .notice_dismissed();
        assert_eq!(state.notices, vec![Notice::ReportNeedsOption]);
        let state = state.notice_dismissed().notice_dismissed();
        assert!(state.notices.is_empty());
    }

    #[test]
    fn distance_needs_position_and_selection() {
        let state = MapState::default().selecting(facility(1));
        assert!(state.selection_distance_km().is_none());
        let state = state.located(Coordinates::new(48.86, 2.34));
        assert_eq!(state.selection_distance_km(), Some(0.0));
    }
}
