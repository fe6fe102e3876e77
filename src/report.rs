//! Single-choice status report for the inspected facility.
//!
//! The flow walks `Idle -> Chosen -> Submitting -> Submitted` and hands the
//! finished [`Submission`] to an outbox channel. Once delivered it resets to
//! `Idle`; a failed delivery puts it back on `Chosen`.

use crate::error::ReportError;
use crate::models::FacilityId;
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

/// Receiving end of reports; owned by whoever consumes submissions.
pub type ReportOutbox = UnboundedSender<Submission>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportOption {
    Closed,
    OutOfOrder,
    Dirty,
    Broken,
}

impl ReportOption {
    pub const ALL: [ReportOption; 4] = [
        ReportOption::Closed,
        ReportOption::OutOfOrder,
        ReportOption::Dirty,
        ReportOption::Broken,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ReportOption::Closed => "Fermée",
            ReportOption::OutOfOrder => "Hors service",
            ReportOption::Dirty => "Sale",
            ReportOption::Broken => "Cassée",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|o| *o == self).unwrap_or(0)
    }
}

impl fmt::Display for ReportOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub facility_id: FacilityId,
    pub option: ReportOption,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportStage {
    #[default]
    Idle,
    Chosen(ReportOption),
    Submitting(ReportOption),
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportFlow {
    stage: ReportStage,
}

impl ReportFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> ReportStage {
        self.stage
    }

    /// The option currently picked, if any.
    pub fn chosen(&self) -> Option<ReportOption> {
        match self.stage {
            ReportStage::Chosen(o) | ReportStage::Submitting(o) => Some(o),
            _ => None,
        }
    }

    /// Picks `option`, replacing any earlier choice.
    pub fn choose(&mut self, option: ReportOption) {
        match self.stage {
            ReportStage::Idle | ReportStage::Chosen(_) | ReportStage::Submitted => {
                self.stage = ReportStage::Chosen(option)
            }
            ReportStage::Submitting(_) => {}
        }
    }

    /// Sends the chosen option for `facility_id` to `outbox`.
    ///
    /// Fails with [`ReportError::NothingChosen`] without changing state when
    /// nothing was picked. On success the flow is back at `Idle`.
    pub fn submit(
        &mut self,
        facility_id: &FacilityId,
        outbox: &ReportOutbox,
    ) -> Result<Submission, ReportError> {
        let option = match self.stage {
            ReportStage::Chosen(o) => o,
            _ => return Err(ReportError::NothingChosen),
        };

        self.stage = ReportStage::Submitting(option);
        let submission = Submission {
            facility_id: facility_id.clone(),
            option,
            submitted_at: Utc::now(),
        };

        if outbox.send(submission.clone()).is_err() {
            warn!("Report outbox closed, keeping '{}' for {}", option, facility_id);
            self.stage = ReportStage::Chosen(option);
            return Err(ReportError::Undeliverable);
        }

        self.stage = ReportStage::Submitted;
        info!("Report '{}' sent for facility {}", option, facility_id);
        self.stage = ReportStage::Idle;
        Ok(submission)
    }
}
