use thiserror::Error;

/// Failures while acquiring the device position.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("location permission was refused")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),
}

/// Failures while fetching the facility dataset.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("malformed response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Body(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Failures raised by the report flow.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    #[error("no option chosen")]
    NothingChosen,

    #[error("no report is open")]
    NotOpen,

    #[error("report could not be delivered")]
    Undeliverable,
}

/// Why a single raw record was left out of a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedRecord {
    #[error("record is not an object")]
    NotAnObject,

    #[error("missing coordinate field")]
    MissingCoordinates,

    #[error("coordinate field has {0} elements, expected 2")]
    CoordinateArity(usize),

    #[error("coordinate element is not a finite number")]
    CoordinateNotNumeric,
}
