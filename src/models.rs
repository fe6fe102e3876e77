use serde::{Deserialize, Serialize};
use std::fmt;

/// Paris city center, used until a real position is known.
pub const PARIS_CENTER: Coordinates = Coordinates {
    latitude: 48.8566,
    longitude: 2.3522,
};

pub const DEFAULT_SPAN: Span = Span {
    latitude_delta: 0.0922,
    longitude_delta: 0.0421,
};

/// Span used once the device position is known.
pub const LOCATED_SPAN: Span = Span {
    latitude_delta: 0.02,
    longitude_delta: 0.01,
};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in kilometers (haversine).
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

/// Map viewport: center plus span. Always replaced as a whole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub center: Coordinates,
    pub span: Span,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            center: PARIS_CENTER,
            span: DEFAULT_SPAN,
        }
    }
}

impl Region {
    pub fn located(center: Coordinates) -> Self {
        Self {
            center,
            span: LOCATED_SPAN,
        }
    }

    /// `[min, max]` longitude bounds of the viewport.
    pub fn x_bounds(&self) -> [f64; 2] {
        let half = self.span.longitude_delta / 2.0;
        [self.center.longitude - half, self.center.longitude + half]
    }

    /// `[min, max]` latitude bounds of the viewport.
    pub fn y_bounds(&self) -> [f64; 2] {
        let half = self.span.latitude_delta / 2.0;
        [self.center.latitude - half, self.center.latitude + half]
    }

    pub fn contains(&self, point: &Coordinates) -> bool {
        let [x0, x1] = self.x_bounds();
        let [y0, y1] = self.y_bounds();
        (x0..=x1).contains(&point.longitude) && (y0..=y1).contains(&point.latitude)
    }
}

/// Yes / no / not reported. The dataset encodes these as free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriState {
    Yes,
    No,
    #[default]
    Unknown,
}

impl TriState {
    pub fn label(self) -> &'static str {
        match self {
            TriState::Yes => "yes",
            TriState::No => "no",
            TriState::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FacilityId {
    /// Identifier supplied by the dataset.
    Record(String),
    /// Position in the fetched batch, used when the record has no identifier.
    Position(usize),
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacilityId::Record(id) => f.write_str(id),
            FacilityId::Position(i) => write!(f, "#{}", i),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Facility {
    pub id: FacilityId,
    pub location: Coordinates,
    pub name: Option<String>,
    pub address: Option<String>,
    pub schedule: Option<String>,
    pub has_accessibility: TriState,
    pub has_baby_changing: TriState,
    pub district: Option<String>,
}

impl Facility {
    /// Short label for lists and markers.
    pub fn label(&self) -> String {
        self.address
            .as_deref()
            .or(self.name.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| self.id.to_string())
    }
}
