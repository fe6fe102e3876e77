//! Maps raw dataset records into [`Facility`] values.
//!
//! Records are untyped JSON. Each one either becomes a facility or is
//! rejected with a [`MalformedRecord`] reason; a bad record never stops the
//! rest of the batch.

use crate::error::MalformedRecord;
use crate::models::{Coordinates, Facility, FacilityId, TriState};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

const AFFIRMATIVE: &str = "Oui";
const NEGATIVE: &str = "Non";

/// Result of normalizing one batch.
#[derive(Debug, Default)]
pub struct Normalized {
    pub facilities: Vec<Facility>,
    /// `(position in batch, reason)` for every record left out.
    pub rejected: Vec<(usize, MalformedRecord)>,
}

/// Normalizes a whole batch. Ids are unique within the result: a repeated
/// dataset id falls back to the record's position.
pub fn normalize_batch(records: &[Value]) -> Normalized {
    let mut out = Normalized::default();
    let mut seen = HashSet::new();
    for (index, record) in records.iter().enumerate() {
        match normalize_record(index, record) {
            Ok(mut facility) => {
                if !seen.insert(facility.id.clone()) {
                    debug!("Duplicate id {} at record {}, using its position", facility.id, index);
                    facility.id = FacilityId::Position(index);
                    seen.insert(facility.id.clone());
                }
                out.facilities.push(facility)
            }
            Err(reason) => {
                debug!("Dropping record {}: {}", index, reason);
                out.rejected.push((index, reason));
            }
        }
    }
    out
}

/// Normalizes the record found at `index` of its batch.
pub fn normalize_record(index: usize, record: &Value) -> Result<Facility, MalformedRecord> {
    let outer = record.as_object().ok_or(MalformedRecord::NotAnObject)?;
    // The records API nests the payload under "fields"; flat records are accepted too.
    let fields = match outer.get("fields") {
        Some(Value::Object(inner)) => inner,
        _ => outer,
    };

    let location = parse_coordinates(fields.get("geo_point_2d"))?;

    let id = outer
        .get("recordid")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(|s| FacilityId::Record(s.to_string()))
        .unwrap_or(FacilityId::Position(index));

    Ok(Facility {
        id,
        location,
        name: text(fields.get("type")),
        address: text(fields.get("adresse")),
        schedule: text(fields.get("horaire")),
        has_accessibility: tri_state(fields.get("acces_pmr")),
        has_baby_changing: tri_state(fields.get("relais_bebe")),
        district: text(fields.get("arrondissement")),
    })
}

fn parse_coordinates(raw: Option<&Value>) -> Result<Coordinates, MalformedRecord> {
    let pair = match raw {
        None | Some(Value::Null) => return Err(MalformedRecord::MissingCoordinates),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(MalformedRecord::CoordinateArity(1)),
    };
    if pair.len() != 2 {
        return Err(MalformedRecord::CoordinateArity(pair.len()));
    }
    let number = |v: &Value| {
        v.as_f64()
            .filter(|n| n.is_finite())
            .ok_or(MalformedRecord::CoordinateNotNumeric)
    };
    Ok(Coordinates::new(number(&pair[0])?, number(&pair[1])?))
}

/// Display text; numbers are accepted (district codes come as integers).
fn text(raw: Option<&Value>) -> Option<String> {
    match raw? {
        Value::String(s) => Some(s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn tri_state(raw: Option<&Value>) -> TriState {
    match raw.and_then(Value::as_str) {
        Some(AFFIRMATIVE) => TriState::Yes,
        Some(NEGATIVE) => TriState::No,
        _ => TriState::Unknown,
    }
}
