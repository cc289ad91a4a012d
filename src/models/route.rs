//! Route and stop models.
//!
//! Stop lists are stored as a JSON column but only cross the persistence
//! edge as typed `Stop` records. A legacy comma-joined plain-string encoding
//! is still accepted on read as a one-time import format.

use serde::{Deserialize, Serialize};

/// Position of a stop within the route.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StopKind {
    Origin,
    Stop,
    Destination,
}

/// One entry in a route's ordered stop list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    /// 1-based sequence position, renumbered on read
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Scheduled time at this stop, free-form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<StopKind>,
}

impl Stop {
    /// A name-only stop, as produced by the legacy import format.
    pub fn named(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            latitude: None,
            longitude: None,
            time: None,
            kind: None,
        }
    }
}

/// A registered bus route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bus_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depart_home: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrive_school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depart_school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrive_home: Option<String>,
    pub stops: Vec<Stop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: String,
}

/// Request body for registering a route.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRouteRequest {
    pub name: String,
    #[serde(default)]
    pub bus_number: Option<String>,
    #[serde(default)]
    pub plate: Option<String>,
    #[serde(default)]
    pub shift: Option<String>,
    #[serde(default)]
    pub driver_name: Option<String>,
    #[serde(default)]
    pub driver_phone: Option<String>,
    #[serde(default)]
    pub depart_home: Option<String>,
    #[serde(default)]
    pub arrive_school: Option<String>,
    #[serde(default)]
    pub depart_school: Option<String>,
    #[serde(default)]
    pub arrive_home: Option<String>,
    #[serde(default)]
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Where the bus ends up, taken from the last stop.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinationSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// Student-facing route view with the school appended as destination.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteDetail {
    #[serde(flatten)]
    pub route: Route,
    pub destination: DestinationSummary,
}

/// Decode a stops column: structured JSON, or the legacy comma-joined
/// plain-string list from early installs.
pub fn decode_stops(raw: Option<&str>) -> Vec<Stop> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if let Ok(stops) = serde_json::from_str::<Vec<Stop>>(trimmed) {
        return stops;
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Stop::named)
        .collect()
}

/// Assign positional kinds to stops that lack one (first=origin,
/// last=destination, else=stop) and renumber ids contiguously from 1.
pub fn normalize_stops(stops: &mut [Stop]) {
    let last = stops.len().saturating_sub(1);
    for (idx, stop) in stops.iter_mut().enumerate() {
        if stop.kind.is_none() {
            stop.kind = Some(if idx == 0 {
                StopKind::Origin
            } else if idx == last {
                StopKind::Destination
            } else {
                StopKind::Stop
            });
        }
        stop.id = idx as i64 + 1;
    }
}

// Development placeholder, not geocoding. The offset must be stable across
// runs, so the hash is a fixed FNV-1a rather than the std hasher.
const BASE_LATITUDE: f64 = -8.28179;
const BASE_LONGITUDE: f64 = -35.99857;

/// Deterministic stand-in coordinates derived from a place name.
pub fn placeholder_coords(name: &str) -> (f64, f64) {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in name.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x100000001b3);
    }
    let offset = (hash % 100) as f64 / 10000.0;
    (BASE_LATITUDE + offset, BASE_LONGITUDE + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_stops_json() {
        let raw = r#"[{"name":"Praça Central","latitude":-8.2,"longitude":-35.9},{"name":"Escola Municipal","type":"destination"}]"#;
        let stops = decode_stops(Some(raw));
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[0].name, "Praça Central");
        assert_eq!(stops[1].kind, Some(StopKind::Destination));
    }

    #[test]
    fn test_decode_stops_legacy_comma_joined() {
        let stops = decode_stops(Some("Praça Central, Terminal, Escola"));
        assert_eq!(stops.len(), 3);
        assert_eq!(stops[1].name, "Terminal");
        assert!(stops.iter().all(|s| s.kind.is_none()));
    }

    #[test]
    fn test_decode_stops_empty() {
        assert!(decode_stops(None).is_empty());
        assert!(decode_stops(Some("  ")).is_empty());
    }

    #[test]
    fn test_normalize_stops_positional_kinds() {
        let mut stops = vec![Stop::named("A"), Stop::named("B"), Stop::named("C")];
        normalize_stops(&mut stops);
        assert_eq!(stops[0].kind, Some(StopKind::Origin));
        assert_eq!(stops[1].kind, Some(StopKind::Stop));
        assert_eq!(stops[2].kind, Some(StopKind::Destination));
        assert_eq!(
            stops.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_normalize_stops_keeps_explicit_kinds() {
        let mut stops = vec![
            Stop {
                kind: Some(StopKind::Destination),
                ..Stop::named("A")
            },
            Stop::named("B"),
        ];
        normalize_stops(&mut stops);
        // Explicit tag is never rewritten, even out of position.
        assert_eq!(stops[0].kind, Some(StopKind::Destination));
        assert_eq!(stops[1].kind, Some(StopKind::Destination));
    }

    #[test]
    fn test_normalize_single_stop_is_origin() {
        let mut stops = vec![Stop::named("Only")];
        normalize_stops(&mut stops);
        assert_eq!(stops[0].kind, Some(StopKind::Origin));
    }

    #[test]
    fn test_placeholder_coords_deterministic() {
        let (lat1, lng1) = placeholder_coords("Escola Municipal");
        let (lat2, lng2) = placeholder_coords("Escola Municipal");
        assert_eq!(lat1, lat2);
        assert_eq!(lng1, lng2);
        // Offset stays within the documented window around the base point.
        assert!((lat1 - BASE_LATITUDE).abs() < 0.01);
        assert!((lng1 - BASE_LONGITUDE).abs() < 0.01);
    }
}
