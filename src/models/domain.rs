use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when a coordinate falls outside the WGS84 ranges
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// A point on the globe in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting out-of-range or non-finite values
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self { latitude, longitude })
    }

    /// Re-check the range invariant on a value that bypassed `new` (e.g. serde)
    pub fn validated(self) -> Result<Self, CoordinateError> {
        Self::new(self.latitude, self.longitude)
    }
}

/// Discovery search mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Bounded by a coordinate and radius, distance sorted
    Nearby,
    /// Unbounded free-text search
    Global,
}

impl SearchMode {
    pub fn toggled(self) -> Self {
        match self {
            SearchMode::Nearby => SearchMode::Global,
            SearchMode::Global => SearchMode::Nearby,
        }
    }
}

/// Opaque continuation token issued by the search backend.
///
/// Never parsed or constructed locally; it is only echoed back for the query
/// that produced it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Cursor {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for Cursor {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor(<{} bytes>)", self.0.len())
    }
}

/// Normalized request descriptor handed to the search backend
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryRequest {
    pub coordinate: Option<Coordinate>,
    pub radius_meters: Option<u32>,
    pub query_text: String,
    pub cursor: Option<Cursor>,
    pub page_size: u32,
}

impl DiscoveryRequest {
    pub fn mode(&self) -> SearchMode {
        if self.coordinate.is_some() {
            SearchMode::Nearby
        } else {
            SearchMode::Global
        }
    }
}

/// One page of search results
#[derive(Debug, Clone)]
pub struct ResultPage<E> {
    pub items: Vec<E>,
    pub next_cursor: Option<Cursor>,
}

impl<E> ResultPage<E> {
    pub fn new(items: Vec<E>, next_cursor: Option<Cursor>) -> Self {
        Self { items, next_cursor }
    }

    /// Last page of a result set
    pub fn terminal(items: Vec<E>) -> Self {
        Self { items, next_cursor: None }
    }
}

/// The six discovery feeds the app exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Travelers,
    Hotels,
    Attractions,
    Shopping,
    Emergency,
    Activities,
}

impl FeedKind {
    pub const ALL: [FeedKind; 6] = [
        FeedKind::Travelers,
        FeedKind::Hotels,
        FeedKind::Attractions,
        FeedKind::Shopping,
        FeedKind::Emergency,
        FeedKind::Activities,
    ];

    /// Route segment used by the session API
    pub fn slug(self) -> &'static str {
        match self {
            FeedKind::Travelers => "travelers",
            FeedKind::Hotels => "hotels",
            FeedKind::Attractions => "attractions",
            FeedKind::Shopping => "shopping",
            FeedKind::Emergency => "emergency",
            FeedKind::Activities => "activities",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_bounds() {
        assert!(Coordinate::new(20.5937, 78.9629).is_ok());
        assert!(Coordinate::new(90.0, -180.0).is_ok());
        assert_eq!(Coordinate::new(91.0, 0.0), Err(CoordinateError::Latitude(91.0)));
        assert_eq!(Coordinate::new(0.0, 180.5), Err(CoordinateError::Longitude(180.5)));
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_coordinate_accepts_short_field_names() {
        let coordinate: Coordinate = serde_json::from_str(r#"{"lat": 48.85, "lng": 2.35}"#).unwrap();
        assert_eq!(coordinate.latitude, 48.85);
        assert_eq!(coordinate.longitude, 2.35);
    }

    #[test]
    fn test_cursor_debug_hides_token() {
        let cursor = Cursor::from("secret-token");
        assert!(!format!("{:?}", cursor).contains("secret"));
        assert_eq!(cursor.as_str(), "secret-token");
    }

    #[test]
    fn test_mode_toggle() {
        assert_eq!(SearchMode::Nearby.toggled(), SearchMode::Global);
        assert_eq!(SearchMode::Global.toggled(), SearchMode::Nearby);
    }
}
