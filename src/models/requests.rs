use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{Coordinate, SearchMode};

/// Open a feed session
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MountRequest {
    /// Position reported by the device, if it could get one
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
    /// The user refused the location prompt
    #[serde(rename = "locationDenied", default)]
    pub location_denied: bool,
    #[validate(range(min = 1))]
    #[serde(rename = "radiusMeters", default)]
    pub radius_meters: Option<u32>,
}

/// Search box submit
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(max = 200))]
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub mode: Option<SearchMode>,
    /// Point picked on the map
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RadiusRequest {
    #[validate(range(min = 1))]
    #[serde(rename = "radiusMeters")]
    pub radius_meters: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SelectRequest {
    #[validate(length(min = 1))]
    #[serde(rename = "entityId", default)]
    pub entity_id: Option<String>,
}
