use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::core::distance::distance_km;
use crate::models::domain::{Coordinate, FeedKind};

/// Attributes every discoverable item carries
///
/// The backend is not consistent about field names across feeds, so each
/// field accepts the variants seen in the wild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCore {
    #[serde(alias = "_id", alias = "$id", alias = "placeId", alias = "userId")]
    pub id: String,
    #[serde(rename = "displayName", alias = "name", alias = "title", alias = "username")]
    pub display_name: String,
    #[serde(rename = "location", alias = "coordinate", alias = "coordinates", default)]
    pub coordinate: Option<Coordinate>,
    #[serde(rename = "distanceKm", alias = "distance", default)]
    pub distance_km: Option<f64>,
    #[serde(alias = "types", alias = "categories", default)]
    pub tags: Vec<String>,
}

impl EntityCore {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            coordinate: None,
            distance_km: None,
            tags: Vec::new(),
        }
    }

    pub fn at(mut self, coordinate: Coordinate) -> Self {
        self.coordinate = Some(coordinate);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Drop coordinates that violate the WGS84 ranges and, for Nearby
    /// results, fill a missing distance from the search origin.
    pub fn normalize(&mut self, origin: Option<Coordinate>) {
        self.coordinate = self.coordinate.and_then(|c| c.validated().ok());

        if self.distance_km.map_or(false, |d| !d.is_finite() || d < 0.0) {
            self.distance_km = None;
        }

        if self.distance_km.is_none() {
            if let (Some(origin), Some(position)) = (origin, self.coordinate) {
                self.distance_km = Some(distance_km(origin, position));
            }
        }
    }
}

/// A discovered item the engine can page, deduplicate and select
///
/// Feed-specific structs embed an [`EntityCore`]; the engine only ever looks
/// at the core.
pub trait Entity: Clone + Send + Sync + 'static {
    fn core(&self) -> &EntityCore;
    fn core_mut(&mut self) -> &mut EntityCore;

    fn id(&self) -> &str {
        &self.core().id
    }

    fn display_name(&self) -> &str {
        &self.core().display_name
    }

    fn coordinate(&self) -> Option<Coordinate> {
        self.core().coordinate
    }

    fn distance_km(&self) -> Option<f64> {
        self.core().distance_km
    }

    fn tags(&self) -> &[String] {
        &self.core().tags
    }
}

/// Binds an entity schema to the feed it is served from
pub trait FeedEntity: Entity + Serialize + DeserializeOwned {
    const FEED: FeedKind;
}

impl Entity for EntityCore {
    fn core(&self) -> &EntityCore {
        self
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        self
    }
}

/// Another traveler open to meeting up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traveler {
    #[serde(flatten)]
    pub core: EntityCore,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(rename = "homeCountry", default)]
    pub home_country: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(rename = "isVerified", default)]
    pub is_verified: bool,
}

impl Traveler {
    /// Travelers who do not share their location come back without coordinates
    pub fn shares_location(&self) -> bool {
        self.core.coordinate.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    #[serde(flatten)]
    pub core: EntityCore,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(rename = "priceLevel", default)]
    pub price_level: Option<u8>,
    #[serde(default, alias = "vicinity")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attraction {
    #[serde(flatten)]
    pub core: EntityCore,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default, alias = "vicinity")]
    pub address: Option<String>,
    #[serde(rename = "openingHours", default)]
    pub opening_hours: Option<String>,
    #[serde(rename = "entryFee", default)]
    pub entry_fee: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    #[serde(flatten)]
    pub core: EntityCore,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default, alias = "vicinity")]
    pub address: Option<String>,
    #[serde(rename = "openNow", default)]
    pub open_now: Option<bool>,
}

/// Kind of emergency service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyServiceType {
    Hospital,
    Police,
    FireStation,
    Pharmacy,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyService {
    #[serde(flatten)]
    pub core: EntityCore,
    #[serde(rename = "serviceType")]
    pub service_type: EmergencyServiceType,
    #[serde(default, alias = "phoneNumber")]
    pub phone: Option<String>,
    #[serde(rename = "open24h", default)]
    pub open_24h: bool,
    #[serde(default, alias = "vicinity")]
    pub address: Option<String>,
}

/// A meetup or group activity hosted by a traveler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(flatten)]
    pub core: EntityCore,
    #[serde(rename = "hostId", default)]
    pub host_id: Option<String>,
    #[serde(rename = "participantCount", default)]
    pub participant_count: u32,
    #[serde(rename = "maxParticipants", default)]
    pub max_participants: Option<u32>,
    #[serde(rename = "startsAt", default)]
    pub starts_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Activity {
    /// Remaining places, `None` when the activity has no cap
    pub fn spots_left(&self) -> Option<u32> {
        self.max_participants
            .map(|max| max.saturating_sub(self.participant_count))
    }

    pub fn is_full(&self) -> bool {
        self.spots_left() == Some(0)
    }
}

macro_rules! feed_entity {
    ($ty:ty, $feed:expr) => {
        impl Entity for $ty {
            fn core(&self) -> &EntityCore {
                &self.core
            }

            fn core_mut(&mut self) -> &mut EntityCore {
                &mut self.core
            }
        }

        impl FeedEntity for $ty {
            const FEED: FeedKind = $feed;
        }
    };
}

feed_entity!(Traveler, FeedKind::Travelers);
feed_entity!(Hotel, FeedKind::Hotels);
feed_entity!(Attraction, FeedKind::Attractions);
feed_entity!(Shop, FeedKind::Shopping);
feed_entity!(EmergencyService, FeedKind::Emergency);
feed_entity!(Activity, FeedKind::Activities);
