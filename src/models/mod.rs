// Model exports
pub mod domain;
pub mod entities;
pub mod requests;
pub mod responses;

pub use domain::{Coordinate, CoordinateError, Cursor, DiscoveryRequest, FeedKind, ResultPage, SearchMode};
pub use entities::{Activity, Attraction, EmergencyService, EmergencyServiceType, Entity, EntityCore, FeedEntity, Hotel, Shop, Traveler};
pub use requests::{MountRequest, RadiusRequest, SearchRequest, SelectRequest};
pub use responses::{ErrorResponse, HealthResponse, SessionResponse};
