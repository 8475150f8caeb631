// Service exports
pub mod backend;
pub mod geolocation;
pub mod sessions;

pub use backend::{HttpSearchBackend, SearchBackend, SearchError};
pub use geolocation::{parse_client_ip, ClientIpLocation, GeoLocator, IpLocationSource, LocationError, LocationSource, ReportedPosition, FALLBACK_COORDINATE};
pub use sessions::{RegistryError, SessionRegistry};
