// Core discovery engine exports
pub mod controller;
pub mod distance;
pub mod outcome;
pub mod page_cache;
pub mod query;
pub mod selection;
pub mod session;

pub use controller::{DiscoveryController, DiscoveryOptions, SessionSnapshot};
pub use distance::distance_km;
pub use outcome::{Outcome, Rejection};
pub use page_cache::PageCache;
pub use query::{Intent, QueryBuilder};
pub use selection::Selection;
pub use session::{DiscoverySession, FetchKind, Phase, RadiusBounds, SearchInput, Ticket};
