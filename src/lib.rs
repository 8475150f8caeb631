//! Roam Discovery - location-aware discovery sessions for the Roam travel app
//!
//! Each feed (travelers, hotels, attractions, shopping, emergency services,
//! activities) is browsed through a discovery session: nearby or global
//! search, cursor paging with deduplication, radius changes and retry, with
//! responses from superseded requests discarded.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{DiscoveryController, DiscoveryOptions, DiscoverySession, Outcome, PageCache, Phase, QueryBuilder, Rejection};
pub use crate::models::{Coordinate, Cursor, DiscoveryRequest, Entity, FeedKind, ResultPage, SearchMode};
pub use crate::services::{GeoLocator, HttpSearchBackend, SearchBackend, SearchError};
