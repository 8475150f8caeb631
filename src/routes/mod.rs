// Route exports
pub mod feeds;

use actix_web::{web, HttpResponse, Responder};

use crate::models::{Activity, Attraction, EmergencyService, HealthResponse, Hotel, Shop, Traveler};
pub use feeds::{ApiError, FeedState, LocationPolicy};

/// Per-feed state shared across all workers
///
/// Feeds never share sessions or caches; each gets its own registry.
#[derive(Clone)]
pub struct AppState {
    pub travelers: web::Data<FeedState<Traveler>>,
    pub hotels: web::Data<FeedState<Hotel>>,
    pub attractions: web::Data<FeedState<Attraction>>,
    pub shopping: web::Data<FeedState<Shop>>,
    pub emergency: web::Data<FeedState<EmergencyService>>,
    pub activities: web::Data<FeedState<Activity>>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(health_check))
            .configure(|cfg| feeds::configure(cfg, state.travelers.clone()))
            .configure(|cfg| feeds::configure(cfg, state.hotels.clone()))
            .configure(|cfg| feeds::configure(cfg, state.attractions.clone()))
            .configure(|cfg| feeds::configure(cfg, state.shopping.clone()))
            .configure(|cfg| feeds::configure(cfg, state.emergency.clone()))
            .configure(|cfg| feeds::configure(cfg, state.activities.clone())),
    );
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}
