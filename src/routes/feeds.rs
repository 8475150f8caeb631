use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::core::{DiscoveryController, DiscoveryOptions, Outcome, SearchInput};
use crate::models::{
    Coordinate, CoordinateError, ErrorResponse, FeedEntity, MountRequest, RadiusRequest,
    SearchRequest, SelectRequest, SessionResponse,
};
use crate::services::{
    parse_client_ip, GeoLocator, IpLocationSource, LocationSource, RegistryError, ReportedPosition,
    SearchBackend, SessionRegistry,
};

/// Errors returned by the session endpoints
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid coordinate: {0}")]
    Coordinate(#[from] CoordinateError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::Coordinate(_) => StatusCode::BAD_REQUEST,
            ApiError::Registry(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error = match self {
            ApiError::SessionNotFound(_) => "session_not_found",
            ApiError::Validation(_) | ApiError::Coordinate(_) => "invalid_request",
            ApiError::Registry(_) => "too_many_sessions",
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error.to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

/// How devices are located when a session is opened
#[derive(Clone)]
pub struct LocationPolicy {
    pub fallback: Coordinate,
    pub timeout: Duration,
    /// Locates the client by its address when it reports neither a fix nor a denial
    pub provider: Option<Arc<IpLocationSource>>,
}

impl LocationPolicy {
    fn locator_for(&self, request: &MountRequest, client_ip: Option<IpAddr>) -> GeoLocator {
        let source: Arc<dyn LocationSource> = match (request.coordinate, request.location_denied) {
            (Some(coordinate), _) => Arc::new(ReportedPosition::Fix(coordinate)),
            (None, true) => Arc::new(ReportedPosition::Denied),
            (None, false) => match (&self.provider, client_ip) {
                (Some(provider), Some(ip)) => Arc::new(provider.for_client(ip)),
                _ => Arc::new(ReportedPosition::Unsupported),
            },
        };

        GeoLocator::new(source, self.fallback, self.timeout)
    }
}

/// Everything the session endpoints of one feed need
pub struct FeedState<E: FeedEntity> {
    pub registry: SessionRegistry<E>,
    pub backend: Arc<dyn SearchBackend<E>>,
    pub location: LocationPolicy,
    pub options: DiscoveryOptions,
}

impl<E: FeedEntity> FeedState<E> {
    async fn session(&self, id: Uuid) -> Result<Arc<DiscoveryController<E>>, ApiError> {
        self.registry
            .get(&id)
            .await
            .ok_or(ApiError::SessionNotFound(id))
    }
}

/// Register the session endpoints of feed `E` under `/{feed}`
pub fn configure<E: FeedEntity>(cfg: &mut web::ServiceConfig, state: web::Data<FeedState<E>>) {
    cfg.service(
        web::scope(&format!("/{}", E::FEED.slug()))
            .app_data(state)
            .route("/sessions", web::post().to(mount::<E>))
            .route("/sessions/{id}", web::get().to(get_session::<E>))
            .route("/sessions/{id}", web::delete().to(close_session::<E>))
            .route("/sessions/{id}/search", web::post().to(search::<E>))
            .route("/sessions/{id}/clear", web::post().to(clear::<E>))
            .route("/sessions/{id}/toggle", web::post().to(toggle::<E>))
            .route("/sessions/{id}/radius", web::put().to(set_radius::<E>))
            .route("/sessions/{id}/more", web::post().to(load_more::<E>))
            .route("/sessions/{id}/retry", web::post().to(retry::<E>))
            .route("/sessions/{id}/dismiss", web::post().to(dismiss::<E>))
            .route("/sessions/{id}/selection", web::put().to(select::<E>)),
    );
}

async fn respond<E: FeedEntity>(
    id: Uuid,
    controller: &DiscoveryController<E>,
    outcome: Outcome,
) -> HttpResponse {
    HttpResponse::Ok().json(SessionResponse::new(id, &outcome, controller.snapshot().await))
}

/// Open a session and load its first page
///
/// POST /api/v1/{feed}/sessions
///
/// Request body:
/// ```json
/// {
///   "coordinate": { "latitude": 15.49, "longitude": 73.82 },
///   "locationDenied": false,
///   "radiusMeters": 5000
/// }
/// ```
async fn mount<E: FeedEntity>(
    state: web::Data<FeedState<E>>,
    http: HttpRequest,
    req: web::Json<MountRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let client_ip = http
        .connection_info()
        .realip_remote_addr()
        .and_then(parse_client_ip);
    if let Some(coordinate) = req.coordinate {
        coordinate.validated()?;
    }

    let controller = Arc::new(DiscoveryController::new(
        E::FEED,
        state.backend.clone(),
        state.location.locator_for(&req, client_ip),
        state.options,
    ));

    if let Some(radius) = req.radius_meters {
        if let Outcome::Ignored(rejection) = controller.set_radius(radius).await {
            tracing::info!("Keeping default radius for new {} session: {}", E::FEED, rejection);
        }
    }

    let id = state.registry.open(controller.clone()).await?;
    tracing::info!("Opened {} session {}", E::FEED, id);

    let outcome = controller.mount().await;
    let body = SessionResponse::new(id, &outcome, controller.snapshot().await);
    Ok(HttpResponse::Created().json(body))
}

async fn get_session<E: FeedEntity>(
    state: web::Data<FeedState<E>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let controller = state.session(id).await?;
    Ok(respond(id, &controller, Outcome::Applied).await)
}

async fn close_session<E: FeedEntity>(
    state: web::Data<FeedState<E>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    if !state.registry.close(&id).await {
        return Err(ApiError::SessionNotFound(id));
    }

    tracing::info!("Closed {} session {}", E::FEED, id);
    Ok(HttpResponse::NoContent().finish())
}

async fn search<E: FeedEntity>(
    state: web::Data<FeedState<E>>,
    path: web::Path<Uuid>,
    req: web::Json<SearchRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let id = path.into_inner();
    let controller = state.session(id).await?;

    let req = req.into_inner();
    let coordinate = req.coordinate.map(Coordinate::validated).transpose()?;
    let input = SearchInput {
        text: req.text,
        mode: req.mode,
        coordinate,
    };

    let outcome = controller.submit_search(input).await;
    Ok(respond(id, &controller, outcome).await)
}

async fn clear<E: FeedEntity>(
    state: web::Data<FeedState<E>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let controller = state.session(id).await?;
    let outcome = controller.clear_search().await;
    Ok(respond(id, &controller, outcome).await)
}

async fn toggle<E: FeedEntity>(
    state: web::Data<FeedState<E>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let controller = state.session(id).await?;
    let outcome = controller.toggle_mode().await;
    Ok(respond(id, &controller, outcome).await)
}

async fn set_radius<E: FeedEntity>(
    state: web::Data<FeedState<E>>,
    path: web::Path<Uuid>,
    req: web::Json<RadiusRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let id = path.into_inner();
    let controller = state.session(id).await?;
    let outcome = controller.set_radius(req.radius_meters).await;
    Ok(respond(id, &controller, outcome).await)
}

async fn load_more<E: FeedEntity>(
    state: web::Data<FeedState<E>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let controller = state.session(id).await?;
    let outcome = controller.load_more().await;
    Ok(respond(id, &controller, outcome).await)
}

async fn retry<E: FeedEntity>(
    state: web::Data<FeedState<E>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let controller = state.session(id).await?;
    let outcome = controller.retry().await;
    Ok(respond(id, &controller, outcome).await)
}

async fn dismiss<E: FeedEntity>(
    state: web::Data<FeedState<E>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let controller = state.session(id).await?;
    let outcome = controller.dismiss_error().await;
    Ok(respond(id, &controller, outcome).await)
}

async fn select<E: FeedEntity>(
    state: web::Data<FeedState<E>>,
    path: web::Path<Uuid>,
    req: web::Json<SelectRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    let id = path.into_inner();
    let controller = state.session(id).await?;
    let outcome = controller.select(req.into_inner().entity_id).await;
    Ok(respond(id, &controller, outcome).await)
}
