use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use roam_discovery::config::Settings;
use roam_discovery::models::{Activity, Attraction, EmergencyService, FeedEntity, Hotel, Shop, Traveler};
use roam_discovery::routes::{self, AppState, FeedState, LocationPolicy};
use roam_discovery::services::{HttpSearchBackend, IpLocationSource, SessionRegistry};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle path parameter errors (malformed session ids)
pub fn handle_path_error(err: error::PathError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("Path error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path: {}", err),
        status_code: 400,
    }
    .into()
}

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn feed_state<E: FeedEntity>(
    settings: &Settings,
    location: &LocationPolicy,
) -> std::io::Result<web::Data<FeedState<E>>> {
    let path = settings.feeds.path(E::FEED);
    let backend = HttpSearchBackend::<E>::new(
        settings.backend.base_url.as_str(),
        path,
        settings.backend.api_key.clone(),
        settings.backend.timeout(),
    )
    .map_err(|e| io_error("Failed to build search client", e))?;

    info!("Feed {} -> {}/{}", E::FEED, settings.backend.base_url, path);

    Ok(web::Data::new(FeedState {
        registry: SessionRegistry::new(settings.discovery.max_sessions, settings.discovery.session_idle()),
        backend: Arc::new(backend),
        location: location.clone(),
        options: settings.discovery.options(),
    }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_logging(&settings.logging.level, &settings.logging.format);
    info!("Starting Roam discovery service...");

    let fallback = settings
        .location
        .fallback()
        .map_err(|e| io_error("Invalid fallback coordinate", e))?;

    let provider: Option<Arc<IpLocationSource>> = match &settings.location.provider_url {
        Some(url) => match IpLocationSource::new(url.as_str(), settings.location.timeout()) {
            Ok(source) => {
                info!("Client IP geolocation enabled via {}", url);
                Some(Arc::new(source))
            }
            Err(e) => {
                warn!("IP geolocation disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let location = LocationPolicy {
        fallback,
        timeout: settings.location.timeout(),
        provider,
    };

    let state = AppState {
        travelers: feed_state::<Traveler>(&settings, &location)?,
        hotels: feed_state::<Hotel>(&settings, &location)?,
        attractions: feed_state::<Attraction>(&settings, &location)?,
        shopping: feed_state::<Shop>(&settings, &location)?,
        emergency: feed_state::<EmergencyService>(&settings, &location)?,
        activities: feed_state::<Activity>(&settings, &location)?,
    };

    info!(
        "Discovery configured (page size: {}, default radius: {}m)",
        settings.discovery.page_size, settings.discovery.default_radius_meters
    );

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();
        let state = state.clone();

        App::new()
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(move |cfg| routes::configure_routes(cfg, &state))
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
