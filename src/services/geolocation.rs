use async_trait::async_trait;
use reqwest::Client;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Coordinate, CoordinateError};

/// Default coordinate used whenever the device cannot be located
pub const FALLBACK_COORDINATE: Coordinate = Coordinate {
    latitude: 20.5937,
    longitude: 78.9629,
};

/// Errors a location source can report
///
/// None of these escape [`GeoLocator::acquire`]; they only decide whether the
/// fallback coordinate is used.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("no location capability available")]
    Unavailable,

    #[error("location request timed out")]
    Timeout,

    #[error("location provider failed: {0}")]
    Provider(String),

    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordinateError),
}

/// Platform location capability (`getCurrentPosition` semantics)
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_position(&self) -> Result<Coordinate, LocationError>;
}

/// What the client device reported when the feed was opened
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportedPosition {
    Fix(Coordinate),
    Denied,
    Unsupported,
}

#[async_trait]
impl LocationSource for ReportedPosition {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        match self {
            ReportedPosition::Fix(coordinate) => Ok(*coordinate),
            ReportedPosition::Denied => Err(LocationError::PermissionDenied),
            ReportedPosition::Unsupported => Err(LocationError::Unavailable),
        }
    }
}

/// Approximate location from an IP geolocation endpoint
///
/// `url` must contain an `{ip}` placeholder that is replaced with the client
/// address, e.g. `https://ipapi.co/{ip}/json`. Expects a JSON body with
/// `lat`/`latitude` and `lng`/`lon`/`longitude`.
pub struct IpLocationSource {
    url: String,
    client: Client,
}

impl IpLocationSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LocationError> {
        let url = url.into();
        if !url.contains("{ip}") {
            return Err(LocationError::Provider(format!(
                "provider url {} has no {{ip}} placeholder",
                url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LocationError::Provider(e.to_string()))?;

        Ok(Self { url, client })
    }

    pub fn url_for(&self, ip: IpAddr) -> String {
        self.url.replace("{ip}", &ip.to_string())
    }

    /// Look up the position of `ip`
    pub async fn locate(&self, ip: IpAddr) -> Result<Coordinate, LocationError> {
        let response = self
            .client
            .get(self.url_for(ip))
            .send()
            .await
            .map_err(|e| LocationError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LocationError::Provider(format!(
                "lookup returned {}",
                response.status()
            )));
        }

        let coordinate: Coordinate = response
            .json()
            .await
            .map_err(|e| LocationError::Provider(e.to_string()))?;

        Ok(coordinate.validated()?)
    }

    /// Source that locates one client by its address
    pub fn for_client(self: &Arc<Self>, ip: IpAddr) -> ClientIpLocation {
        ClientIpLocation {
            provider: self.clone(),
            ip,
        }
    }
}

/// [`IpLocationSource`] bound to the address a session was opened from
pub struct ClientIpLocation {
    provider: Arc<IpLocationSource>,
    ip: IpAddr,
}

#[async_trait]
impl LocationSource for ClientIpLocation {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        // Private and loopback addresses would resolve to the server's network
        if !is_public(self.ip) {
            return Err(LocationError::Unavailable);
        }
        self.provider.locate(self.ip).await
    }
}

fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80)
        }
    }
}

/// Parse a peer address as reported by the HTTP layer (`ip` or `ip:port`)
pub fn parse_client_ip(addr: &str) -> Option<IpAddr> {
    addr.parse::<SocketAddr>()
        .map(|socket| socket.ip())
        .or_else(|_| addr.parse::<IpAddr>())
        .ok()
}

/// Acquires the caller's position, degrading to a fallback coordinate
///
/// One attempt per call, bounded by `timeout`. Always resolves.
#[derive(Clone)]
pub struct GeoLocator {
    source: Arc<dyn LocationSource>,
    fallback: Coordinate,
    timeout: Duration,
}

impl GeoLocator {
    pub fn new(source: Arc<dyn LocationSource>, fallback: Coordinate, timeout: Duration) -> Self {
        Self {
            source,
            fallback,
            timeout,
        }
    }

    /// Locator that reports what the device sent, with the default fallback
    pub fn reported(position: ReportedPosition) -> Self {
        Self::new(Arc::new(position), FALLBACK_COORDINATE, Duration::from_secs(10))
    }

    pub fn fallback(&self) -> Coordinate {
        self.fallback
    }

    pub async fn acquire(&self) -> Coordinate {
        let attempt = tokio::time::timeout(self.timeout, self.source.current_position()).await;

        let result = match attempt {
            Ok(result) => result.and_then(|c| c.validated().map_err(LocationError::from)),
            Err(_) => Err(LocationError::Timeout),
        };

        match result {
            Ok(coordinate) => coordinate,
            Err(e) => {
                tracing::warn!(
                    "Location unavailable ({}), falling back to {:.4},{:.4}",
                    e,
                    self.fallback.latitude,
                    self.fallback.longitude
                );
                self.fallback
            }
        }
    }
}
