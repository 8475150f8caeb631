use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::outcome::{Outcome, Rejection};
use crate::core::query::QueryBuilder;
use crate::core::session::{DiscoverySession, Phase, RadiusBounds, SearchInput, Ticket};
use crate::models::{Coordinate, Entity, FeedKind, SearchMode};
use crate::services::{GeoLocator, SearchBackend, SearchError};

/// Tunables shared by every session of a feed
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryOptions {
    pub page_size: u32,
    pub default_radius_meters: u32,
    pub radius_bounds: RadiusBounds,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            page_size: 20,
            default_radius_meters: 5_000,
            radius_bounds: RadiusBounds::default(),
        }
    }
}

/// Point-in-time copy of a session for rendering
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot<E> {
    pub feed: FeedKind,
    pub mode: SearchMode,
    pub query_text: String,
    pub radius_meters: u32,
    pub origin: Option<Coordinate>,
    pub items: Vec<E>,
    pub has_more: bool,
    pub phase: Phase,
    pub selected_id: Option<String>,
}

/// Drives one discovery feed session
///
/// The session lock is only held while a transition is applied, never across
/// the network call, so a newer search can be issued while an older one is
/// still in flight. The older response is then discarded on arrival.
pub struct DiscoveryController<E: Entity> {
    feed: FeedKind,
    session: Arc<Mutex<DiscoverySession<E>>>,
    backend: Arc<dyn SearchBackend<E>>,
    locator: GeoLocator,
    builder: QueryBuilder,
}

impl<E: Entity> DiscoveryController<E> {
    pub fn new(
        feed: FeedKind,
        backend: Arc<dyn SearchBackend<E>>,
        locator: GeoLocator,
        options: DiscoveryOptions,
    ) -> Self {
        Self {
            feed,
            session: Arc::new(Mutex::new(DiscoverySession::new(
                options.default_radius_meters,
                options.radius_bounds,
            ))),
            backend,
            locator,
            builder: QueryBuilder::new(options.page_size),
        }
    }

    pub fn feed(&self) -> FeedKind {
        self.feed
    }

    /// Locate the device and load the first Nearby page
    pub async fn mount(&self) -> Outcome {
        if let Err(rejection) = self.session.lock().await.begin_locating() {
            return rejection.into();
        }

        let feed = self.feed;
        let session = self.session.clone();
        let backend = self.backend.clone();
        let locator = self.locator.clone();
        let builder = self.builder;

        let task = tokio::spawn(async move {
            let coordinate = locator.acquire().await;
            tracing::info!(
                "Mounting {} feed at {:.4},{:.4}",
                feed,
                coordinate.latitude,
                coordinate.longitude
            );

            let ticket = session.lock().await.begin_initial(&builder, coordinate);
            match ticket {
                Ok(ticket) => Ok(complete_with(session, backend, ticket).await),
                Err(rejection) => Err(rejection),
            }
        });

        match task.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(rejection)) => rejection.into(),
            Err(e) => {
                tracing::error!("{} feed mount task failed: {}", self.feed, e);
                Outcome::Failed(format!("mount task failed: {}", e))
            }
        }
    }

    /// Submit the search box; an empty Global query is a no-op
    pub async fn submit_search(&self, input: SearchInput) -> Outcome {
        let ticket = self.session.lock().await.begin_search(&self.builder, &input);
        self.dispatch(ticket).await
    }

    pub async fn clear_search(&self) -> Outcome {
        let ticket = self.session.lock().await.begin_clear(&self.builder);
        self.dispatch(ticket).await
    }

    pub async fn toggle_mode(&self) -> Outcome {
        let ticket = self.session.lock().await.begin_toggle(&self.builder);
        match ticket {
            Ok(Some(ticket)) => self.fetch(ticket).await,
            Ok(None) => Outcome::Applied,
            Err(rejection) => rejection.into(),
        }
    }

    /// Store a new radius for the next submit without fetching
    pub async fn set_radius(&self, radius_meters: u32) -> Outcome {
        match self.session.lock().await.set_radius(radius_meters) {
            Ok(()) => Outcome::Applied,
            Err(rejection) => rejection.into(),
        }
    }

    pub async fn load_more(&self) -> Outcome {
        let ticket = self.session.lock().await.begin_load_more(&self.builder);
        self.dispatch(ticket).await
    }

    pub async fn retry(&self) -> Outcome {
        let ticket = self.session.lock().await.begin_retry();
        self.dispatch(ticket).await
    }

    pub async fn dismiss_error(&self) -> Outcome {
        match self.session.lock().await.dismiss_error() {
            Ok(()) => Outcome::Applied,
            Err(rejection) => rejection.into(),
        }
    }

    pub async fn select(&self, entity_id: Option<String>) -> Outcome {
        self.session.lock().await.select(entity_id);
        Outcome::Applied
    }

    /// Run `f` against the current session state
    pub async fn inspect<R>(&self, f: impl FnOnce(&DiscoverySession<E>) -> R) -> R {
        f(&*self.session.lock().await)
    }

    pub async fn snapshot(&self) -> SessionSnapshot<E> {
        let session = self.session.lock().await;
        SessionSnapshot {
            feed: self.feed,
            mode: session.mode(),
            query_text: session.query_text().to_string(),
            radius_meters: session.radius_meters(),
            origin: session.origin(),
            items: session.items().to_vec(),
            has_more: session.has_more(),
            phase: session.phase().clone(),
            selected_id: session.selected().map(str::to_string),
        }
    }

    async fn dispatch(&self, ticket: Result<Ticket, Rejection>) -> Outcome {
        match ticket {
            Ok(ticket) => self.fetch(ticket).await,
            Err(rejection) => {
                tracing::debug!("{} feed ignored operation: {}", self.feed, rejection);
                rejection.into()
            }
        }
    }

    /// Run the request on its own task so the response is merged even when
    /// the caller goes away mid-flight.
    async fn fetch(&self, ticket: Ticket) -> Outcome {
        let session = self.session.clone();
        let backend = self.backend.clone();
        let pending = ticket.clone();

        let task = tokio::spawn(complete_with(session, backend, ticket));

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("{} feed search task failed: {}", self.feed, e);
                let failure = SearchError::InvalidResponse(format!("search task failed: {}", e));
                self.session.lock().await.complete(&pending, Err(failure))
            }
        }
    }
}

async fn complete_with<E: Entity>(
    session: Arc<Mutex<DiscoverySession<E>>>,
    backend: Arc<dyn SearchBackend<E>>,
    ticket: Ticket,
) -> Outcome {
    let result = backend.search(&ticket.request).await;
    session.lock().await.complete(&ticket, result)
}
