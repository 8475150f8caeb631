use serde::Serialize;

use crate::core::outcome::{Outcome, Rejection};
use crate::core::page_cache::PageCache;
use crate::core::query::{Intent, QueryBuilder};
use crate::core::selection::Selection;
use crate::models::{Coordinate, Cursor, DiscoveryRequest, Entity, ResultPage, SearchMode};
use crate::services::SearchError;

/// Lifecycle phase of a discovery session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "message")]
pub enum Phase {
    Idle,
    LocatingDevice,
    /// Fetching a fresh first page; replaces the result set on success
    Fetching,
    /// Fetching the next page; appended on success
    FetchingMore,
    Ready,
    Error(String),
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::LocatingDevice => "locating_device",
            Phase::Fetching => "fetching",
            Phase::FetchingMore => "fetching_more",
            Phase::Ready => "ready",
            Phase::Error(_) => "error",
        }
    }

    pub fn is_fetching(&self) -> bool {
        matches!(self, Phase::Fetching | Phase::FetchingMore)
    }
}

/// Whether a fetch starts a new result set or continues the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Reset,
    Append,
}

/// An issued request, tagged with the sequence number it was issued under
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub seq: u64,
    pub kind: FetchKind,
    pub request: DiscoveryRequest,
}

/// Search box contents at submit time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchInput {
    pub text: String,
    /// `None` keeps the session's current mode
    pub mode: Option<SearchMode>,
    /// Point picked on the map; becomes the last known coordinate
    pub coordinate: Option<Coordinate>,
}

impl SearchInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn global(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: Some(SearchMode::Global),
            coordinate: None,
        }
    }

    pub fn nearby(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mode: Some(SearchMode::Nearby),
            coordinate: None,
        }
    }

    pub fn at(mut self, coordinate: Coordinate) -> Self {
        self.coordinate = Some(coordinate);
        self
    }
}

/// Accepted radius range in meters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadiusBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for RadiusBounds {
    fn default() -> Self {
        Self {
            min: 100,
            max: 100_000,
        }
    }
}

/// Live state of one discovery feed
///
/// Transitions come in pairs: a `begin_*` method validates the operation,
/// updates the state and hands out a [`Ticket`]; [`complete`](Self::complete)
/// merges the response for that ticket. Every ticket bumps the sequence
/// number, so a response for anything but the latest ticket is dropped.
#[derive(Debug, Clone)]
pub struct DiscoverySession<E> {
    mode: SearchMode,
    query_text: String,
    radius_meters: u32,
    radius_bounds: RadiusBounds,
    origin: Option<Coordinate>,
    cache: PageCache<E>,
    phase: Phase,
    seq: u64,
    last: Option<(FetchKind, DiscoveryRequest)>,
    selection: Selection,
}

impl<E: Entity> DiscoverySession<E> {
    pub fn new(radius_meters: u32, radius_bounds: RadiusBounds) -> Self {
        Self {
            mode: SearchMode::Nearby,
            query_text: String::new(),
            radius_meters: radius_meters.clamp(radius_bounds.min, radius_bounds.max),
            radius_bounds,
            origin: None,
            cache: PageCache::new(),
            phase: Phase::Idle,
            seq: 0,
            last: None,
            selection: Selection::default(),
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn radius_meters(&self) -> u32 {
        self.radius_meters
    }

    /// Last known coordinate (device fix or map pick)
    pub fn origin(&self) -> Option<Coordinate> {
        self.origin
    }

    pub fn items(&self) -> &[E] {
        self.cache.items()
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cache.cursor()
    }

    pub fn has_more(&self) -> bool {
        self.cache.has_more()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn selected(&self) -> Option<&str> {
        self.selection.selected()
    }

    /// Sequence number of the latest issued request
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn last_request(&self) -> Option<&DiscoveryRequest> {
        self.last.as_ref().map(|(_, request)| request)
    }

    pub fn begin_locating(&mut self) -> Result<(), Rejection> {
        if self.phase != Phase::Idle {
            return Err(Rejection::InvalidPhase(self.phase.name()));
        }
        self.phase = Phase::LocatingDevice;
        Ok(())
    }

    pub fn begin_initial(
        &mut self,
        builder: &QueryBuilder,
        coordinate: Coordinate,
    ) -> Result<Ticket, Rejection> {
        if self.phase != Phase::LocatingDevice {
            return Err(Rejection::InvalidPhase(self.phase.name()));
        }

        let request = builder.build(self, &Intent::Initial { coordinate })?;
        self.origin = Some(coordinate);
        self.mode = SearchMode::Nearby;
        Ok(self.issue(FetchKind::Reset, request))
    }

    pub fn begin_search(
        &mut self,
        builder: &QueryBuilder,
        input: &SearchInput,
    ) -> Result<Ticket, Rejection> {
        self.ensure_can_reset()?;

        let mode = input.mode.unwrap_or(self.mode);
        let request = builder.build(
            self,
            &Intent::Search {
                mode,
                text: &input.text,
                coordinate: input.coordinate,
            },
        )?;

        self.switch_mode(mode);
        self.query_text = request.query_text.clone();
        if request.coordinate.is_some() {
            self.origin = request.coordinate;
        }
        Ok(self.issue(FetchKind::Reset, request))
    }

    /// Back to an unfiltered Nearby search around the last known coordinate
    pub fn begin_clear(&mut self, builder: &QueryBuilder) -> Result<Ticket, Rejection> {
        self.ensure_can_reset()?;

        let request = builder.build(
            self,
            &Intent::Search {
                mode: SearchMode::Nearby,
                text: "",
                coordinate: None,
            },
        )?;

        self.switch_mode(SearchMode::Nearby);
        self.query_text.clear();
        Ok(self.issue(FetchKind::Reset, request))
    }

    /// Switch modes; returns `None` when toggling into Global with an empty
    /// query, which switches the mode without a fetch.
    pub fn begin_toggle(&mut self, builder: &QueryBuilder) -> Result<Option<Ticket>, Rejection> {
        self.ensure_can_reset()?;

        let target = self.mode.toggled();
        match builder.build(self, &Intent::ModeToggle) {
            Ok(request) => {
                self.switch_mode(target);
                Ok(Some(self.issue(FetchKind::Reset, request)))
            }
            Err(Rejection::EmptyGlobalQuery) => {
                self.switch_mode(target);
                // Outdated in-flight responses must not land in the new mode.
                self.seq += 1;
                self.phase = Phase::Ready;
                Ok(None)
            }
            Err(rejection) => Err(rejection),
        }
    }

    pub fn begin_load_more(&mut self, builder: &QueryBuilder) -> Result<Ticket, Rejection> {
        match self.phase {
            Phase::Ready => {}
            Phase::Fetching | Phase::FetchingMore | Phase::LocatingDevice => {
                return Err(Rejection::RequestInFlight)
            }
            _ => return Err(Rejection::InvalidPhase(self.phase.name())),
        }

        let request = builder.build(self, &Intent::LoadMore)?;
        Ok(self.issue(FetchKind::Append, request))
    }

    /// Re-issue the last request unchanged
    pub fn begin_retry(&mut self) -> Result<Ticket, Rejection> {
        if !matches!(self.phase, Phase::Error(_)) {
            return Err(Rejection::InvalidPhase(self.phase.name()));
        }

        let (kind, request) = self.last.clone().ok_or(Rejection::NothingToRetry)?;
        Ok(self.issue(kind, request))
    }

    /// Takes effect on the next submit; never fetches by itself
    pub fn set_radius(&mut self, radius_meters: u32) -> Result<(), Rejection> {
        if self.mode != SearchMode::Nearby {
            return Err(Rejection::NearbyOnly);
        }

        let RadiusBounds { min, max } = self.radius_bounds;
        if !(min..=max).contains(&radius_meters) {
            return Err(Rejection::RadiusOutOfRange {
                radius: radius_meters,
                min,
                max,
            });
        }

        self.radius_meters = radius_meters;
        Ok(())
    }

    /// Hide the error indicator, keeping the displayed items
    pub fn dismiss_error(&mut self) -> Result<(), Rejection> {
        if !matches!(self.phase, Phase::Error(_)) {
            return Err(Rejection::InvalidPhase(self.phase.name()));
        }
        self.phase = Phase::Ready;
        Ok(())
    }

    pub fn select(&mut self, entity_id: Option<String>) {
        self.selection.select(entity_id);
    }

    /// Merge the response for `ticket`
    pub fn complete(
        &mut self,
        ticket: &Ticket,
        result: Result<ResultPage<E>, SearchError>,
    ) -> Outcome {
        if ticket.seq != self.seq {
            tracing::trace!(
                "Dropping superseded response (seq {} < {})",
                ticket.seq,
                self.seq
            );
            return Outcome::Superseded;
        }

        match result {
            Ok(mut page) => {
                let origin = ticket.request.coordinate;
                for item in &mut page.items {
                    item.core_mut().normalize(origin);
                }

                match ticket.kind {
                    FetchKind::Reset => {
                        self.cache.replace(page);
                        let cache = &self.cache;
                        self.selection.retain(|id| cache.contains(id));
                    }
                    FetchKind::Append => {
                        let added = self.cache.append(page);
                        tracing::debug!("Appended {} new items ({} total)", added, self.cache.len());
                    }
                }

                self.phase = Phase::Ready;
                Outcome::Applied
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(
                    "Discovery fetch failed, keeping {} items: {}",
                    self.cache.len(),
                    message
                );
                self.phase = Phase::Error(message.clone());
                Outcome::Failed(message)
            }
        }
    }

    fn ensure_can_reset(&self) -> Result<(), Rejection> {
        match self.phase {
            Phase::Ready | Phase::Error(_) | Phase::Fetching | Phase::FetchingMore => Ok(()),
            Phase::Idle | Phase::LocatingDevice => Err(Rejection::InvalidPhase(self.phase.name())),
        }
    }

    /// A mode change invalidates the result set; a new query in the same mode
    /// keeps items on screen until the replacement arrives.
    fn switch_mode(&mut self, mode: SearchMode) {
        if mode != self.mode {
            self.cache.clear();
            self.selection.select(None);
            self.mode = mode;
        } else {
            self.cache.drop_cursor();
        }
    }

    fn issue(&mut self, kind: FetchKind, request: DiscoveryRequest) -> Ticket {
        self.seq += 1;
        self.phase = match kind {
            FetchKind::Reset => Phase::Fetching,
            FetchKind::Append => Phase::FetchingMore,
        };
        self.last = Some((kind, request.clone()));

        tracing::debug!(
            "Issuing {:?} request #{} (mode: {:?}, text: {:?})",
            kind,
            self.seq,
            request.mode(),
            request.query_text
        );

        Ticket {
            seq: self.seq,
            kind,
            request,
        }
    }
}
