use crate::core::outcome::Rejection;
use crate::core::session::DiscoverySession;
use crate::models::{Coordinate, DiscoveryRequest, Entity, SearchMode};

/// What the caller is trying to do when a request is derived
#[derive(Debug, Clone, PartialEq)]
pub enum Intent<'a> {
    /// First fetch after the device was located
    Initial { coordinate: Coordinate },
    /// Explicit submit; `coordinate` is set when the user picked a point on the map
    Search {
        mode: SearchMode,
        text: &'a str,
        coordinate: Option<Coordinate>,
    },
    /// Next page of the current query
    LoadMore,
    /// Switch to the other search mode
    ModeToggle,
}

/// Derives [`DiscoveryRequest`]s from session state
///
/// Pure: no I/O and no mutation, so every transition of the controller can be
/// checked without a backend.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    page_size: u32,
}

impl QueryBuilder {
    pub fn new(page_size: u32) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn build<E: Entity>(
        &self,
        session: &DiscoverySession<E>,
        intent: &Intent<'_>,
    ) -> Result<DiscoveryRequest, Rejection> {
        match intent {
            Intent::Initial { coordinate } => {
                Ok(self.nearby(*coordinate, session.radius_meters(), session.query_text()))
            }
            Intent::Search {
                mode,
                text,
                coordinate,
            } => match mode {
                SearchMode::Nearby => {
                    let center = coordinate
                        .or(session.origin())
                        .ok_or(Rejection::MissingCoordinate)?;
                    Ok(self.nearby(center, session.radius_meters(), text))
                }
                SearchMode::Global => self.global(text),
            },
            Intent::LoadMore => {
                let cursor = session.cursor().cloned().ok_or(Rejection::NoMoreResults)?;
                let mut request = match session.mode() {
                    SearchMode::Nearby => {
                        let center = session.origin().ok_or(Rejection::MissingCoordinate)?;
                        self.nearby(center, session.radius_meters(), session.query_text())
                    }
                    SearchMode::Global => self.global(session.query_text())?,
                };
                request.cursor = Some(cursor);
                Ok(request)
            }
            // Into Nearby reuses the last known coordinate rather than
            // locating the device again.
            Intent::ModeToggle => match session.mode().toggled() {
                SearchMode::Nearby => {
                    let center = session.origin().ok_or(Rejection::MissingCoordinate)?;
                    Ok(self.nearby(center, session.radius_meters(), session.query_text()))
                }
                SearchMode::Global => self.global(session.query_text()),
            },
        }
    }

    fn nearby(&self, coordinate: Coordinate, radius_meters: u32, text: &str) -> DiscoveryRequest {
        DiscoveryRequest {
            coordinate: Some(coordinate),
            radius_meters: Some(radius_meters),
            query_text: text.trim().to_string(),
            cursor: None,
            page_size: self.page_size,
        }
    }

    fn global(&self, text: &str) -> Result<DiscoveryRequest, Rejection> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Rejection::EmptyGlobalQuery);
        }

        Ok(DiscoveryRequest {
            coordinate: None,
            radius_meters: None,
            query_text: text.to_string(),
            cursor: None,
            page_size: self.page_size,
        })
    }
}
