use thiserror::Error;

/// Local precondition violations
///
/// These are rejected before any network call and leave the session
/// untouched; they are no-ops, not failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no further pages for the current query")]
    NoMoreResults,

    #[error("global search needs a non-empty query")]
    EmptyGlobalQuery,

    #[error("nearby search needs a known coordinate")]
    MissingCoordinate,

    #[error("a request is already in flight")]
    RequestInFlight,

    #[error("operation not allowed while {0}")]
    InvalidPhase(&'static str),

    #[error("radius {radius} m is outside [{min}, {max}] m")]
    RadiusOutOfRange { radius: u32, min: u32, max: u32 },

    #[error("radius only applies to nearby search")]
    NearbyOnly,

    #[error("no previous request to retry")]
    NothingToRetry,
}

/// Result of a controller operation
///
/// Remote failures surface here as `Failed` and in the session phase; they
/// never escape the controller as errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The state transition happened (and its fetch, if any, was merged)
    Applied,
    /// Rejected locally with no state change
    Ignored(Rejection),
    /// The response arrived after a newer request and was dropped
    Superseded,
    /// The fetch failed; the session is now in the error phase
    Failed(String),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Applied => "applied",
            Outcome::Ignored(_) => "ignored",
            Outcome::Superseded => "superseded",
            Outcome::Failed(_) => "failed",
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

impl From<Rejection> for Outcome {
    fn from(rejection: Rejection) -> Self {
        Outcome::Ignored(rejection)
    }
}
