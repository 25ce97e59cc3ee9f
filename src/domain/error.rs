//! Route error taxonomy
//!
//! None of these are fatal: every failure degrades to a status message
//! and leaves the displayed routes untouched. Missing registry sites are
//! not an error at all; the geometry mapper drops them.

/// Errors from validating, dispatching or decoding a route request
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    /// Submit was attempted before both ends were chosen.
    #[error("select both a start and a destination")]
    InvalidSelection,

    /// Transport failure, timeout, or non-success HTTP status.
    #[error("routing service unavailable: {0}")]
    RouteServiceUnavailable(String),

    /// The service answered with a body we could not use.
    #[error("unexpected routing service response: {0}")]
    RouteServiceProtocolError(String),

    /// The journey was restarted while the request was in flight.
    #[error("route request aborted by a new journey")]
    Aborted,
}

impl RouteError {
    /// Short classification for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            RouteError::InvalidSelection => "invalid_selection",
            RouteError::RouteServiceUnavailable(_) => "unavailable",
            RouteError::RouteServiceProtocolError(_) => "protocol",
            RouteError::Aborted => "aborted",
        }
    }
}
