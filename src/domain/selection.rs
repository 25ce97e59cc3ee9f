//! Journey selection state machine
//!
//! Tracks which end of the journey the user is picking and emits a
//! complete (start, target) pair once both ends are chosen:
//!
//! `Idle -> AwaitingStart -> AwaitingTarget -> Complete`
//!
//! `start_journey` resets to `AwaitingStart` from any phase. Site clicks
//! outside `AwaitingStart`/`AwaitingTarget` are ignored.

use crate::domain::site::Site;
use serde::Serialize;

/// Selection phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AwaitingStart,
    AwaitingTarget,
    Complete,
}

impl Phase {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::AwaitingStart => "awaiting_start",
            Phase::AwaitingTarget => "awaiting_target",
            Phase::Complete => "complete",
        }
    }

    /// Whether site clicks are accepted in this phase
    pub fn is_selecting(&self) -> bool {
        matches!(self, Phase::AwaitingStart | Phase::AwaitingTarget)
    }
}

/// Observable status message for the view layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Status {
    Idle,
    SelectStart,
    SelectTarget,
    ReadyToSubmit,
    SelectionIncomplete,
    Routing { paths: u32 },
    RoutesShown { alternates: usize },
    Failed(String),
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Idle => f.write_str("Press Start Journey to begin"),
            Status::SelectStart => f.write_str("Select a start site"),
            Status::SelectTarget => f.write_str("Select a destination site"),
            Status::ReadyToSubmit => f.write_str("Ready to submit"),
            Status::SelectionIncomplete => f.write_str("Select both a start and a destination"),
            Status::Routing { paths: 1 } => f.write_str("Finding route..."),
            Status::Routing { paths } => write!(f, "Finding {paths} routes..."),
            Status::RoutesShown { alternates: 0 } => f.write_str("Route shown"),
            Status::RoutesShown { alternates } => {
                write!(f, "Route shown with {alternates} alternate(s)")
            }
            Status::Failed(reason) => write!(f, "Route request failed: {reason}"),
        }
    }
}

/// Current start/target choice for one journey
#[derive(Debug, Clone)]
pub struct Selection {
    start: Option<Site>,
    target: Option<Site>,
    phase: Phase,
    status: Status,
}

impl Selection {
    pub fn new() -> Self {
        Self { start: None, target: None, phase: Phase::Idle, status: Status::Idle }
    }

    /// Begin a new journey, discarding any previous pair
    pub fn start_journey(&mut self) {
        self.start = None;
        self.target = None;
        self.phase = Phase::AwaitingStart;
        self.status = Status::SelectStart;
    }

    /// Apply a site click. Returns true if the click changed the selection.
    ///
    /// Choosing the start site again as the target is accepted.
    ///
    /// ```
    /// use scats_journey::domain::selection::{Phase, Selection};
    /// use scats_journey::domain::site::Site;
    ///
    /// let mut selection = Selection::new();
    /// assert!(!selection.click_site(&Site::new("970", -37.8657, 145.0928)));
    ///
    /// selection.start_journey();
    /// assert!(selection.click_site(&Site::new("970", -37.8657, 145.0928)));
    /// assert_eq!(selection.phase(), Phase::AwaitingTarget);
    /// ```
    pub fn click_site(&mut self, site: &Site) -> bool {
        match self.phase {
            Phase::AwaitingStart => {
                self.start = Some(site.clone());
                self.phase = Phase::AwaitingTarget;
                self.status = Status::SelectTarget;
                true
            }
            Phase::AwaitingTarget => {
                self.target = Some(site.clone());
                self.phase = Phase::Complete;
                self.status = Status::ReadyToSubmit;
                true
            }
            Phase::Idle | Phase::Complete => false,
        }
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn start(&self) -> Option<&Site> {
        self.start.as_ref()
    }

    pub fn target(&self) -> Option<&Site> {
        self.target.as_ref()
    }

    /// The chosen pair, once the selection is complete
    pub fn pair(&self) -> Option<(&Site, &Site)> {
        match (self.phase, &self.start, &self.target) {
            (Phase::Complete, Some(start), Some(target)) => Some((start, target)),
            _ => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.pair().is_some()
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}
