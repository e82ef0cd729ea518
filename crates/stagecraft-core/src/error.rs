//! Error types for the Stagecraft engine.
//!
//! Three classes, handled differently:
//!
//! - [`TopologyError`]: illegal wiring or reconfiguration. Raised during
//!   configuration, before the affected stage computes.
//! - [`LogicError`]: a caller broke a stage contract (e.g. fetching a state
//!   without checking readiness first). A driver bug.
//! - [`ExtensionFailure`]: a domain algorithm could not produce a result.
//!   Normal and frequent; stages absorb it and `compute()` reports `false`.
//!
//! [`StageError`] unites the first two for `compute()` return values.

use std::error::Error;
use std::fmt;

use crate::flags::InterfaceFlags;
use crate::id::InterfaceId;

/// Which neighbor queue of a stage an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueSide {
    /// The preceding stage's output queue.
    PrevOutput,
    /// The following stage's input queue.
    NextInput,
}

impl fmt::Display for QueueSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrevOutput => write!(f, "previous output"),
            Self::NextInput => write!(f, "next input"),
        }
    }
}

/// Illegal pipeline topology or reconfiguration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopologyError {
    /// The stage is already wired to a neighbor and cannot be reconfigured.
    AlreadyConnected {
        /// Name of the stage.
        stage: String,
    },
    /// Wiring would give the stage a capability it did not announce.
    UndeclaredWrite {
        /// Name of the stage.
        stage: String,
        /// The flag missing from the announced set.
        flag: InterfaceFlags,
    },
    /// A propagation needs a neighbor queue that was never wired.
    NotWired {
        /// Name of the stage.
        stage: String,
        /// The missing neighbor queue.
        side: QueueSide,
    },
    /// An interface handle does not belong to the table it was used with.
    UnknownInterface(InterfaceId),
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyConnected { stage } => {
                write!(f, "stage '{stage}' cannot be reconfigured after being connected")
            }
            Self::UndeclaredWrite { stage, flag } => {
                write!(f, "stage '{stage}' does not announce {flag:?}")
            }
            Self::NotWired { stage, side } => {
                write!(f, "stage '{stage}' has no {side} queue wired")
            }
            Self::UnknownInterface(id) => write!(f, "unknown interface {id}"),
        }
    }
}

impl Error for TopologyError {}

/// Violation of a stage's calling contract.
#[derive(Clone, Debug, PartialEq)]
pub enum LogicError {
    /// `fetch_start_state()` called while `has_start_state()` is false.
    NoStartState {
        /// Name of the stage.
        stage: String,
    },
    /// `fetch_end_state()` called while `has_end_state()` is false.
    NoEndState {
        /// Name of the stage.
        stage: String,
    },
    /// `fetch_state_pair()` called while `has_state_pair()` is false.
    NoStatePair {
        /// Name of the stage.
        stage: String,
    },
    /// A caller-supplied cost is NaN, infinite, or negative.
    InvalidCost {
        /// Name of the stage.
        stage: String,
        /// The rejected cost.
        cost: f64,
    },
}

impl fmt::Display for LogicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoStartState { stage } => {
                write!(f, "stage '{stage}': no new state for beginning available")
            }
            Self::NoEndState { stage } => {
                write!(f, "stage '{stage}': no new state for ending available")
            }
            Self::NoStatePair { stage } => {
                write!(f, "stage '{stage}': no new state pair available")
            }
            Self::InvalidCost { stage, cost } => {
                write!(
                    f,
                    "stage '{stage}': cost must be finite and non-negative, got {cost}"
                )
            }
        }
    }
}

impl Error for LogicError {}

/// A domain extension could not produce a result for its input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionFailure {
    reason: String,
}

impl ExtensionFailure {
    /// Failure with a free-form reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// The extension reported a NaN, infinite, or negative cost.
    pub fn invalid_cost(cost: f64) -> Self {
        Self::new(format!("invalid cost {cost}"))
    }

    /// The extension reported a cost above the stage's limit.
    pub fn cost_limit_exceeded(cost: f64, limit: f64) -> Self {
        Self::new(format!("cost {cost} exceeds limit {limit}"))
    }

    /// Human-readable description.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for ExtensionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "extension failed: {}", self.reason)
    }
}

impl Error for ExtensionFailure {}

/// Errors surfaced by `Stage::compute()` and the manual stage API.
#[derive(Clone, Debug, PartialEq)]
pub enum StageError {
    /// Wiring or configuration problem.
    Topology(TopologyError),
    /// Contract violation by the caller.
    Logic(LogicError),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Topology(e) => write!(f, "topology: {e}"),
            Self::Logic(e) => write!(f, "logic: {e}"),
        }
    }
}

impl Error for StageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Topology(e) => Some(e),
            Self::Logic(e) => Some(e),
        }
    }
}

impl From<TopologyError> for StageError {
    fn from(e: TopologyError) -> Self {
        Self::Topology(e)
    }
}

impl From<LogicError> for StageError {
    fn from(e: LogicError) -> Self {
        Self::Logic(e)
    }
}
