//! [`SolutionSegment`]: a computed transition between two states.

use crate::id::{SegmentId, StateId};

/// A transition (or zero-length seed) recorded by the stage that
/// computed it.
///
/// Regular segments link a `start` and an `end` state. Generator seeds
/// come in mirrored pairs where each half has exactly one endpoint set
/// and points at the other half through [`paired`](Self::paired).
/// Failed attempts may be recorded for diagnostics; they carry a
/// failure reason and no transition payload.
#[derive(Clone, Debug, PartialEq)]
pub struct SolutionSegment<T> {
    id: SegmentId,
    start: Option<StateId>,
    end: Option<StateId>,
    transition: Option<T>,
    cost: f64,
    failure: Option<String>,
    paired: Option<SegmentId>,
}

impl<T> SolutionSegment<T> {
    /// A successful transition from `start` to `end`.
    pub fn transition(
        id: SegmentId,
        start: StateId,
        end: StateId,
        transition: Option<T>,
        cost: f64,
    ) -> Self {
        Self {
            id,
            start: Some(start),
            end: Some(end),
            transition,
            cost,
            failure: None,
            paired: None,
        }
    }

    /// One half of a generator seed.
    pub fn seed(
        id: SegmentId,
        start: Option<StateId>,
        end: Option<StateId>,
        cost: f64,
        paired: Option<SegmentId>,
    ) -> Self {
        Self {
            id,
            start,
            end,
            transition: None,
            cost,
            failure: None,
            paired,
        }
    }

    /// A failed attempt, kept for diagnostics.
    pub fn failed(
        id: SegmentId,
        start: Option<StateId>,
        end: Option<StateId>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id,
            start,
            end,
            transition: None,
            cost: f64::INFINITY,
            failure: Some(reason.into()),
            paired: None,
        }
    }

    /// This segment's identifier.
    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// State the transition starts from.
    pub fn start(&self) -> Option<StateId> {
        self.start
    }

    /// State the transition ends in.
    pub fn end(&self) -> Option<StateId> {
        self.end
    }

    /// Domain payload, absent for seeds and failures.
    pub fn transition_payload(&self) -> Option<&T> {
        self.transition.as_ref()
    }

    /// Cost of this segment alone. Infinite for failures.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Why the attempt failed, if it did.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Returns `true` for recorded failures.
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Returns `true` for generator seed halves.
    pub fn is_seed(&self) -> bool {
        !self.is_failed()
            && self.transition.is_none()
            && (self.start.is_none() != self.end.is_none())
    }

    /// The mirrored half of a generator seed.
    pub fn paired(&self) -> Option<SegmentId> {
        self.paired
    }
}
