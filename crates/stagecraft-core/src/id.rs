//! Strongly-typed identifiers for interfaces, stages, states and segments.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::interface::Cursor;

/// Identifies an [`Interface`](crate::Interface) within an
/// [`Interfaces`](crate::Interfaces) table.
///
/// A handle, not an owner: stages keep `InterfaceId`s for their own
/// queues and for their neighbors' queues, while the table owned by the
/// enclosing hierarchy holds the data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(pub u32);

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for InterfaceId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Counter for unique [`StageId`] allocation.
static STAGE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique per-instance identifier for a stage.
///
/// Allocated from a monotonic atomic counter via [`StageId::next`].
/// Two stages never share an ID within a process, even when they carry
/// the same name, so a [`SegmentId`] always names exactly one owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(u64);

impl StageId {
    /// Allocate a fresh, unique stage ID. Thread-safe.
    pub fn next() -> Self {
        Self(STAGE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addresses one [`InterfaceState`](crate::InterfaceState).
///
/// Interfaces never remove or reorder elements, so a `StateId` stays
/// valid for the lifetime of its table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId {
    /// The interface holding the state.
    pub interface: InterfaceId,
    /// Position of the state within that interface.
    pub position: Cursor,
}

impl StateId {
    /// Build a state ID from its parts.
    pub fn new(interface: InterfaceId, position: Cursor) -> Self {
        Self {
            interface,
            position,
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.interface, self.position)
    }
}

/// Addresses one [`SolutionSegment`](crate::SolutionSegment) in the
/// segment list of the stage that created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId {
    /// The owning stage.
    pub stage: StageId,
    /// Index into the owner's segment list.
    pub index: u32,
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.stage, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_ids_are_unique() {
        let a = StageId::next();
        let b = StageId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn display_formats() {
        let state = StateId::new(InterfaceId(3), Cursor::BEGIN.next());
        assert_eq!(state.to_string(), "3:1");
        let stage = StageId::next();
        let seg = SegmentId { stage, index: 7 };
        assert_eq!(seg.to_string(), format!("{stage}#7"));
    }
}
