//! [`InterfaceState`] snapshots and their selection [`Priority`].

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::id::SegmentId;

/// Selection priority of an [`InterfaceState`].
///
/// `depth` counts the segments of the partial solution that led to the
/// state; `cost` is their accumulated cost. Ordering prefers deeper
/// states, then cheaper ones: `a < b` means `a` should be picked first.
#[derive(Clone, Copy, Debug)]
pub struct Priority {
    depth: u32,
    cost: f64,
}

impl Priority {
    /// Build a priority from its parts.
    pub fn new(depth: u32, cost: f64) -> Self {
        Self { depth, cost }
    }

    /// Priority of a freshly spawned seed state.
    pub fn seed(cost: f64) -> Self {
        Self { depth: 0, cost }
    }

    /// Priority of a state reached from `self` through one more segment.
    pub fn extend(self, cost: f64) -> Self {
        Self {
            depth: self.depth.saturating_add(1),
            cost: self.cost + cost,
        }
    }

    /// Number of segments leading to the state.
    pub fn depth(self) -> u32 {
        self.depth
    }

    /// Accumulated cost.
    pub fn cost(self) -> f64 {
        self.cost
    }
}

impl PartialEq for Priority {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Priority {}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .depth
            .cmp(&self.depth)
            .then_with(|| self.cost.total_cmp(&other.cost))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "depth {} cost {}", self.depth, self.cost)
    }
}

/// An immutable world configuration queued between two stages.
///
/// The world payload is opaque to the engine and shared through an
/// [`Arc`]; two states carry the same world iff they point at the same
/// allocation (see [`same_world`](Self::same_world)).
///
/// Back-references name the segment whose `end` is this state
/// (`incoming`) and the segment whose `start` is this state (`outgoing`).
/// Both are fixed before the state is appended to an interface.
pub struct InterfaceState<W> {
    world: Arc<W>,
    priority: Priority,
    incoming: Option<SegmentId>,
    outgoing: Option<SegmentId>,
}

impl<W> InterfaceState<W> {
    /// Create a state with no segment back-references.
    pub fn new(world: Arc<W>, priority: Priority) -> Self {
        Self {
            world,
            priority,
            incoming: None,
            outgoing: None,
        }
    }

    /// Set the segment that produced this state.
    pub fn with_incoming(mut self, segment: SegmentId) -> Self {
        self.incoming = Some(segment);
        self
    }

    /// Set the segment that continues from this state.
    pub fn with_outgoing(mut self, segment: SegmentId) -> Self {
        self.outgoing = Some(segment);
        self
    }

    /// The world payload.
    pub fn world(&self) -> &Arc<W> {
        &self.world
    }

    /// Selection priority.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Accumulated cost, shorthand for `priority().cost()`.
    pub fn cost(&self) -> f64 {
        self.priority.cost
    }

    /// Segment whose `end` is this state.
    pub fn incoming(&self) -> Option<SegmentId> {
        self.incoming
    }

    /// Segment whose `start` is this state.
    pub fn outgoing(&self) -> Option<SegmentId> {
        self.outgoing
    }

    /// True if both states hold the very same world allocation.
    pub fn same_world(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.world, &other.world)
    }
}

impl<W> Clone for InterfaceState<W> {
    fn clone(&self) -> Self {
        Self {
            world: Arc::clone(&self.world),
            priority: self.priority,
            incoming: self.incoming,
            outgoing: self.outgoing,
        }
    }
}

impl<W: fmt::Debug> fmt::Debug for InterfaceState<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceState")
            .field("world", &self.world)
            .field("priority", &self.priority)
            .field("incoming", &self.incoming)
            .field("outgoing", &self.outgoing)
            .finish()
    }
}
