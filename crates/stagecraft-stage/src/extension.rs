//! Domain extension points plugged into stages.
//!
//! These are the only places where world payloads and transition
//! payloads are produced. The engine never looks inside them.

use std::sync::Arc;

use stagecraft_core::{ExtensionFailure, InterfaceState};

/// Payload types shared by the extension traits.
pub trait Extension {
    /// Opaque world configuration carried by interface states.
    type World;
    /// Opaque transition data carried by solution segments.
    type Transition;
}

/// Result of extending a state by one transition.
#[derive(Debug)]
pub struct Propagated<W, T> {
    /// The newly reached world.
    pub world: Arc<W>,
    /// Transition payload, if the domain produces one.
    pub transition: Option<T>,
    /// Cost of the transition.
    pub cost: f64,
}

impl<W, T> Propagated<W, T> {
    /// A transition to `world` with the given cost and payload.
    pub fn new(world: impl Into<Arc<W>>, transition: Option<T>, cost: f64) -> Self {
        Self {
            world: world.into(),
            transition,
            cost,
        }
    }
}

/// Result of bridging two existing states.
#[derive(Debug)]
pub struct Bridged<T> {
    /// Transition payload, if the domain produces one.
    pub transition: Option<T>,
    /// Cost of the bridge.
    pub cost: f64,
}

/// A new seed world produced by a generator.
#[derive(Debug)]
pub struct Seed<W> {
    /// The seed world.
    pub world: Arc<W>,
    /// Cost attached to the seed.
    pub cost: f64,
}

impl<W> Seed<W> {
    /// A seed for `world` with the given cost.
    pub fn new(world: impl Into<Arc<W>>, cost: f64) -> Self {
        Self {
            world: world.into(),
            cost,
        }
    }
}

/// Computes the state reached from `from` when moving forward.
pub trait PropagateForward: Extension {
    /// Extend `from` by one transition.
    fn compute_forward(
        &mut self,
        from: &InterfaceState<Self::World>,
    ) -> Result<Propagated<Self::World, Self::Transition>, ExtensionFailure>;
}

/// Computes the state that leads into `to` when moving backward.
pub trait PropagateBackward: Extension {
    /// Find a predecessor of `to`, one transition away.
    fn compute_backward(
        &mut self,
        to: &InterfaceState<Self::World>,
    ) -> Result<Propagated<Self::World, Self::Transition>, ExtensionFailure>;
}

/// Bridges a state from the input queue to one from the output queue.
pub trait Connect: Extension {
    /// Attempt a transition from `from` to `to`.
    fn connect(
        &mut self,
        from: &InterfaceState<Self::World>,
        to: &InterfaceState<Self::World>,
    ) -> Result<Bridged<Self::Transition>, ExtensionFailure>;
}

/// Spontaneously produces seed worlds.
pub trait Generate: Extension {
    /// Whether [`generate`](Self::generate) has anything left to offer.
    fn can_generate(&self) -> bool;

    /// Produce zero or more seeds.
    fn generate(&mut self) -> Result<Vec<Seed<Self::World>>, ExtensionFailure>;
}
