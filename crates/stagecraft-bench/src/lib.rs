//! Benchmark profiles for the Stagecraft stage-composition engine.
//!
//! - [`filled_interface`]: one interface holding `n` seed states.
//! - [`forward_loop`]: a forward stage feeding its own input, seeded once.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use stagecraft_core::{
    ExtensionFailure, InterfaceId, InterfaceState, Interfaces, Priority, TopologyError,
};
use stagecraft_stage::{Extension, PropagateForward, Propagated, PropagatingForward, Stage, Wiring};

/// Counts upward by one at unit cost.
pub struct Counter;

impl Extension for Counter {
    type World = u64;
    type Transition = ();
}

impl PropagateForward for Counter {
    fn compute_forward(
        &mut self,
        from: &InterfaceState<u64>,
    ) -> Result<Propagated<u64, ()>, ExtensionFailure> {
        Ok(Propagated::new(**from.world() + 1, None, 1.0))
    }
}

/// Build an interface table with a single interface of `n` seed states.
pub fn filled_interface(n: u64) -> Result<(Interfaces<u64>, InterfaceId), TopologyError> {
    let mut interfaces = Interfaces::new();
    let id = interfaces.create();
    for v in 0..n {
        interfaces.append(id, InterfaceState::new(Arc::new(v), Priority::seed(0.0)))?;
    }
    Ok((interfaces, id))
}

/// Build a [`Counter`] stage wired onto its own input, with one seed queued.
pub fn forward_loop() -> Result<(Interfaces<u64>, PropagatingForward<Counter>), TopologyError> {
    let mut interfaces = Interfaces::new();
    let mut stage = PropagatingForward::new("count", Counter, &mut interfaces);
    let input = stage
        .core()
        .input()
        .ok_or(TopologyError::UnknownInterface(InterfaceId(0)))?;
    stage.wire(Wiring::none().with_next_input(input))?;
    interfaces.append(input, InterfaceState::new(Arc::new(0), Priority::seed(0.0)))?;
    Ok((interfaces, stage))
}
