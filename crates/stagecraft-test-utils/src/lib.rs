//! Test utilities for Stagecraft development.
//!
//! Provides solver fixtures over an integer world ([`fixtures`]) and a
//! minimal round-robin [`Pipeline`] driver for exercising stages
//! together.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod driver;
pub mod fixtures;

pub use driver::Pipeline;
pub use fixtures::{FixedState, FlakySolver, GapConnector, StepSolver};

use std::sync::Arc;

use stagecraft_core::{InterfaceId, InterfaceState, Interfaces, Priority, StateId};

/// Append a seed-priority state holding `world`.
pub fn push_seed<W>(interfaces: &mut Interfaces<W>, id: InterfaceId, world: W) -> StateId {
    interfaces
        .append(id, InterfaceState::new(Arc::new(world), Priority::seed(0.0)))
        .expect("interface exists")
}

/// Worlds held by an interface, in order.
pub fn worlds<W: Clone>(interfaces: &Interfaces<W>, id: InterfaceId) -> Vec<W> {
    interfaces
        .get(id)
        .map(|iface| iface.iter().map(|(_, s)| (**s.world()).clone()).collect())
        .unwrap_or_default()
}
