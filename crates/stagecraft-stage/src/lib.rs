//! Stage contract and the three stage disciplines for Stagecraft.
//!
//! A [`Stage`] reads states from the queues it owns, hands them to a
//! domain solver through the traits in [`extension`], and pushes the
//! results into its neighbors' queues. The concrete disciplines are:
//!
//! - [`PropagatingAnyWay`], [`PropagatingForward`], [`PropagatingBackward`]:
//!   extend one state at a time.
//! - [`Generator`]: spawn seed states into both neighbors.
//! - [`Connecting`]: bridge input states to output states.
//!
//! Stages never own their neighbors. Wiring is an explicit step taken by
//! whatever assembles the pipeline, see [`Wiring`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod connecting;
pub mod extension;
pub mod generator;
pub mod metrics;
pub mod propagating;
pub mod stage;
pub mod summary;

pub use config::{ConfigError, StageConfig};
pub use connecting::{Connecting, CONNECTING_FLAGS};
pub use extension::{
    Bridged, Connect, Extension, Generate, PropagateBackward, PropagateForward, Propagated, Seed,
};
pub use generator::{Generator, GENERATOR_FLAGS};
pub use metrics::StageMetrics;
pub use propagating::{Direction, PropagatingAnyWay, PropagatingBackward, PropagatingForward};
pub use stage::{Stage, StageCore, Wiring};
pub use summary::StageSummary;
