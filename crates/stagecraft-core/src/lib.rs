//! Core types for the Stagecraft stage-composition engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the data every stage shares with its neighbors: identifiers, the
//! [`InterfaceFlags`] bitset, [`InterfaceState`] snapshots, append-only
//! [`Interface`] queues and their owning [`Interfaces`] table,
//! [`SolutionSegment`]s, and the error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod flags;
pub mod id;
pub mod interface;
pub mod segment;
pub mod state;

pub use error::{ExtensionFailure, LogicError, QueueSide, StageError, TopologyError};
pub use flags::{DataFlow, InterfaceFlags};
pub use id::{InterfaceId, SegmentId, StageId, StateId};
pub use interface::{Cursor, GrowthHook, Interface, Interfaces};
pub use segment::SolutionSegment;
pub use state::{InterfaceState, Priority};
