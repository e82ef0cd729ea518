//! Stagecraft: composable search-pipeline stages over append-only state queues.
//!
//! This is the facade crate re-exporting the public API of the Stagecraft
//! sub-crates. Depending on `stagecraft` alone is enough for most users.
//!
//! # Quick start
//!
//! ```rust
//! use stagecraft::prelude::*;
//!
//! // Walks the integer line one unit at a time.
//! struct Walk;
//! impl Extension for Walk {
//!     type World = i64;
//!     type Transition = ();
//! }
//! impl PropagateForward for Walk {
//!     fn compute_forward(
//!         &mut self,
//!         from: &InterfaceState<i64>,
//!     ) -> Result<Propagated<i64, ()>, ExtensionFailure> {
//!         Ok(Propagated::new(**from.world() + 1, None, 1.0))
//!     }
//! }
//!
//! // Seeds the origin once.
//! struct Origin(bool);
//! impl Extension for Origin {
//!     type World = i64;
//!     type Transition = ();
//! }
//! impl Generate for Origin {
//!     fn can_generate(&self) -> bool { !self.0 }
//!     fn generate(&mut self) -> Result<Vec<Seed<i64>>, ExtensionFailure> {
//!         self.0 = true;
//!         Ok(vec![Seed::new(0, 0.0)])
//!     }
//! }
//!
//! let mut interfaces = Interfaces::new();
//! let mut walk = PropagatingForward::new("walk", Walk, &mut interfaces);
//! let mut origin = Generator::new("origin", Origin(false));
//!
//! // Feed the walker's output back into its own input.
//! let input = walk.core().input().unwrap();
//! origin.wire(Wiring::none().with_next_input(input)).unwrap();
//! walk.wire(Wiring::none().with_next_input(input)).unwrap();
//!
//! origin.compute(&mut interfaces).unwrap();
//! for _ in 0..3 {
//!     walk.compute(&mut interfaces).unwrap();
//! }
//! assert_eq!(walk.core().solutions().count(), 3);
//! assert_eq!(interfaces.len_of(input), Some(4));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `stagecraft-core` | IDs, flags, states, interfaces, segments, errors |
//! | [`stage`] | `stagecraft-stage` | Stage trait, disciplines, extension points |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`stagecraft-core`).
///
/// Identifiers, [`types::InterfaceFlags`], [`types::InterfaceState`],
/// append-only [`types::Interface`] queues and the error taxonomy.
pub use stagecraft_core as types;

/// Stages and extension points (`stagecraft-stage`).
///
/// The [`stage::Stage`] trait, the propagating, generator and connecting
/// disciplines, and the solver traits they call into.
pub use stagecraft_stage as stage;

/// Common imports for typical Stagecraft usage.
pub mod prelude {
    // Core types
    pub use stagecraft_core::{
        Cursor, InterfaceFlags, InterfaceId, InterfaceState, Interfaces, Priority,
        SolutionSegment, StateId,
    };

    // Errors
    pub use stagecraft_core::{ExtensionFailure, LogicError, StageError, TopologyError};

    // Stages
    pub use stagecraft_stage::{
        Connecting, Direction, Generator, PropagatingAnyWay, PropagatingBackward,
        PropagatingForward, Stage, StageConfig, Wiring,
    };

    // Extension points
    pub use stagecraft_stage::{
        Bridged, Connect, Extension, Generate, PropagateBackward, PropagateForward, Propagated,
        Seed,
    };
}
