//! Stages that originate new seed states.
//!
//! A generator owns no queues. Each spawn pushes the seed into both
//! neighbor queues at once, so growth can start in either direction from
//! the same world.

use std::sync::Arc;

use smallvec::SmallVec;
use stagecraft_core::{
    InterfaceFlags, InterfaceState, Interfaces, LogicError, Priority, SegmentId,
    SolutionSegment, StageError, StateId, TopologyError,
};

use crate::config::{ConfigError, StageConfig};
use crate::extension::{Extension, Generate};
use crate::stage::{Stage, StageCore};

/// Flags every generator announces.
pub const GENERATOR_FLAGS: InterfaceFlags =
    InterfaceFlags::WRITES_NEXT_INPUT.union(InterfaceFlags::WRITES_PREV_OUTPUT);

/// A stage that spawns seeds produced by a [`Generate`] solver.
pub struct Generator<G: Extension> {
    core: StageCore<G::Transition>,
    solver: G,
}

impl<G: Generate> Generator<G> {
    /// A generator with the default configuration.
    pub fn new(name: impl Into<String>, solver: G) -> Self {
        Self {
            core: StageCore::new(name),
            solver,
        }
    }

    /// A generator with a custom configuration.
    pub fn with_config(
        name: impl Into<String>,
        solver: G,
        config: StageConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            core: StageCore::with_config(name, config)?,
            solver,
        })
    }

    /// Push a seed for `world` into both neighbor queues.
    ///
    /// The state appended to the previous stage's output ends a seed
    /// segment; the state appended to the next stage's input starts one.
    /// The two segments point at each other. A missing neighbor skips its
    /// side; with no neighbor at all nothing is emitted.
    ///
    /// Returns the emitted states, previous-output side first.
    pub fn spawn(
        &mut self,
        interfaces: &mut Interfaces<G::World>,
        world: impl Into<Arc<G::World>>,
        cost: f64,
    ) -> Result<SmallVec<[StateId; 2]>, StageError> {
        if !cost.is_finite() || cost < 0.0 {
            return Err(LogicError::InvalidCost {
                stage: self.core.name().to_string(),
                cost,
            }
            .into());
        }

        let prev = self.core.prev_output();
        let next = self.core.next_input();
        let mut emitted = SmallVec::new();
        if prev.is_none() && next.is_none() {
            tracing::warn!(stage = self.core.name(), "spawn without wired neighbors");
            return Ok(emitted);
        }
        for id in [prev, next].into_iter().flatten() {
            if interfaces.get(id).is_none() {
                return Err(TopologyError::UnknownInterface(id).into());
            }
        }

        let world = world.into();
        let base = self.core.next_segment_id();
        let prev_seg = prev.map(|_| base);
        let next_seg = next.map(|_| SegmentId {
            stage: base.stage,
            index: base.index + u32::from(prev.is_some()),
        });

        if let (Some(target), Some(seg)) = (prev, prev_seg) {
            let state =
                InterfaceState::new(Arc::clone(&world), Priority::seed(cost)).with_incoming(seg);
            let end = interfaces.append(target, state)?;
            self.core
                .push_segment(SolutionSegment::seed(seg, None, Some(end), cost, next_seg));
            emitted.push(end);
        }
        if let (Some(target), Some(seg)) = (next, next_seg) {
            let state =
                InterfaceState::new(Arc::clone(&world), Priority::seed(cost)).with_outgoing(seg);
            let start = interfaces.append(target, state)?;
            self.core
                .push_segment(SolutionSegment::seed(seg, Some(start), None, cost, prev_seg));
            emitted.push(start);
        }

        let metrics = self.core.metrics_mut();
        metrics.successes += 1;
        metrics.states_emitted += emitted.len() as u64;
        tracing::debug!(stage = self.core.name(), cost, states = emitted.len(), "spawned seed");
        Ok(emitted)
    }

    /// The domain solver.
    pub fn solver(&self) -> &G {
        &self.solver
    }

    /// The domain solver, mutably.
    pub fn solver_mut(&mut self) -> &mut G {
        &mut self.solver
    }
}

impl<G: Generate> Stage<G::World, G::Transition> for Generator<G> {
    fn core(&self) -> &StageCore<G::Transition> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StageCore<G::Transition> {
        &mut self.core
    }

    fn announced_flags(&self) -> InterfaceFlags {
        GENERATOR_FLAGS
    }

    fn can_compute(&self, _interfaces: &Interfaces<G::World>) -> bool {
        self.solver.can_generate()
    }

    fn compute(&mut self, interfaces: &mut Interfaces<G::World>) -> Result<bool, StageError> {
        self.core.metrics_mut().compute_calls += 1;
        if !self.solver.can_generate() {
            return Ok(false);
        }
        self.core.metrics_mut().attempts += 1;
        let seeds = match self.solver.generate() {
            Ok(seeds) => seeds,
            Err(failure) => {
                self.core.record_failure(None, None, &failure);
                return Ok(false);
            }
        };

        let mut produced = false;
        for seed in seeds {
            if let Err(failure) = self.core.admit(seed.cost) {
                self.core.record_failure(None, None, &failure);
                continue;
            }
            produced |= !self.spawn(interfaces, seed.world, seed.cost)?.is_empty();
        }
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::Seed;
    use crate::stage::Wiring;
    use stagecraft_core::ExtensionFailure;

    /// Hands out the queued seeds one batch per call.
    struct Batches(Vec<Vec<(i64, f64)>>);

    impl Extension for Batches {
        type World = i64;
        type Transition = ();
    }

    impl Generate for Batches {
        fn can_generate(&self) -> bool {
            !self.0.is_empty()
        }

        fn generate(&mut self) -> Result<Vec<Seed<i64>>, ExtensionFailure> {
            if self.0.is_empty() {
                return Err(ExtensionFailure::new("exhausted"));
            }
            Ok(self.0.remove(0).into_iter().map(|(w, c)| Seed::new(w, c)).collect())
        }
    }

    fn wired(wiring: Wiring) -> Generator<Batches> {
        let mut generator = Generator::new("gen", Batches(Vec::new()));
        generator.wire(wiring).unwrap();
        generator
    }

    #[test]
    fn announces_both_neighbor_writes() {
        let generator = Generator::new("gen", Batches(Vec::new()));
        assert_eq!(generator.announced_flags(), GENERATOR_FLAGS);
        assert!(generator.deduced_flags().is_empty());
    }

    #[test]
    fn spawn_pushes_paired_seeds_both_ways() {
        let mut interfaces = Interfaces::new();
        let prev = interfaces.create();
        let next = interfaces.create();
        let mut generator = wired(Wiring::none().with_prev_output(prev).with_next_input(next));

        let emitted = generator.spawn(&mut interfaces, 7, 2.5).unwrap();
        assert_eq!(emitted.len(), 2);
        let back = interfaces.state(emitted[0]).unwrap();
        let fwd = interfaces.state(emitted[1]).unwrap();
        assert_eq!(emitted[0].interface, prev);
        assert_eq!(emitted[1].interface, next);
        assert!(back.same_world(fwd));
        assert_eq!(back.priority(), Priority::seed(2.5));

        let back_seg = generator.core().segment(back.incoming().unwrap()).unwrap();
        let fwd_seg = generator.core().segment(fwd.outgoing().unwrap()).unwrap();
        assert_eq!(back_seg.end(), Some(emitted[0]));
        assert_eq!(back_seg.start(), None);
        assert_eq!(fwd_seg.start(), Some(emitted[1]));
        assert_eq!(fwd_seg.end(), None);
        assert_eq!(back_seg.paired(), Some(fwd_seg.id()));
        assert_eq!(fwd_seg.paired(), Some(back_seg.id()));
        assert!(back_seg.is_seed() && fwd_seg.is_seed());
    }

    #[test]
    fn missing_side_is_skipped() {
        let mut interfaces = Interfaces::new();
        let next = interfaces.create();
        let mut generator = wired(Wiring::none().with_next_input(next));

        let emitted = generator.spawn(&mut interfaces, 1, 0.0).unwrap();
        assert_eq!(emitted.len(), 1);
        let seg = &generator.core().segments()[0];
        assert_eq!(seg.start(), Some(emitted[0]));
        assert_eq!(seg.paired(), None);
    }

    #[test]
    fn spawn_without_neighbors_emits_nothing() {
        let mut interfaces: Interfaces<i64> = Interfaces::new();
        let mut generator = Generator::new("gen", Batches(Vec::new()));
        assert!(generator.spawn(&mut interfaces, 1, 0.0).unwrap().is_empty());
        assert!(generator.core().segments().is_empty());
    }

    #[test]
    fn spawn_rejects_invalid_cost() {
        let mut interfaces = Interfaces::new();
        let next = interfaces.create();
        let mut generator = wired(Wiring::none().with_next_input(next));
        let err = generator.spawn(&mut interfaces, 1, f64::NAN).unwrap_err();
        assert!(matches!(err, StageError::Logic(LogicError::InvalidCost { .. })));
        assert_eq!(interfaces.len_of(next), Some(0));
    }

    #[test]
    fn compute_spawns_every_admitted_seed() {
        let mut interfaces = Interfaces::new();
        let next = interfaces.create();
        let mut generator =
            Generator::new("gen", Batches(vec![vec![(1, 0.0), (2, -1.0), (3, 1.0)]]));
        generator.wire(Wiring::none().with_next_input(next)).unwrap();

        assert!(generator.can_compute(&interfaces));
        assert!(generator.compute(&mut interfaces).unwrap());
        assert_eq!(interfaces.len_of(next), Some(2));
        assert_eq!(generator.core().metrics().extension_failures, 1);
        assert!(!generator.can_compute(&interfaces));
        assert!(!generator.compute(&mut interfaces).unwrap());
    }

    #[test]
    fn cannot_wire_after_connection_changes() {
        let mut interfaces: Interfaces<i64> = Interfaces::new();
        let a = interfaces.create();
        let b = interfaces.create();
        let mut generator = wired(Wiring::none().with_next_input(a));
        assert!(generator.wire(Wiring::none().with_next_input(b)).is_err());
    }
}
