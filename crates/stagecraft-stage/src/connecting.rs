//! Stages that bridge states from their input queue to their output queue.
//!
//! The pair sweep walks the cross product row by row: one input state is
//! held while the output position advances on every call. When the
//! output queue grows, rows that were already exhausted reopen for the
//! new outputs, so every (input, output) pair is attempted exactly once
//! no matter how the two queues interleave their growth.

use stagecraft_core::{
    Cursor, InterfaceFlags, InterfaceId, Interfaces, LogicError, SegmentId, SolutionSegment,
    StageError, StateId, TopologyError,
};

use crate::config::{ConfigError, StageConfig};
use crate::extension::{Bridged, Connect, Extension};
use crate::stage::{Stage, StageCore};

/// Flags every connecting stage announces.
pub const CONNECTING_FLAGS: InterfaceFlags =
    InterfaceFlags::READS_INPUT.union(InterfaceFlags::READS_OUTPUT);

/// Progress through the input × output cross product.
///
/// `swept[i]` is the number of outputs input `i` has been paired with.
/// Rows before `row` are complete for the first `seen_outputs` outputs;
/// rows from `row` on are not, so readiness never scans the rows.
#[derive(Debug, Default)]
struct PairSweep {
    swept: Vec<usize>,
    row: usize,
    seen_outputs: usize,
}

impl PairSweep {
    fn pending(&self, inputs: usize, outputs: usize) -> bool {
        if outputs == 0 {
            return false;
        }
        if outputs > self.seen_outputs {
            inputs > 0
        } else {
            self.row < inputs
        }
    }

    fn advance(&mut self, inputs: usize, outputs: usize) -> Option<(Cursor, Cursor)> {
        if outputs > self.seen_outputs {
            // New outputs reopen every row.
            self.row = 0;
            self.seen_outputs = outputs;
        }
        if self.swept.len() < inputs {
            self.swept.resize(inputs, 0);
        }
        while self.row < inputs {
            let done = &mut self.swept[self.row];
            if *done < outputs {
                let pair = (Cursor::at(self.row), Cursor::at(*done));
                *done += 1;
                if *done == outputs {
                    self.row += 1;
                }
                return Some(pair);
            }
            self.row += 1;
        }
        None
    }
}

/// A stage that connects input states to output states through a
/// [`Connect`] solver.
///
/// It owns both queues and writes into neither neighbor.
pub struct Connecting<C: Extension> {
    core: StageCore<C::Transition>,
    sweep: PairSweep,
    solver: C,
}

impl<C: Connect> Connecting<C> {
    /// A connecting stage with the default configuration.
    pub fn new(name: impl Into<String>, solver: C, interfaces: &mut Interfaces<C::World>) -> Self {
        Self::from_core(StageCore::new(name), solver, interfaces)
    }

    /// A connecting stage with a custom configuration.
    pub fn with_config(
        name: impl Into<String>,
        solver: C,
        config: StageConfig,
        interfaces: &mut Interfaces<C::World>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::from_core(StageCore::with_config(name, config)?, solver, interfaces))
    }

    fn from_core(
        mut core: StageCore<C::Transition>,
        solver: C,
        interfaces: &mut Interfaces<C::World>,
    ) -> Self {
        core.set_input(Some(interfaces.create()));
        core.set_output(Some(interfaces.create()));
        Self {
            core,
            sweep: PairSweep::default(),
            solver,
        }
    }

    fn sizes(&self, interfaces: &Interfaces<C::World>) -> (usize, usize) {
        let len = |id: Option<InterfaceId>| id.and_then(|id| interfaces.len_of(id)).unwrap_or(0);
        (len(self.core.input()), len(self.core.output()))
    }

    /// Whether some (input, output) pair has not been attempted yet.
    pub fn has_state_pair(&self, interfaces: &Interfaces<C::World>) -> bool {
        let (inputs, outputs) = self.sizes(interfaces);
        self.sweep.pending(inputs, outputs)
    }

    /// Take the next unattempted pair.
    pub fn fetch_state_pair(
        &mut self,
        interfaces: &Interfaces<C::World>,
    ) -> Result<(StateId, StateId), LogicError> {
        let (inputs, outputs) = self.sizes(interfaces);
        match (self.core.input(), self.core.output()) {
            (Some(input), Some(output)) => match self.sweep.advance(inputs, outputs) {
                Some((from, to)) => Ok((StateId::new(input, from), StateId::new(output, to))),
                None => Err(self.no_pair()),
            },
            _ => Err(self.no_pair()),
        }
    }

    fn no_pair(&self) -> LogicError {
        LogicError::NoStatePair {
            stage: self.core.name().to_string(),
        }
    }

    /// Record a bridge from `from` to `to`.
    pub fn connect(
        &mut self,
        interfaces: &Interfaces<C::World>,
        from: StateId,
        to: StateId,
        bridged: Bridged<C::Transition>,
    ) -> Result<SegmentId, StageError> {
        for id in [from, to] {
            if interfaces.state(id).is_none() {
                return Err(TopologyError::UnknownInterface(id.interface).into());
            }
        }
        let id = self.core.next_segment_id();
        self.core.push_segment(SolutionSegment::transition(
            id,
            from,
            to,
            bridged.transition,
            bridged.cost,
        ));
        self.core.metrics_mut().successes += 1;
        tracing::debug!(
            stage = self.core.name(),
            %from,
            %to,
            cost = bridged.cost,
            "connected states"
        );
        Ok(id)
    }

    /// The domain solver.
    pub fn solver(&self) -> &C {
        &self.solver
    }

    /// The domain solver, mutably.
    pub fn solver_mut(&mut self) -> &mut C {
        &mut self.solver
    }
}

impl<C: Connect> Stage<C::World, C::Transition> for Connecting<C> {
    fn core(&self) -> &StageCore<C::Transition> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StageCore<C::Transition> {
        &mut self.core
    }

    fn announced_flags(&self) -> InterfaceFlags {
        CONNECTING_FLAGS
    }

    fn can_compute(&self, interfaces: &Interfaces<C::World>) -> bool {
        self.has_state_pair(interfaces)
    }

    fn compute(&mut self, interfaces: &mut Interfaces<C::World>) -> Result<bool, StageError> {
        self.core.metrics_mut().compute_calls += 1;
        if !self.has_state_pair(interfaces) {
            return Ok(false);
        }
        let (from, to) = self.fetch_state_pair(interfaces)?;
        self.core.metrics_mut().attempts += 1;
        tracing::trace!(stage = self.core.name(), %from, %to, "connecting");

        let outcome = match (interfaces.state(from), interfaces.state(to)) {
            (Some(a), Some(b)) => self.solver.connect(a, b),
            (None, _) => return Err(TopologyError::UnknownInterface(from.interface).into()),
            (_, None) => return Err(TopologyError::UnknownInterface(to.interface).into()),
        };
        match outcome.and_then(|b| self.core.admit(b.cost).map(|()| b)) {
            Ok(bridged) => {
                self.connect(interfaces, from, to, bridged)?;
                Ok(true)
            }
            Err(failure) => {
                self.core.record_failure(Some(from), Some(to), &failure);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Wiring;
    use proptest::prelude::*;
    use stagecraft_core::{ExtensionFailure, InterfaceId, InterfaceState, Priority};
    use std::collections::HashSet;
    use std::sync::Arc;

    /// Bridges any pair whose gap is at most `reach`, logging every attempt.
    struct Gap {
        reach: i64,
        attempts: Vec<(i64, i64)>,
    }

    impl Gap {
        fn new(reach: i64) -> Self {
            Self {
                reach,
                attempts: Vec::new(),
            }
        }
    }

    impl Extension for Gap {
        type World = i64;
        type Transition = i64;
    }

    impl Connect for Gap {
        fn connect(
            &mut self,
            from: &InterfaceState<i64>,
            to: &InterfaceState<i64>,
        ) -> Result<Bridged<i64>, ExtensionFailure> {
            let (a, b) = (**from.world(), **to.world());
            self.attempts.push((a, b));
            let gap = (b - a).abs();
            if gap > self.reach {
                return Err(ExtensionFailure::new(format!("gap {gap} too wide")));
            }
            Ok(Bridged {
                transition: Some(gap),
                cost: gap as f64,
            })
        }
    }

    fn push(interfaces: &mut Interfaces<i64>, id: InterfaceId, v: i64) {
        interfaces
            .append(id, InterfaceState::new(Arc::new(v), Priority::seed(0.0)))
            .unwrap();
    }

    fn setup(reach: i64) -> (Interfaces<i64>, Connecting<Gap>, InterfaceId, InterfaceId) {
        let mut interfaces = Interfaces::new();
        let stage = Connecting::new("bridge", Gap::new(reach), &mut interfaces);
        let input = stage.core().input().unwrap();
        let output = stage.core().output().unwrap();
        (interfaces, stage, input, output)
    }

    #[test]
    fn owns_both_queues_and_writes_none() {
        let (_, stage, _, _) = setup(0);
        assert_eq!(stage.deduced_flags(), CONNECTING_FLAGS);
        assert_eq!(stage.interface_flags(), CONNECTING_FLAGS);
    }

    #[test]
    fn neighbor_wiring_is_rejected() {
        let (mut interfaces, mut stage, _, _) = setup(0);
        let next = interfaces.create();
        let err = stage.wire(Wiring::none().with_next_input(next)).unwrap_err();
        assert!(matches!(err, TopologyError::UndeclaredWrite { .. }));
    }

    #[test]
    fn needs_both_sides() {
        let (mut interfaces, mut stage, input, _) = setup(0);
        push(&mut interfaces, input, 1);
        assert!(!stage.can_compute(&interfaces));
        assert_eq!(
            stage.fetch_state_pair(&interfaces),
            Err(LogicError::NoStatePair { stage: "bridge".into() })
        );
    }

    #[test]
    fn output_advances_within_a_row() {
        let (mut interfaces, mut stage, input, output) = setup(100);
        push(&mut interfaces, input, 0);
        push(&mut interfaces, input, 1);
        for v in [10, 20] {
            push(&mut interfaces, output, v);
        }

        while stage.can_compute(&interfaces) {
            stage.compute(&mut interfaces).unwrap();
        }
        assert_eq!(stage.solver().attempts, vec![(0, 10), (0, 20), (1, 10), (1, 20)]);
        assert_eq!(stage.core().solutions().count(), 4);
    }

    #[test]
    fn output_growth_reopens_finished_rows() {
        let (mut interfaces, mut stage, input, output) = setup(100);
        push(&mut interfaces, input, 0);
        push(&mut interfaces, output, 5);
        assert!(stage.compute(&mut interfaces).unwrap());
        assert!(!stage.can_compute(&interfaces));

        push(&mut interfaces, output, 6);
        assert!(stage.can_compute(&interfaces));
        assert!(stage.compute(&mut interfaces).unwrap());
        assert_eq!(stage.solver().attempts, vec![(0, 5), (0, 6)]);
    }

    #[test]
    fn bridge_records_segment_between_queues() {
        let (mut interfaces, mut stage, input, output) = setup(3);
        push(&mut interfaces, input, 1);
        push(&mut interfaces, output, 3);

        assert!(stage.compute(&mut interfaces).unwrap());
        let seg = stage.core().solutions().next().unwrap();
        assert_eq!(seg.start().map(|s| s.interface), Some(input));
        assert_eq!(seg.end().map(|s| s.interface), Some(output));
        assert_eq!(seg.transition_payload(), Some(&2));
        assert_eq!(seg.cost(), 2.0);
    }

    #[test]
    fn failed_bridge_is_absorbed() {
        let (mut interfaces, mut stage, input, output) = setup(1);
        push(&mut interfaces, input, 0);
        push(&mut interfaces, output, 9);

        assert!(!stage.compute(&mut interfaces).unwrap());
        assert!(stage.core().segments().is_empty());
        assert_eq!(stage.core().metrics().extension_failures, 1);
        assert!(!stage.can_compute(&interfaces));
    }

    #[test]
    fn sweep_tracks_first_open_row() {
        let mut sweep = PairSweep::default();
        assert!(!sweep.pending(3, 0));
        for i in 0..1_000 {
            assert!(sweep.pending(1_000, 1));
            assert_eq!(sweep.advance(1_000, 1), Some((Cursor::at(i), Cursor::at(0))));
        }
        assert_eq!(sweep.row, 1_000);
        assert!(!sweep.pending(1_000, 1));
        assert_eq!(sweep.advance(1_000, 1), None);

        assert!(sweep.pending(1_001, 1));
        assert_eq!(sweep.advance(1_001, 1), Some((Cursor::at(1_000), Cursor::at(0))));
        assert!(!sweep.pending(1_001, 1));

        assert!(sweep.pending(1_001, 2));
        assert_eq!(sweep.advance(1_001, 2), Some((Cursor::at(0), Cursor::at(1))));
        assert_eq!(sweep.row, 1);
    }

    #[derive(Clone, Debug)]
    enum Step {
        Input,
        Output,
        Compute,
    }

    fn arb_step() -> impl Strategy<Value = Step> {
        prop_oneof![Just(Step::Input), Just(Step::Output), Just(Step::Compute)]
    }

    proptest! {
        #[test]
        fn every_pair_attempted_exactly_once(steps in prop::collection::vec(arb_step(), 0..60)) {
            let (mut interfaces, mut stage, input, output) = setup(i64::MAX);
            let (mut n, mut m) = (0i64, 0i64);
            for step in steps {
                match step {
                    Step::Input => {
                        push(&mut interfaces, input, n);
                        n += 1;
                    }
                    Step::Output => {
                        push(&mut interfaces, output, 1_000 + m);
                        m += 1;
                    }
                    Step::Compute => {
                        if stage.can_compute(&interfaces) {
                            stage.compute(&mut interfaces).unwrap();
                        }
                    }
                }
            }
            while stage.can_compute(&interfaces) {
                stage.compute(&mut interfaces).unwrap();
            }

            let attempts = &stage.solver().attempts;
            let unique: HashSet<_> = attempts.iter().copied().collect();
            prop_assert_eq!(unique.len(), attempts.len());
            prop_assert_eq!(attempts.len() as i64, n * m);
        }
    }
}
