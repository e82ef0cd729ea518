//! Stages that extend one state at a time, forward and/or backward.
//!
//! The forward half consumes the stage's input queue from its beginning
//! and pushes each result into the following stage's input. The backward
//! half consumes the stage's output queue, starting at the end it had
//! when the queue was created, and pushes each result into the preceding
//! stage's output.
//!
//! [`PropagatingAnyWay`] carries both halves and can be narrowed with
//! [`restrict_direction`](PropagatingAnyWay::restrict_direction).
//! [`PropagatingForward`] and [`PropagatingBackward`] carry a single
//! half: the accessors of the other half do not exist on those types, so
//! asking a forward-only stage for an end state is a compile error.

use std::fmt;

use stagecraft_core::{
    Cursor, Interface, InterfaceFlags, Interfaces, LogicError, QueueSide, StageError, StateId,
    TopologyError,
};

use crate::config::{ConfigError, StageConfig};
use crate::extension::{Extension, PropagateBackward, PropagateForward, Propagated};
use crate::stage::{Stage, StageCore};

/// Which halves of a propagating stage are active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Input queue to next stage's input.
    Forward,
    /// Output queue to previous stage's output.
    Backward,
    /// Both.
    AnyWay,
}

impl Direction {
    /// Returns `true` for `Forward` and `AnyWay`.
    pub fn includes_forward(self) -> bool {
        matches!(self, Self::Forward | Self::AnyWay)
    }

    /// Returns `true` for `Backward` and `AnyWay`.
    pub fn includes_backward(self) -> bool {
        matches!(self, Self::Backward | Self::AnyWay)
    }

    /// Flags a stage propagating in this direction announces.
    pub fn announced_flags(self) -> InterfaceFlags {
        let mut f = InterfaceFlags::empty();
        if self.includes_forward() {
            f |= InterfaceFlags::READS_INPUT | InterfaceFlags::WRITES_NEXT_INPUT;
        }
        if self.includes_backward() {
            f |= InterfaceFlags::READS_OUTPUT | InterfaceFlags::WRITES_PREV_OUTPUT;
        }
        f
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Backward => write!(f, "backward"),
            Self::AnyWay => write!(f, "anyway"),
        }
    }
}

// ── Halves ─────────────────────────────────────────────────────────

/// Cursor into the stage's input queue.
#[derive(Debug, Default)]
struct ForwardHalf {
    next_start: Cursor,
}

impl ForwardHalf {
    /// Create the input queue unless one exists already.
    fn attach<T, W>(&mut self, core: &mut StageCore<T>, interfaces: &mut Interfaces<W>) {
        if core.input().is_none() {
            let id = interfaces.create();
            core.set_input(Some(id));
            self.next_start = interfaces.get(id).map_or(Cursor::BEGIN, Interface::begin);
        }
    }

    fn detach<T>(&mut self, core: &mut StageCore<T>) {
        core.set_input(None);
        self.next_start = Cursor::BEGIN;
    }

    fn has_start_state<T, W>(&self, core: &StageCore<T>, interfaces: &Interfaces<W>) -> bool {
        core.input()
            .and_then(|id| interfaces.get(id))
            .is_some_and(|input| self.next_start < input.end())
    }

    /// A state is queued and there is a following stage to send it to.
    fn ready<T, W>(&self, core: &StageCore<T>, interfaces: &Interfaces<W>) -> bool {
        core.next_input().is_some() && self.has_start_state(core, interfaces)
    }

    fn fetch_start_state<T, W>(
        &mut self,
        core: &StageCore<T>,
        interfaces: &Interfaces<W>,
    ) -> Result<StateId, LogicError> {
        match core.input() {
            Some(input) if self.has_start_state(core, interfaces) => {
                let id = StateId::new(input, self.next_start);
                self.next_start = self.next_start.next();
                Ok(id)
            }
            _ => Err(LogicError::NoStartState {
                stage: core.name().to_string(),
            }),
        }
    }

    /// One forward attempt. The caller checked `ready`.
    fn step<P: PropagateForward>(
        &mut self,
        core: &mut StageCore<P::Transition>,
        solver: &mut P,
        interfaces: &mut Interfaces<P::World>,
    ) -> Result<bool, StageError> {
        core.require(QueueSide::NextInput)?;
        let from = self.fetch_start_state(core, interfaces)?;
        core.metrics_mut().attempts += 1;
        tracing::trace!(stage = core.name(), %from, "computing forward");

        let outcome = match interfaces.state(from) {
            Some(state) => solver.compute_forward(state),
            None => return Err(TopologyError::UnknownInterface(from.interface).into()),
        };
        match outcome.and_then(|p| core.admit(p.cost).map(|()| p)) {
            Ok(propagated) => {
                core.send_forward(interfaces, from, propagated)?;
                Ok(true)
            }
            Err(failure) => {
                core.record_failure(Some(from), None, &failure);
                Ok(false)
            }
        }
    }
}

/// Cursor into the stage's output queue.
#[derive(Debug, Default)]
struct BackwardHalf {
    next_end: Cursor,
}

impl BackwardHalf {
    /// Create the output queue unless one exists already. Only states
    /// appended after this point are eligible.
    fn attach<T, W>(&mut self, core: &mut StageCore<T>, interfaces: &mut Interfaces<W>) {
        if core.output().is_none() {
            let id = interfaces.create();
            core.set_output(Some(id));
            self.next_end = interfaces.get(id).map_or(Cursor::BEGIN, Interface::end);
        }
    }

    fn detach<T>(&mut self, core: &mut StageCore<T>) {
        core.set_output(None);
        self.next_end = Cursor::BEGIN;
    }

    fn has_end_state<T, W>(&self, core: &StageCore<T>, interfaces: &Interfaces<W>) -> bool {
        core.output()
            .and_then(|id| interfaces.get(id))
            .is_some_and(|output| self.next_end < output.end())
    }

    /// A state is queued and there is a preceding stage to send it to.
    fn ready<T, W>(&self, core: &StageCore<T>, interfaces: &Interfaces<W>) -> bool {
        core.prev_output().is_some() && self.has_end_state(core, interfaces)
    }

    fn fetch_end_state<T, W>(
        &mut self,
        core: &StageCore<T>,
        interfaces: &Interfaces<W>,
    ) -> Result<StateId, LogicError> {
        match core.output() {
            Some(output) if self.has_end_state(core, interfaces) => {
                let id = StateId::new(output, self.next_end);
                self.next_end = self.next_end.next();
                Ok(id)
            }
            _ => Err(LogicError::NoEndState {
                stage: core.name().to_string(),
            }),
        }
    }

    /// One backward attempt. The caller checked `ready`.
    fn step<P: PropagateBackward>(
        &mut self,
        core: &mut StageCore<P::Transition>,
        solver: &mut P,
        interfaces: &mut Interfaces<P::World>,
    ) -> Result<bool, StageError> {
        core.require(QueueSide::PrevOutput)?;
        let to = self.fetch_end_state(core, interfaces)?;
        core.metrics_mut().attempts += 1;
        tracing::trace!(stage = core.name(), %to, "computing backward");

        let outcome = match interfaces.state(to) {
            Some(state) => solver.compute_backward(state),
            None => return Err(TopologyError::UnknownInterface(to.interface).into()),
        };
        match outcome.and_then(|p| core.admit(p.cost).map(|()| p)) {
            Ok(propagated) => {
                core.send_backward(interfaces, to, propagated)?;
                Ok(true)
            }
            Err(failure) => {
                core.record_failure(None, Some(to), &failure);
                Ok(false)
            }
        }
    }
}

// ── PropagatingAnyWay ──────────────────────────────────────────────

/// A propagating stage whose direction is chosen at construction and may
/// be narrowed until the stage is wired.
pub struct PropagatingAnyWay<P: Extension> {
    core: StageCore<P::Transition>,
    dir: Direction,
    forward: ForwardHalf,
    backward: BackwardHalf,
    solver: P,
}

impl<P> PropagatingAnyWay<P>
where
    P: PropagateForward + PropagateBackward,
{
    /// A stage propagating in both directions.
    pub fn new(name: impl Into<String>, solver: P, interfaces: &mut Interfaces<P::World>) -> Self {
        Self::with_direction(name, Direction::AnyWay, solver, interfaces)
    }

    /// A stage propagating in `dir`.
    pub fn with_direction(
        name: impl Into<String>,
        dir: Direction,
        solver: P,
        interfaces: &mut Interfaces<P::World>,
    ) -> Self {
        Self::from_core(StageCore::new(name), dir, solver, interfaces)
    }

    /// A stage propagating in `dir` with a custom configuration.
    pub fn with_config(
        name: impl Into<String>,
        dir: Direction,
        solver: P,
        config: StageConfig,
        interfaces: &mut Interfaces<P::World>,
    ) -> Result<Self, ConfigError> {
        let core = StageCore::with_config(name, config)?;
        Ok(Self::from_core(core, dir, solver, interfaces))
    }

    fn from_core(
        core: StageCore<P::Transition>,
        dir: Direction,
        solver: P,
        interfaces: &mut Interfaces<P::World>,
    ) -> Self {
        let mut stage = Self {
            core,
            dir,
            forward: ForwardHalf::default(),
            backward: BackwardHalf::default(),
            solver,
        };
        stage.init_interfaces(interfaces);
        stage
    }

    /// Create the queues `dir` needs and drop the others.
    ///
    /// An existing queue is kept so that states already queued survive.
    fn init_interfaces(&mut self, interfaces: &mut Interfaces<P::World>) {
        if self.dir.includes_forward() {
            self.forward.attach(&mut self.core, interfaces);
        } else {
            self.forward.detach(&mut self.core);
        }
        if self.dir.includes_backward() {
            self.backward.attach(&mut self.core, interfaces);
        } else {
            self.backward.detach(&mut self.core);
        }
    }

    /// Active direction.
    pub fn direction(&self) -> Direction {
        self.dir
    }

    /// Change the active direction.
    ///
    /// Fails once the stage is wired: the queues a direction implies are
    /// what neighbors were wired against.
    pub fn restrict_direction(
        &mut self,
        dir: Direction,
        interfaces: &mut Interfaces<P::World>,
    ) -> Result<(), TopologyError> {
        if self.dir == dir {
            return Ok(());
        }
        if self.core.is_connected() {
            return Err(TopologyError::AlreadyConnected {
                stage: self.core.name().to_string(),
            });
        }
        tracing::debug!(
            stage = self.core.name(),
            from = %self.dir,
            to = %dir,
            "restricting direction"
        );
        self.dir = dir;
        self.init_interfaces(interfaces);
        Ok(())
    }

    /// Whether an unconsumed state waits in the input queue.
    pub fn has_start_state(&self, interfaces: &Interfaces<P::World>) -> bool {
        self.forward.has_start_state(&self.core, interfaces)
    }

    /// Take the next input state. Check [`has_start_state`](Self::has_start_state) first.
    pub fn fetch_start_state(
        &mut self,
        interfaces: &Interfaces<P::World>,
    ) -> Result<StateId, LogicError> {
        self.forward.fetch_start_state(&self.core, interfaces)
    }

    /// Whether an unconsumed state waits in the output queue.
    pub fn has_end_state(&self, interfaces: &Interfaces<P::World>) -> bool {
        self.backward.has_end_state(&self.core, interfaces)
    }

    /// Take the next output state. Check [`has_end_state`](Self::has_end_state) first.
    pub fn fetch_end_state(
        &mut self,
        interfaces: &Interfaces<P::World>,
    ) -> Result<StateId, LogicError> {
        self.backward.fetch_end_state(&self.core, interfaces)
    }

    /// The forward half is active, wired and has a state waiting.
    fn forward_ready(&self, interfaces: &Interfaces<P::World>) -> bool {
        self.dir.includes_forward() && self.forward.ready(&self.core, interfaces)
    }

    /// The backward half is active, wired and has a state waiting.
    fn backward_ready(&self, interfaces: &Interfaces<P::World>) -> bool {
        self.dir.includes_backward() && self.backward.ready(&self.core, interfaces)
    }

    /// Record a transition from `from` and push its end state forward.
    pub fn send_forward(
        &mut self,
        interfaces: &mut Interfaces<P::World>,
        from: StateId,
        propagated: Propagated<P::World, P::Transition>,
    ) -> Result<StateId, StageError> {
        self.core.send_forward(interfaces, from, propagated)
    }

    /// Record a transition into `to` and push its start state backward.
    pub fn send_backward(
        &mut self,
        interfaces: &mut Interfaces<P::World>,
        to: StateId,
        propagated: Propagated<P::World, P::Transition>,
    ) -> Result<StateId, StageError> {
        self.core.send_backward(interfaces, to, propagated)
    }

    /// The domain solver.
    pub fn solver(&self) -> &P {
        &self.solver
    }

    /// The domain solver, mutably.
    pub fn solver_mut(&mut self) -> &mut P {
        &mut self.solver
    }
}

impl<P> Stage<P::World, P::Transition> for PropagatingAnyWay<P>
where
    P: PropagateForward + PropagateBackward,
{
    fn core(&self) -> &StageCore<P::Transition> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StageCore<P::Transition> {
        &mut self.core
    }

    fn announced_flags(&self) -> InterfaceFlags {
        self.dir.announced_flags()
    }

    fn can_compute(&self, interfaces: &Interfaces<P::World>) -> bool {
        self.forward_ready(interfaces) || self.backward_ready(interfaces)
    }

    fn compute(&mut self, interfaces: &mut Interfaces<P::World>) -> Result<bool, StageError> {
        self.core.metrics_mut().compute_calls += 1;
        let mut produced = false;
        if self.forward_ready(interfaces) {
            produced |= self.forward.step(&mut self.core, &mut self.solver, interfaces)?;
        }
        if self.backward_ready(interfaces) {
            produced |= self.backward.step(&mut self.core, &mut self.solver, interfaces)?;
        }
        Ok(produced)
    }
}

// ── PropagatingForward ─────────────────────────────────────────────

/// A stage that only propagates forward.
///
/// It owns an input queue and no output queue. Backward accessors are not
/// part of this type:
///
/// ```compile_fail
/// use stagecraft_core::Interfaces;
/// use stagecraft_stage::{PropagateForward, PropagatingForward};
///
/// fn probe<P: PropagateForward>(
///     stage: &PropagatingForward<P>,
///     interfaces: &Interfaces<P::World>,
/// ) -> bool {
///     stage.has_end_state(interfaces)
/// }
/// ```
pub struct PropagatingForward<P: Extension> {
    core: StageCore<P::Transition>,
    forward: ForwardHalf,
    solver: P,
}

impl<P: PropagateForward> PropagatingForward<P> {
    /// A forward stage with the default configuration.
    pub fn new(name: impl Into<String>, solver: P, interfaces: &mut Interfaces<P::World>) -> Self {
        Self::from_core(StageCore::new(name), solver, interfaces)
    }

    /// A forward stage with a custom configuration.
    pub fn with_config(
        name: impl Into<String>,
        solver: P,
        config: StageConfig,
        interfaces: &mut Interfaces<P::World>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::from_core(StageCore::with_config(name, config)?, solver, interfaces))
    }

    fn from_core(
        mut core: StageCore<P::Transition>,
        solver: P,
        interfaces: &mut Interfaces<P::World>,
    ) -> Self {
        let mut forward = ForwardHalf::default();
        forward.attach(&mut core, interfaces);
        Self {
            core,
            forward,
            solver,
        }
    }

    /// Whether an unconsumed state waits in the input queue.
    pub fn has_start_state(&self, interfaces: &Interfaces<P::World>) -> bool {
        self.forward.has_start_state(&self.core, interfaces)
    }

    /// Take the next input state. Check [`has_start_state`](Self::has_start_state) first.
    pub fn fetch_start_state(
        &mut self,
        interfaces: &Interfaces<P::World>,
    ) -> Result<StateId, LogicError> {
        self.forward.fetch_start_state(&self.core, interfaces)
    }

    /// Record a transition from `from` and push its end state forward.
    pub fn send_forward(
        &mut self,
        interfaces: &mut Interfaces<P::World>,
        from: StateId,
        propagated: Propagated<P::World, P::Transition>,
    ) -> Result<StateId, StageError> {
        self.core.send_forward(interfaces, from, propagated)
    }

    /// The domain solver.
    pub fn solver(&self) -> &P {
        &self.solver
    }

    /// The domain solver, mutably.
    pub fn solver_mut(&mut self) -> &mut P {
        &mut self.solver
    }
}

impl<P: PropagateForward> Stage<P::World, P::Transition> for PropagatingForward<P> {
    fn core(&self) -> &StageCore<P::Transition> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StageCore<P::Transition> {
        &mut self.core
    }

    fn announced_flags(&self) -> InterfaceFlags {
        Direction::Forward.announced_flags()
    }

    fn can_compute(&self, interfaces: &Interfaces<P::World>) -> bool {
        self.forward.ready(&self.core, interfaces)
    }

    fn compute(&mut self, interfaces: &mut Interfaces<P::World>) -> Result<bool, StageError> {
        self.core.metrics_mut().compute_calls += 1;
        if !self.forward.ready(&self.core, interfaces) {
            return Ok(false);
        }
        self.forward.step(&mut self.core, &mut self.solver, interfaces)
    }
}

// ── PropagatingBackward ────────────────────────────────────────────

/// A stage that only propagates backward.
///
/// It owns an output queue and no input queue. Forward accessors are not
/// part of this type:
///
/// ```compile_fail
/// use stagecraft_core::Interfaces;
/// use stagecraft_stage::{PropagateBackward, PropagatingBackward};
///
/// fn probe<P: PropagateBackward>(
///     stage: &mut PropagatingBackward<P>,
///     interfaces: &Interfaces<P::World>,
/// ) {
///     let _ = stage.fetch_start_state(interfaces);
/// }
/// ```
pub struct PropagatingBackward<P: Extension> {
    core: StageCore<P::Transition>,
    backward: BackwardHalf,
    solver: P,
}

impl<P: PropagateBackward> PropagatingBackward<P> {
    /// A backward stage with the default configuration.
    pub fn new(name: impl Into<String>, solver: P, interfaces: &mut Interfaces<P::World>) -> Self {
        Self::from_core(StageCore::new(name), solver, interfaces)
    }

    /// A backward stage with a custom configuration.
    pub fn with_config(
        name: impl Into<String>,
        solver: P,
        config: StageConfig,
        interfaces: &mut Interfaces<P::World>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::from_core(StageCore::with_config(name, config)?, solver, interfaces))
    }

    fn from_core(
        mut core: StageCore<P::Transition>,
        solver: P,
        interfaces: &mut Interfaces<P::World>,
    ) -> Self {
        let mut backward = BackwardHalf::default();
        backward.attach(&mut core, interfaces);
        Self {
            core,
            backward,
            solver,
        }
    }

    /// Whether an unconsumed state waits in the output queue.
    pub fn has_end_state(&self, interfaces: &Interfaces<P::World>) -> bool {
        self.backward.has_end_state(&self.core, interfaces)
    }

    /// Take the next output state. Check [`has_end_state`](Self::has_end_state) first.
    pub fn fetch_end_state(
        &mut self,
        interfaces: &Interfaces<P::World>,
    ) -> Result<StateId, LogicError> {
        self.backward.fetch_end_state(&self.core, interfaces)
    }

    /// Record a transition into `to` and push its start state backward.
    pub fn send_backward(
        &mut self,
        interfaces: &mut Interfaces<P::World>,
        to: StateId,
        propagated: Propagated<P::World, P::Transition>,
    ) -> Result<StateId, StageError> {
        self.core.send_backward(interfaces, to, propagated)
    }

    /// The domain solver.
    pub fn solver(&self) -> &P {
        &self.solver
    }

    /// The domain solver, mutably.
    pub fn solver_mut(&mut self) -> &mut P {
        &mut self.solver
    }
}

impl<P: PropagateBackward> Stage<P::World, P::Transition> for PropagatingBackward<P> {
    fn core(&self) -> &StageCore<P::Transition> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StageCore<P::Transition> {
        &mut self.core
    }

    fn announced_flags(&self) -> InterfaceFlags {
        Direction::Backward.announced_flags()
    }

    fn can_compute(&self, interfaces: &Interfaces<P::World>) -> bool {
        self.backward.ready(&self.core, interfaces)
    }

    fn compute(&mut self, interfaces: &mut Interfaces<P::World>) -> Result<bool, StageError> {
        self.core.metrics_mut().compute_calls += 1;
        if !self.backward.ready(&self.core, interfaces) {
            return Ok(false);
        }
        self.backward.step(&mut self.core, &mut self.solver, interfaces)
    }
}
