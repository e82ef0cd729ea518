//! Reusable solver fixtures over an integer world.
//!
//! The world is a position on the integer line and the transition payload
//! is the signed step taken:
//!
//! - [`StepSolver`]: moves by a fixed step in either direction.
//! - [`FlakySolver`]: a [`StepSolver`] that fails after N successful calls.
//! - [`FixedState`]: generates a single seed once.
//! - [`GapConnector`]: bridges positions within reach, logging attempts.

use stagecraft_core::{ExtensionFailure, InterfaceState};
use stagecraft_stage::{
    Bridged, Connect, Extension, Generate, PropagateBackward, PropagateForward, Propagated, Seed,
};

/// Moves forward by `step`, backward by `-step`, always at `cost`.
#[derive(Clone, Debug)]
pub struct StepSolver {
    pub step: i64,
    pub cost: f64,
}

impl StepSolver {
    pub fn new(step: i64, cost: f64) -> Self {
        Self { step, cost }
    }
}

impl Extension for StepSolver {
    type World = i64;
    type Transition = i64;
}

impl PropagateForward for StepSolver {
    fn compute_forward(
        &mut self,
        from: &InterfaceState<i64>,
    ) -> Result<Propagated<i64, i64>, ExtensionFailure> {
        Ok(Propagated::new(
            **from.world() + self.step,
            Some(self.step),
            self.cost,
        ))
    }
}

impl PropagateBackward for StepSolver {
    fn compute_backward(
        &mut self,
        to: &InterfaceState<i64>,
    ) -> Result<Propagated<i64, i64>, ExtensionFailure> {
        Ok(Propagated::new(
            **to.world() - self.step,
            Some(self.step),
            self.cost,
        ))
    }
}

/// Succeeds `succeed_count` times, then fails every call.
///
/// Useful for checking that extension failures are absorbed.
#[derive(Clone, Debug)]
pub struct FlakySolver {
    pub inner: StepSolver,
    pub succeed_count: usize,
    calls: usize,
}

impl FlakySolver {
    pub fn new(inner: StepSolver, succeed_count: usize) -> Self {
        Self {
            inner,
            succeed_count,
            calls: 0,
        }
    }

    /// How many extension calls were made.
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn gate(&mut self) -> Result<(), ExtensionFailure> {
        let n = self.calls;
        self.calls += 1;
        if n >= self.succeed_count {
            return Err(ExtensionFailure::new(format!(
                "deliberate failure after {} successful calls",
                self.succeed_count
            )));
        }
        Ok(())
    }
}

impl Extension for FlakySolver {
    type World = i64;
    type Transition = i64;
}

impl PropagateForward for FlakySolver {
    fn compute_forward(
        &mut self,
        from: &InterfaceState<i64>,
    ) -> Result<Propagated<i64, i64>, ExtensionFailure> {
        self.gate()?;
        self.inner.compute_forward(from)
    }
}

impl PropagateBackward for FlakySolver {
    fn compute_backward(
        &mut self,
        to: &InterfaceState<i64>,
    ) -> Result<Propagated<i64, i64>, ExtensionFailure> {
        self.gate()?;
        self.inner.compute_backward(to)
    }
}

/// Spawns one seed the first time it is asked, then nothing.
#[derive(Clone, Debug)]
pub struct FixedState {
    pub world: i64,
    pub cost: f64,
    spawned: bool,
}

impl FixedState {
    pub fn new(world: i64, cost: f64) -> Self {
        Self {
            world,
            cost,
            spawned: false,
        }
    }
}

impl Extension for FixedState {
    type World = i64;
    type Transition = i64;
}

impl Generate for FixedState {
    fn can_generate(&self) -> bool {
        !self.spawned
    }

    fn generate(&mut self) -> Result<Vec<Seed<i64>>, ExtensionFailure> {
        if self.spawned {
            return Err(ExtensionFailure::new("already spawned"));
        }
        self.spawned = true;
        Ok(vec![Seed::new(self.world, self.cost)])
    }
}

/// Bridges two positions when they are at most `reach` apart.
///
/// The transition is the gap and so is the cost. Every attempted pair is
/// logged in `attempts`, in call order.
#[derive(Clone, Debug, Default)]
pub struct GapConnector {
    pub reach: i64,
    pub attempts: Vec<(i64, i64)>,
}

impl GapConnector {
    pub fn new(reach: i64) -> Self {
        Self {
            reach,
            attempts: Vec::new(),
        }
    }
}

impl Extension for GapConnector {
    type World = i64;
    type Transition = i64;
}

impl Connect for GapConnector {
    fn connect(
        &mut self,
        from: &InterfaceState<i64>,
        to: &InterfaceState<i64>,
    ) -> Result<Bridged<i64>, ExtensionFailure> {
        let (a, b) = (**from.world(), **to.world());
        self.attempts.push((a, b));
        let gap = b - a;
        if gap.abs() > self.reach {
            return Err(ExtensionFailure::new(format!("gap {gap} out of reach")));
        }
        Ok(Bridged {
            transition: Some(gap),
            cost: gap.abs() as f64,
        })
    }
}
