//! A round-robin reference driver.
//!
//! [`Pipeline`] owns the [`Interfaces`] table and a list of boxed stages
//! in insertion order. It knows nothing about solution quality: a cycle
//! visits every stage once and calls `compute()` on the ones that report
//! they can make progress.

use indexmap::IndexMap;
use stagecraft_core::{InterfaceFlags, Interfaces, StageError, StageId, TopologyError};
use stagecraft_stage::{Stage, Wiring};

/// Boxed stages plus the interface table they share.
pub struct Pipeline<W, T> {
    interfaces: Interfaces<W>,
    stages: IndexMap<StageId, Box<dyn Stage<W, T>>>,
}

impl<W, T> Pipeline<W, T> {
    pub fn new() -> Self {
        Self {
            interfaces: Interfaces::new(),
            stages: IndexMap::new(),
        }
    }

    pub fn interfaces(&self) -> &Interfaces<W> {
        &self.interfaces
    }

    /// Needed to construct stages, which create their own queues.
    pub fn interfaces_mut(&mut self) -> &mut Interfaces<W> {
        &mut self.interfaces
    }

    /// Append a stage at the end of the pipeline.
    pub fn push(&mut self, stage: impl Stage<W, T> + 'static) -> StageId {
        let id = stage.id();
        self.stages.insert(id, Box::new(stage));
        id
    }

    pub fn stage(&self, id: StageId) -> Option<&dyn Stage<W, T>> {
        self.stages.get(&id).map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Apply explicit wiring to one stage.
    pub fn wire(&mut self, id: StageId, wiring: Wiring) -> Result<(), TopologyError> {
        match self.stages.get_mut(&id) {
            Some(stage) => stage.wire(wiring),
            None => Ok(()),
        }
    }

    /// Wire each stage to its insertion-order neighbors.
    ///
    /// A stage writes into the next stage's input when it announces
    /// `WRITES_NEXT_INPUT` and that input exists, and into the previous
    /// stage's output when it announces `WRITES_PREV_OUTPUT` and that
    /// output exists.
    pub fn wire_serial(&mut self) -> Result<(), TopologyError> {
        let own: Vec<_> = self
            .stages
            .values()
            .map(|s| (s.announced_flags(), s.core().input(), s.core().output()))
            .collect();
        let wirings: Vec<Wiring> = (0..own.len())
            .map(|i| {
                let (flags, _, _) = own[i];
                let mut wiring = Wiring::none();
                if flags.contains(InterfaceFlags::WRITES_PREV_OUTPUT) && i > 0 {
                    wiring.prev_output = own[i - 1].2;
                }
                if flags.contains(InterfaceFlags::WRITES_NEXT_INPUT) {
                    wiring.next_input = own.get(i + 1).and_then(|next| next.1);
                }
                wiring
            })
            .collect();
        for (stage, wiring) in self.stages.values_mut().zip(wirings) {
            stage.wire(wiring)?;
        }
        Ok(())
    }

    /// Visit every stage once. Returns how many stages produced a segment.
    pub fn cycle(&mut self) -> Result<usize, StageError> {
        let mut produced = 0;
        for stage in self.stages.values_mut() {
            if stage.can_compute(&self.interfaces) && stage.compute(&mut self.interfaces)? {
                produced += 1;
            }
        }
        Ok(produced)
    }

    /// Whether any stage could make progress.
    pub fn can_compute(&self) -> bool {
        self.stages.values().any(|s| s.can_compute(&self.interfaces))
    }

    /// Run cycles until no stage can compute or `max_cycles` is reached.
    /// Returns the number of cycles run.
    pub fn run(&mut self, max_cycles: usize) -> Result<usize, StageError> {
        let mut cycles = 0;
        while cycles < max_cycles && self.can_compute() {
            self.cycle()?;
            cycles += 1;
        }
        Ok(cycles)
    }

    /// One summary line per stage.
    pub fn report(&self) -> String {
        self.stages
            .values()
            .map(|s| s.summary(&self.interfaces).to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<W, T> Default for Pipeline<W, T> {
    fn default() -> Self {
        Self::new()
    }
}
