//! One-line stage overview for logs and debugging.

use std::fmt;

use stagecraft_core::{InterfaceFlags, InterfaceId, Interfaces};

use crate::stage::StageCore;

/// Snapshot of a stage's queue sizes, data flow and solution count.
///
/// Renders as
///
/// ```text
///   1  3   ->  2   --  -  0 / approach
/// ```
///
/// i.e. previous-output size, input size, input-side flow, number of
/// solutions, output-side flow, output size, next-input size and the
/// stage name. A `-` marks a queue the stage does not have.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageSummary<'a> {
    name: &'a str,
    flags: InterfaceFlags,
    prev_output: Option<usize>,
    input: Option<usize>,
    solutions: usize,
    output: Option<usize>,
    next_input: Option<usize>,
}

impl<'a> StageSummary<'a> {
    /// Capture the current state of `core`.
    pub fn new<T, W>(core: &'a StageCore<T>, interfaces: &Interfaces<W>) -> Self {
        let size = |id: Option<InterfaceId>| id.and_then(|id| interfaces.len_of(id));
        Self {
            name: core.name(),
            flags: core.deduced_flags(),
            prev_output: size(core.prev_output()),
            input: size(core.input()),
            solutions: core.solutions().count(),
            output: size(core.output()),
            next_input: size(core.next_input()),
        }
    }

    /// Number of successful segments at capture time.
    pub fn solutions(&self) -> usize {
        self.solutions
    }
}

fn write_size(f: &mut fmt::Formatter<'_>, size: Option<usize>) -> fmt::Result {
    match size {
        Some(n) => write!(f, "{n:>3}"),
        None => write!(f, "{:>3}", "-"),
    }
}

impl fmt::Display for StageSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_size(f, self.prev_output)?;
        write_size(f, self.input)?;
        write!(
            f,
            "{:>5}{:>3}{:>5}",
            self.flags.input_flow(),
            self.solutions,
            self.flags.output_flow()
        )?;
        write_size(f, self.output)?;
        write_size(f, self.next_input)?;
        write!(f, " / {}", self.name)
    }
}
