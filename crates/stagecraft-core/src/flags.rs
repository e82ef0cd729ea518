//! The [`InterfaceFlags`] bitset and [`DataFlow`] classification.
//!
//! A stage *announces* which queues it reads and which neighbor queues it
//! writes. After wiring, the flags *deduced* from the queues it actually
//! holds must stay within the announced set.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Bitset over the four interface capabilities of a stage.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InterfaceFlags(u8);

impl InterfaceFlags {
    /// The stage consumes states from its own input queue.
    pub const READS_INPUT: Self = Self(0x01);
    /// The stage consumes states from its own output queue.
    pub const READS_OUTPUT: Self = Self(0x02);
    /// The stage pushes states into the following stage's input queue.
    pub const WRITES_NEXT_INPUT: Self = Self(0x04);
    /// The stage pushes states into the preceding stage's output queue.
    pub const WRITES_PREV_OUTPUT: Self = Self(0x08);

    /// Bits describing queues the stage owns.
    pub const OWN_IF_MASK: Self = Self(0x01 | 0x02);
    /// Bits describing neighbor queues the stage writes.
    pub const EXT_IF_MASK: Self = Self(0x04 | 0x08);
    /// Bits touching the boundary with the preceding stage.
    pub const INPUT_IF_MASK: Self = Self(0x01 | 0x08);
    /// Bits touching the boundary with the following stage.
    pub const OUTPUT_IF_MASK: Self = Self(0x02 | 0x04);

    const NAMES: [(Self, &'static str); 4] = [
        (Self::READS_INPUT, "READS_INPUT"),
        (Self::READS_OUTPUT, "READS_OUTPUT"),
        (Self::WRITES_NEXT_INPUT, "WRITES_NEXT_INPUT"),
        (Self::WRITES_PREV_OUTPUT, "WRITES_PREV_OUTPUT"),
    ];

    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build a set from raw bits, discarding unknown bits.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & 0x0f)
    }

    /// Raw bit representation.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// `self | other`.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// `self & other`.
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Bits in `self` but not in `other`.
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// True if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if `self` and `other` share at least one bit.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// True if every bit of `self` is set in `other`.
    pub const fn is_subset(self, other: Self) -> bool {
        other.contains(self)
    }

    /// Returns `true` if no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Merge announced and deduced flags into the effective flags.
    ///
    /// Own-queue bits come from `deduced` (a queue either exists or it
    /// does not); neighbor-write bits come from `announced`, since they
    /// describe a capability that holds whether or not a neighbor is
    /// currently wired.
    pub const fn reconcile(announced: Self, deduced: Self) -> Self {
        announced
            .intersection(Self::EXT_IF_MASK)
            .union(deduced.intersection(Self::OWN_IF_MASK))
    }

    /// Data flow across the boundary with the preceding stage.
    pub const fn input_flow(self) -> DataFlow {
        DataFlow::classify(
            self.intersects(Self::READS_INPUT),
            self.intersects(Self::WRITES_PREV_OUTPUT),
            true,
        )
    }

    /// Data flow across the boundary with the following stage.
    pub const fn output_flow(self) -> DataFlow {
        DataFlow::classify(
            self.intersects(Self::READS_OUTPUT),
            self.intersects(Self::WRITES_NEXT_INPUT),
            false,
        )
    }
}

impl BitOr for InterfaceFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for InterfaceFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl BitAnd for InterfaceFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl BitAndAssign for InterfaceFlags {
    fn bitand_assign(&mut self, rhs: Self) {
        *self = self.intersection(rhs);
    }
}

impl Not for InterfaceFlags {
    type Output = Self;

    fn not(self) -> Self {
        Self::from_bits_truncate(!self.0)
    }
}

impl FromIterator<InterfaceFlags> for InterfaceFlags {
    fn from_iter<I: IntoIterator<Item = InterfaceFlags>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::union)
    }
}

impl fmt::Debug for InterfaceFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(empty)");
        }
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Direction of state flow across one stage boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataFlow {
    /// States travel towards the end of the pipeline (`->`).
    Forward,
    /// States travel towards the start of the pipeline (`<-`).
    Backward,
    /// Nothing crosses the boundary (`--`).
    DeadEnd,
    /// States cross in both directions (`<>`).
    Bidirectional,
}

impl DataFlow {
    /// `reverse` is set for the input boundary, where reading moves
    /// states forward and writing moves them backward.
    const fn classify(reads: bool, writes: bool, reverse: bool) -> Self {
        match (reads, writes) {
            (true, true) => Self::Bidirectional,
            (false, false) => Self::DeadEnd,
            _ if writes != reverse => Self::Forward,
            _ => Self::Backward,
        }
    }

    /// The two-character arrow used in stage summaries.
    pub const fn arrow(self) -> &'static str {
        match self {
            Self::Forward => "->",
            Self::Backward => "<-",
            Self::DeadEnd => "--",
            Self::Bidirectional => "<>",
        }
    }
}

impl fmt::Display for DataFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.arrow())
    }
}
