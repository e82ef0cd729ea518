//! The [`Stage`] trait and the data every stage shares.
//!
//! A stage owns up to two queues (its input and output [`Interface`]s,
//! stored in the hierarchy's [`Interfaces`] table) and holds non-owning
//! handles to two neighbor queues supplied by [`Wiring`]. It records
//! every transition it computes as a [`SolutionSegment`].
//!
//! [`Interface`]: stagecraft_core::Interface

use stagecraft_core::{
    ExtensionFailure, InterfaceFlags, InterfaceId, InterfaceState, Interfaces, QueueSide,
    SegmentId, SolutionSegment, StageError, StageId, StateId, TopologyError,
};

use crate::config::{ConfigError, StageConfig};
use crate::extension::Propagated;
use crate::metrics::StageMetrics;
use crate::summary::StageSummary;

/// Handles to the neighbor queues a stage writes into.
///
/// Supplied by the enclosing hierarchy. Applying the same wiring twice
/// is a no-op; see [`Stage::wire`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Wiring {
    /// Output queue of the preceding stage (target of backward sends).
    pub prev_output: Option<InterfaceId>,
    /// Input queue of the following stage (target of forward sends).
    pub next_input: Option<InterfaceId>,
}

impl Wiring {
    /// No neighbors.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the preceding stage's output queue.
    #[must_use]
    pub fn with_prev_output(mut self, id: InterfaceId) -> Self {
        self.prev_output = Some(id);
        self
    }

    /// Set the following stage's input queue.
    #[must_use]
    pub fn with_next_input(mut self, id: InterfaceId) -> Self {
        self.next_input = Some(id);
        self
    }

    /// Returns `true` if any neighbor is wired.
    pub fn is_connected(&self) -> bool {
        self.prev_output.is_some() || self.next_input.is_some()
    }
}

/// Identity, queues, wiring and results common to all stage kinds.
#[derive(Debug)]
pub struct StageCore<T> {
    id: StageId,
    name: String,
    config: StageConfig,
    input: Option<InterfaceId>,
    output: Option<InterfaceId>,
    wiring: Wiring,
    segments: Vec<SolutionSegment<T>>,
    metrics: StageMetrics,
}

impl<T> StageCore<T> {
    /// Core with the default configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: StageId::next(),
            name: name.into(),
            config: StageConfig::default(),
            input: None,
            output: None,
            wiring: Wiring::none(),
            segments: Vec::new(),
            metrics: StageMetrics::default(),
        }
    }

    /// Core with a validated configuration.
    pub fn with_config(name: impl Into<String>, config: StageConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut core = Self::new(name);
        core.config = config;
        Ok(core)
    }

    /// Unique stage identifier.
    pub fn id(&self) -> StageId {
        self.id
    }

    /// Human-readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Active configuration.
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// The stage's own input queue, if it reads one.
    pub fn input(&self) -> Option<InterfaceId> {
        self.input
    }

    /// The stage's own output queue, if it reads one.
    pub fn output(&self) -> Option<InterfaceId> {
        self.output
    }

    /// Preceding stage's output queue.
    pub fn prev_output(&self) -> Option<InterfaceId> {
        self.wiring.prev_output
    }

    /// Following stage's input queue.
    pub fn next_input(&self) -> Option<InterfaceId> {
        self.wiring.next_input
    }

    /// Current wiring.
    pub fn wiring(&self) -> Wiring {
        self.wiring
    }

    /// Returns `true` once any neighbor queue is wired.
    pub fn is_connected(&self) -> bool {
        self.wiring.is_connected()
    }

    /// Flags implied by the queues actually present.
    pub fn deduced_flags(&self) -> InterfaceFlags {
        let mut f = InterfaceFlags::empty();
        if self.input.is_some() {
            f |= InterfaceFlags::READS_INPUT;
        }
        if self.output.is_some() {
            f |= InterfaceFlags::READS_OUTPUT;
        }
        if self.wiring.prev_output.is_some() {
            f |= InterfaceFlags::WRITES_PREV_OUTPUT;
        }
        if self.wiring.next_input.is_some() {
            f |= InterfaceFlags::WRITES_NEXT_INPUT;
        }
        f
    }

    /// Every recorded segment, successful or failed, in creation order.
    pub fn segments(&self) -> &[SolutionSegment<T>] {
        &self.segments
    }

    /// Successful segments (transitions, bridges and seeds).
    pub fn solutions(&self) -> impl Iterator<Item = &SolutionSegment<T>> {
        self.segments.iter().filter(|s| !s.is_failed())
    }

    /// Failed attempts kept for diagnostics.
    pub fn failures(&self) -> impl Iterator<Item = &SolutionSegment<T>> {
        self.segments.iter().filter(|s| s.is_failed())
    }

    /// Look up a segment owned by this stage.
    pub fn segment(&self, id: SegmentId) -> Option<&SolutionSegment<T>> {
        if id.stage != self.id {
            return None;
        }
        self.segments.get(id.index as usize)
    }

    /// Work counters.
    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    /// Apply `wiring`, keeping deduced flags within `announced`.
    pub fn wire(&mut self, wiring: Wiring, announced: InterfaceFlags) -> Result<(), TopologyError> {
        if wiring == self.wiring {
            return Ok(());
        }
        if self.is_connected() {
            return Err(TopologyError::AlreadyConnected {
                stage: self.name.clone(),
            });
        }
        for (id, flag) in [
            (wiring.prev_output, InterfaceFlags::WRITES_PREV_OUTPUT),
            (wiring.next_input, InterfaceFlags::WRITES_NEXT_INPUT),
        ] {
            if id.is_some() && !announced.contains(flag) {
                return Err(TopologyError::UndeclaredWrite {
                    stage: self.name.clone(),
                    flag,
                });
            }
        }
        tracing::trace!(stage = %self.name, ?wiring, "wired");
        self.wiring = wiring;
        Ok(())
    }

    pub(crate) fn set_input(&mut self, id: Option<InterfaceId>) {
        self.input = id;
    }

    pub(crate) fn set_output(&mut self, id: Option<InterfaceId>) {
        self.output = id;
    }

    pub(crate) fn metrics_mut(&mut self) -> &mut StageMetrics {
        &mut self.metrics
    }

    /// The neighbor queue on `side`, or `NotWired`.
    pub(crate) fn require(&self, side: QueueSide) -> Result<InterfaceId, TopologyError> {
        let id = match side {
            QueueSide::PrevOutput => self.wiring.prev_output,
            QueueSide::NextInput => self.wiring.next_input,
        };
        id.ok_or_else(|| TopologyError::NotWired {
            stage: self.name.clone(),
            side,
        })
    }

    pub(crate) fn next_segment_id(&self) -> SegmentId {
        SegmentId {
            stage: self.id,
            index: self.segments.len() as u32,
        }
    }

    pub(crate) fn push_segment(&mut self, segment: SolutionSegment<T>) -> SegmentId {
        let id = segment.id();
        debug_assert_eq!(id, self.next_segment_id());
        self.segments.push(segment);
        id
    }

    pub(crate) fn admit(&self, cost: f64) -> Result<(), ExtensionFailure> {
        self.config.admit(cost)
    }

    /// Count an absorbed failure and keep it if configured to.
    pub(crate) fn record_failure(
        &mut self,
        start: Option<StateId>,
        end: Option<StateId>,
        failure: &ExtensionFailure,
    ) {
        self.metrics.extension_failures += 1;
        tracing::trace!(stage = %self.name, reason = failure.reason(), "extension failed");
        if self.config.record_failures {
            let id = self.next_segment_id();
            self.push_segment(SolutionSegment::failed(id, start, end, failure.reason()));
        }
    }

    /// Record a forward transition from `from` and push its end state
    /// into the following stage's input queue.
    pub(crate) fn send_forward<W>(
        &mut self,
        interfaces: &mut Interfaces<W>,
        from: StateId,
        propagated: Propagated<W, T>,
    ) -> Result<StateId, StageError> {
        let target = self.require(QueueSide::NextInput)?;
        let priority = interfaces
            .state(from)
            .ok_or(TopologyError::UnknownInterface(from.interface))?
            .priority()
            .extend(propagated.cost);
        let segment = self.next_segment_id();
        let state = InterfaceState::new(propagated.world, priority).with_incoming(segment);
        let end = interfaces.append(target, state)?;
        self.push_segment(SolutionSegment::transition(
            segment,
            from,
            end,
            propagated.transition,
            propagated.cost,
        ));
        self.metrics.successes += 1;
        self.metrics.states_emitted += 1;
        tracing::debug!(
            stage = %self.name,
            %from,
            %end,
            cost = propagated.cost,
            "sent state forward"
        );
        Ok(end)
    }

    /// Record a backward transition into `to` and push its start state
    /// into the preceding stage's output queue.
    pub(crate) fn send_backward<W>(
        &mut self,
        interfaces: &mut Interfaces<W>,
        to: StateId,
        propagated: Propagated<W, T>,
    ) -> Result<StateId, StageError> {
        let target = self.require(QueueSide::PrevOutput)?;
        let priority = interfaces
            .state(to)
            .ok_or(TopologyError::UnknownInterface(to.interface))?
            .priority()
            .extend(propagated.cost);
        let segment = self.next_segment_id();
        let state = InterfaceState::new(propagated.world, priority).with_outgoing(segment);
        let start = interfaces.append(target, state)?;
        self.push_segment(SolutionSegment::transition(
            segment,
            start,
            to,
            propagated.transition,
            propagated.cost,
        ));
        self.metrics.successes += 1;
        self.metrics.states_emitted += 1;
        tracing::debug!(
            stage = %self.name,
            %start,
            %to,
            cost = propagated.cost,
            "sent state backward"
        );
        Ok(start)
    }
}

/// A pipeline step driven by an external scheduler.
///
/// The driver repeatedly asks [`can_compute`](Self::can_compute) and, if
/// it returns true, calls [`compute`](Self::compute) once. A single
/// `compute()` performs a bounded amount of work and reports whether it
/// produced anything.
///
/// # Object safety
///
/// This trait is object-safe; drivers typically hold
/// `Vec<Box<dyn Stage<W, T>>>`.
pub trait Stage<W, T> {
    /// Shared stage data.
    fn core(&self) -> &StageCore<T>;

    /// Shared stage data, mutably.
    fn core_mut(&mut self) -> &mut StageCore<T>;

    /// Static declaration of which queues the stage reads and writes.
    fn announced_flags(&self) -> InterfaceFlags;

    /// Whether a `compute()` call could make progress right now.
    fn can_compute(&self, interfaces: &Interfaces<W>) -> bool;

    /// Perform at most one unit of work.
    ///
    /// Returns `Ok(true)` if a new segment was produced. Extension
    /// failures are absorbed and reported as `Ok(false)`.
    fn compute(&mut self, interfaces: &mut Interfaces<W>) -> Result<bool, StageError>;

    /// Human-readable name.
    fn name<'a>(&'a self) -> &'a str
    where
        T: 'a,
    {
        self.core().name()
    }

    /// Unique stage identifier.
    fn id(&self) -> StageId {
        self.core().id()
    }

    /// Flags implied by the queues actually present.
    fn deduced_flags(&self) -> InterfaceFlags {
        self.core().deduced_flags()
    }

    /// Effective flags: own-queue bits as deduced, neighbor-write bits
    /// as announced.
    fn interface_flags(&self) -> InterfaceFlags {
        InterfaceFlags::reconcile(self.announced_flags(), self.deduced_flags())
    }

    /// Returns `true` once any neighbor queue is wired.
    fn is_connected(&self) -> bool {
        self.core().is_connected()
    }

    /// Attach the neighbor queues.
    ///
    /// Idempotent for identical wiring. Fails with
    /// [`TopologyError::AlreadyConnected`] when changing the wiring of a
    /// connected stage, and with [`TopologyError::UndeclaredWrite`] when
    /// wiring a neighbor the stage did not announce a write for.
    fn wire(&mut self, wiring: Wiring) -> Result<(), TopologyError> {
        let announced = self.announced_flags();
        self.core_mut().wire(wiring, announced)
    }

    /// One-line overview of queue sizes, flow and solution count.
    fn summary<'a>(&'a self, interfaces: &Interfaces<W>) -> StageSummary<'a>
    where
        T: 'a,
    {
        StageSummary::new(self.core(), interfaces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stagecraft_core::{Cursor, LogicError, Priority};

    type F = InterfaceFlags;

    fn seeded(interfaces: &mut Interfaces<u32>, cost: f64) -> StateId {
        let id = interfaces.create();
        interfaces
            .append(id, InterfaceState::new(Arc::new(0), Priority::seed(cost)))
            .unwrap()
    }

    #[test]
    fn deduced_flags_follow_queues_and_wiring() {
        let mut core: StageCore<()> = StageCore::new("s");
        assert!(core.deduced_flags().is_empty());
        core.set_input(Some(InterfaceId(0)));
        let announced = F::READS_INPUT | F::WRITES_NEXT_INPUT;
        core.wire(Wiring::none().with_next_input(InterfaceId(1)), announced)
            .unwrap();
        assert_eq!(core.deduced_flags(), F::READS_INPUT | F::WRITES_NEXT_INPUT);
    }

    #[test]
    fn wiring_is_idempotent() {
        let mut core: StageCore<()> = StageCore::new("s");
        let w = Wiring::none().with_next_input(InterfaceId(3));
        core.wire(w, F::WRITES_NEXT_INPUT).unwrap();
        core.wire(w, F::WRITES_NEXT_INPUT).unwrap();
        assert_eq!(core.wiring(), w);
    }

    #[test]
    fn rewiring_a_connected_stage_fails() {
        let mut core: StageCore<()> = StageCore::new("s");
        core.wire(Wiring::none().with_next_input(InterfaceId(3)), F::EXT_IF_MASK)
            .unwrap();
        let err = core
            .wire(Wiring::none().with_next_input(InterfaceId(4)), F::EXT_IF_MASK)
            .unwrap_err();
        assert!(matches!(err, TopologyError::AlreadyConnected { .. }));
    }

    #[test]
    fn wiring_unannounced_side_fails() {
        let mut core: StageCore<()> = StageCore::new("s");
        let err = core
            .wire(
                Wiring::none().with_prev_output(InterfaceId(0)),
                F::READS_INPUT | F::WRITES_NEXT_INPUT,
            )
            .unwrap_err();
        assert_eq!(
            err,
            TopologyError::UndeclaredWrite {
                stage: "s".into(),
                flag: F::WRITES_PREV_OUTPUT,
            }
        );
        assert!(!core.is_connected());
    }

    #[test]
    fn send_forward_links_segment_and_state() {
        let mut interfaces = Interfaces::new();
        let from = seeded(&mut interfaces, 1.0);
        let next = interfaces.create();
        let mut core: StageCore<&str> = StageCore::new("fwd");
        core.wire(Wiring::none().with_next_input(next), F::WRITES_NEXT_INPUT)
            .unwrap();

        let end = core
            .send_forward(&mut interfaces, from, Propagated::new(5u32, Some("move"), 2.0))
            .unwrap();

        assert_eq!(end, StateId::new(next, Cursor::BEGIN));
        let state = interfaces.state(end).unwrap();
        assert_eq!(state.priority(), Priority::new(1, 3.0));
        let seg = core.segment(state.incoming().unwrap()).unwrap();
        assert_eq!(seg.start(), Some(from));
        assert_eq!(seg.end(), Some(end));
        assert_eq!(seg.transition_payload(), Some(&"move"));
        assert_eq!(core.metrics().states_emitted, 1);
    }

    #[test]
    fn send_backward_links_segment_and_state() {
        let mut interfaces = Interfaces::new();
        let to = seeded(&mut interfaces, 0.0);
        let prev = interfaces.create();
        let mut core: StageCore<()> = StageCore::new("bwd");
        core.wire(Wiring::none().with_prev_output(prev), F::WRITES_PREV_OUTPUT)
            .unwrap();

        let start = core
            .send_backward(&mut interfaces, to, Propagated::new(1u32, None, 4.0))
            .unwrap();

        let state = interfaces.state(start).unwrap();
        let seg = core.segment(state.outgoing().unwrap()).unwrap();
        assert_eq!(seg.start(), Some(start));
        assert_eq!(seg.end(), Some(to));
        assert_eq!(state.cost(), 4.0);
    }

    #[test]
    fn send_without_neighbor_is_not_wired() {
        let mut interfaces = Interfaces::new();
        let from = seeded(&mut interfaces, 0.0);
        let mut core: StageCore<()> = StageCore::new("lonely");
        let err = core
            .send_forward(&mut interfaces, from, Propagated::new(0u32, None, 0.0))
            .unwrap_err();
        assert_eq!(
            err,
            StageError::Topology(TopologyError::NotWired {
                stage: "lonely".into(),
                side: QueueSide::NextInput,
            })
        );
        assert!(core.segments().is_empty());
    }

    #[test]
    fn failures_recorded_only_when_configured() {
        let failure = ExtensionFailure::new("blocked");
        let mut quiet: StageCore<()> = StageCore::new("quiet");
        quiet.record_failure(None, None, &failure);
        assert!(quiet.segments().is_empty());
        assert_eq!(quiet.metrics().extension_failures, 1);

        let config = StageConfig {
            record_failures: true,
            ..StageConfig::default()
        };
        let mut loud: StageCore<()> = StageCore::with_config("loud", config).unwrap();
        loud.record_failure(None, None, &failure);
        assert_eq!(loud.failures().count(), 1);
        assert_eq!(loud.solutions().count(), 0);
    }

    #[test]
    fn segment_lookup_rejects_foreign_ids() {
        let a: StageCore<()> = StageCore::new("a");
        let b: StageCore<()> = StageCore::new("b");
        let foreign = SegmentId {
            stage: b.id(),
            index: 0,
        };
        assert!(a.segment(foreign).is_none());
    }

    /// Borrows its payloads, so the transition type is not `'static`.
    struct Borrowing<'p> {
        core: StageCore<&'p str>,
        payload: &'p str,
    }

    impl<'p> Stage<u32, &'p str> for Borrowing<'p> {
        fn core(&self) -> &StageCore<&'p str> {
            &self.core
        }

        fn core_mut(&mut self) -> &mut StageCore<&'p str> {
            &mut self.core
        }

        fn announced_flags(&self) -> InterfaceFlags {
            F::empty()
        }

        fn can_compute(&self, _interfaces: &Interfaces<u32>) -> bool {
            false
        }

        fn compute(&mut self, _interfaces: &mut Interfaces<u32>) -> Result<bool, StageError> {
            Ok(false)
        }
    }

    #[test]
    fn provided_methods_work_through_trait_objects() {
        let payload = String::from("step");
        let stage = Borrowing {
            core: StageCore::new("borrowed"),
            payload: payload.as_str(),
        };
        let interfaces: Interfaces<u32> = Interfaces::new();
        assert_eq!(stage.payload, "step");

        let dynamic: &dyn Stage<u32, &str> = &stage;
        assert_eq!(dynamic.name(), "borrowed");
        assert!(dynamic.summary(&interfaces).to_string().ends_with(" / borrowed"));
        assert!(!dynamic.is_connected());
    }

    #[test]
    fn logic_error_converts_into_stage_error() {
        let e: StageError = LogicError::NoEndState { stage: "x".into() }.into();
        assert!(matches!(e, StageError::Logic(_)));
    }
}
