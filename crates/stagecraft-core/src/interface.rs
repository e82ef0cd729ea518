//! Append-only [`Interface`] queues and the [`Interfaces`] table.
//!
//! An interface is the queue through which two neighboring stages
//! exchange [`InterfaceState`]s. Elements are only ever appended, so a
//! [`Cursor`] obtained at any time keeps addressing the same element
//! forever. A cursor equal to [`Interface::end`] before an append
//! addresses the appended element afterwards: keeping consumers current
//! is an index comparison, not a pointer fix-up.

use std::fmt;

use crate::error::TopologyError;
use crate::id::{InterfaceId, StateId};
use crate::state::InterfaceState;

/// A position within one [`Interface`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cursor(usize);

impl Cursor {
    /// The first position of every interface.
    pub const BEGIN: Self = Self(0);

    /// Cursor at an explicit index.
    pub fn at(index: usize) -> Self {
        Self(index)
    }

    /// The following position.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Index into the interface.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callback fired after every append, with the new element's cursor.
pub type GrowthHook<W> = Box<dyn FnMut(Cursor, &InterfaceState<W>)>;

/// Ordered, append-only queue of [`InterfaceState`]s.
///
/// Insertion order is discovery order, not cost order.
pub struct Interface<W> {
    states: Vec<InterfaceState<W>>,
    hooks: Vec<GrowthHook<W>>,
}

impl<W> Interface<W> {
    /// Create an empty interface.
    pub fn new() -> Self {
        Self {
            states: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Register a growth hook.
    ///
    /// Hooks run synchronously inside [`append`](Self::append), after the
    /// element is stored, in registration order.
    pub fn on_growth(&mut self, hook: impl FnMut(Cursor, &InterfaceState<W>) + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Append a state at the tail and notify growth hooks.
    pub fn append(&mut self, state: InterfaceState<W>) -> Cursor {
        let cursor = self.end();
        self.states.push(state);
        let appended = &self.states[cursor.0];
        for hook in &mut self.hooks {
            hook(cursor, appended);
        }
        cursor
    }

    /// Cursor at the first element.
    pub fn begin(&self) -> Cursor {
        Cursor::BEGIN
    }

    /// Cursor one past the last element.
    pub fn end(&self) -> Cursor {
        Cursor(self.states.len())
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` if nothing was appended yet.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The state at `cursor`, or `None` at or past `end()`.
    pub fn get(&self, cursor: Cursor) -> Option<&InterfaceState<W>> {
        self.states.get(cursor.0)
    }

    /// Iterate over all states in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Cursor, &InterfaceState<W>)> {
        self.iter_from(Cursor::BEGIN)
    }

    /// Iterate from `cursor` to the current end.
    pub fn iter_from(&self, cursor: Cursor) -> impl Iterator<Item = (Cursor, &InterfaceState<W>)> {
        self.states
            .iter()
            .enumerate()
            .skip(cursor.0)
            .map(|(i, s)| (Cursor(i), s))
    }
}

impl<W> Default for Interface<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> fmt::Debug for Interface<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interface")
            .field("len", &self.states.len())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Table owning every [`Interface`] of a pipeline.
///
/// Owned by the enclosing hierarchy; stages refer to entries through
/// [`InterfaceId`] handles. Slots are never freed, so a handle never
/// dangles or aliases a newer interface.
pub struct Interfaces<W> {
    slots: Vec<Interface<W>>,
}

impl<W> Interfaces<W> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Allocate a fresh, empty interface.
    pub fn create(&mut self) -> InterfaceId {
        let id = InterfaceId(self.slots.len() as u32);
        self.slots.push(Interface::new());
        id
    }

    /// Look up an interface.
    pub fn get(&self, id: InterfaceId) -> Option<&Interface<W>> {
        self.slots.get(id.0 as usize)
    }

    /// Look up an interface for mutation (e.g. to register hooks).
    pub fn get_mut(&mut self, id: InterfaceId) -> Option<&mut Interface<W>> {
        self.slots.get_mut(id.0 as usize)
    }

    /// Look up a single state.
    pub fn state(&self, id: StateId) -> Option<&InterfaceState<W>> {
        self.get(id.interface)?.get(id.position)
    }

    /// Append a state to the interface `id`.
    pub fn append(
        &mut self,
        id: InterfaceId,
        state: InterfaceState<W>,
    ) -> Result<StateId, TopologyError> {
        let interface = self
            .get_mut(id)
            .ok_or(TopologyError::UnknownInterface(id))?;
        let position = interface.append(state);
        Ok(StateId::new(id, position))
    }

    /// Length of interface `id`, or `None` if unknown.
    pub fn len_of(&self, id: InterfaceId) -> Option<usize> {
        self.get(id).map(Interface::len)
    }

    /// Number of interfaces in the table.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no interface was created yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<W> Default for Interfaces<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> fmt::Debug for Interfaces<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slots.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Priority;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn state(v: u32) -> InterfaceState<u32> {
        InterfaceState::new(Arc::new(v), Priority::seed(f64::from(v)))
    }

    #[test]
    fn append_returns_tail_position() {
        let mut iface = Interface::new();
        assert_eq!(iface.append(state(1)), Cursor::BEGIN);
        assert_eq!(iface.append(state(2)), Cursor::at(1));
        assert_eq!(iface.end(), Cursor::at(2));
        assert_eq!(iface.len(), 2);
    }

    #[test]
    fn end_cursor_addresses_next_append() {
        let mut iface = Interface::new();
        iface.append(state(1));
        let cursor = iface.end();
        assert!(iface.get(cursor).is_none());

        iface.append(state(9));
        assert_ne!(cursor, iface.end());
        assert_eq!(**iface.get(cursor).unwrap().world(), 9);
    }

    #[test]
    fn hooks_see_fully_appended_element() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut iface = Interface::new();
        let log = Rc::clone(&seen);
        iface.on_growth(move |cursor, s: &InterfaceState<u32>| {
            log.borrow_mut().push((cursor, **s.world()));
        });
        iface.append(state(4));
        iface.append(state(5));
        assert_eq!(*seen.borrow(), vec![(Cursor::at(0), 4), (Cursor::at(1), 5)]);
    }

    #[test]
    fn hooks_fire_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut iface = Interface::new();
        for tag in ["first", "second"] {
            let order = Rc::clone(&order);
            iface.on_growth(move |_, _: &InterfaceState<u32>| order.borrow_mut().push(tag));
        }
        iface.append(state(0));
        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn iter_from_skips_consumed() {
        let mut iface = Interface::new();
        for v in 0..4 {
            iface.append(state(v));
        }
        let rest: Vec<u32> = iface.iter_from(Cursor::at(2)).map(|(_, s)| **s.world()).collect();
        assert_eq!(rest, vec![2, 3]);
        assert_eq!(iface.iter_from(iface.end()).count(), 0);
    }

    #[test]
    fn table_appends_and_resolves_states() {
        let mut table = Interfaces::new();
        let a = table.create();
        let b = table.create();
        assert_ne!(a, b);
        let id = table.append(b, state(3)).unwrap();
        assert_eq!(id, StateId::new(b, Cursor::BEGIN));
        assert_eq!(**table.state(id).unwrap().world(), 3);
        assert_eq!(table.len_of(a), Some(0));
        assert_eq!(table.len_of(b), Some(1));
    }

    #[test]
    fn table_rejects_unknown_interface() {
        let mut table: Interfaces<u32> = Interfaces::new();
        let err = table.append(InterfaceId(5), state(0)).unwrap_err();
        assert_eq!(err, TopologyError::UnknownInterface(InterfaceId(5)));
    }

    proptest! {
        #[test]
        fn cursors_survive_appends(
            before in prop::collection::vec(0u32..1000, 0..32),
            after in prop::collection::vec(0u32..1000, 1..32),
        ) {
            let mut iface = Interface::new();
            for v in &before {
                iface.append(state(*v));
            }
            let snapshot: Vec<(Cursor, u32)> =
                iface.iter().map(|(c, s)| (c, **s.world())).collect();
            let end = iface.end();

            for v in &after {
                iface.append(state(*v));
            }

            for (cursor, value) in snapshot {
                prop_assert_eq!(**iface.get(cursor).unwrap().world(), value);
            }
            prop_assert_eq!(**iface.get(end).unwrap().world(), after[0]);
        }
    }
}
