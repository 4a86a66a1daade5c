// state_machine.rs - Generic table-driven state machine.
//
// The same engine drives two very different machines: the per-enemy AI
// (enemy_ai.rs) and the whole stage session (session.rs). Each machine is
// parameterized by a context type C (where all persistent data lives), a
// state key K (a small Copy enum), and an event type E.
//
// Transition logic is table-driven: the builder registers (from, event) -> to
// entries once at startup, and states request transitions by returning an
// event from update(). Because enter() and exit() return nothing, a state
// cannot trigger a transition from inside its own enter/exit - reentrant
// transitions are unrepresentable rather than merely discouraged.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// One state's lifecycle hooks. States hold no persistent data of their own;
/// everything that must survive a frame lives on the context `C`. That keeps
/// the cached instances freely reusable across transitions.
pub trait State<C, E>: Send + Sync {
    /// Runs once when the machine switches into this state.
    fn enter(&mut self, _ctx: &mut C) {}

    /// Runs once per tick while this state is active. Returning `Some(event)`
    /// asks the machine to look the event up in the transition table.
    fn update(&mut self, ctx: &mut C) -> Option<E>;

    /// Runs once when the machine switches away from this state.
    fn exit(&mut self, _ctx: &mut C) {}
}

pub struct StateMachine<C, K, E> {
    states: HashMap<K, Box<dyn State<C, E>>>,
    transitions: HashMap<(K, E), K>,
    active: Option<K>,
    /// Guards against handle() re-entering itself. With the current State
    /// trait this cannot happen, but the invariant is cheap to keep checked.
    handling: bool,
}

impl<C, K, E> StateMachine<C, K, E>
where
    K: Copy + Eq + Hash + Debug,
    E: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            transitions: HashMap::new(),
            active: None,
            handling: false,
        }
    }

    /// Registers the single cached instance for `key`. Instances are reused
    /// for every visit to the state, never reallocated per transition.
    pub fn add_state(&mut self, key: K, state: Box<dyn State<C, E>>) -> &mut Self {
        self.states.insert(key, state);
        self
    }

    /// Registers a table entry. A duplicate (from, event) pair silently
    /// overwrites the earlier one - last registration wins, which is what
    /// builder-style table assembly at startup expects.
    pub fn add_transition(&mut self, from: K, event: E, to: K) -> &mut Self {
        self.transitions.insert((from, event), to);
        self
    }

    /// Sets the starting state and runs its enter(). Must be called exactly
    /// once, before the first update(). Calling it twice, or with a key that
    /// was never registered, is a programming error.
    pub fn set_initial(&mut self, key: K, ctx: &mut C) {
        assert!(
            self.active.is_none(),
            "set_initial called twice (already in {:?})",
            self.active.unwrap()
        );
        let state = self
            .states
            .get_mut(&key)
            .unwrap_or_else(|| panic!("initial state {key:?} was never registered"));
        state.enter(ctx);
        self.active = Some(key);
    }

    pub fn active(&self) -> Option<K> {
        self.active
    }

    pub fn is_in(&self, key: K) -> bool {
        self.active == Some(key)
    }

    /// Ticks the active state. If its update() requests an event, the event
    /// is processed before this call returns, so the next update() already
    /// runs in the new state.
    pub fn update(&mut self, ctx: &mut C) {
        let key = self
            .active
            .expect("update called before set_initial");
        let event = self
            .states
            .get_mut(&key)
            .unwrap_or_else(|| panic!("active state {key:?} has no registered instance"))
            .update(ctx);
        if let Some(event) = event {
            self.handle(event, ctx);
        }
    }

    /// Looks up (active state, event) in the table. On a hit, runs exit() on
    /// the old state and enter() on the new one, in that order, exactly once
    /// each, and returns true. An event with no matching entry is a no-op
    /// (not an error), so producers may fire speculative events freely.
    pub fn handle(&mut self, event: E, ctx: &mut C) -> bool {
        assert!(
            !self.handling,
            "transition requested while another transition is in flight"
        );
        let from = self
            .active
            .expect("handle called before set_initial");
        let Some(&to) = self.transitions.get(&(from, event)) else {
            return false;
        };

        self.handling = true;
        self.states
            .get_mut(&from)
            .unwrap_or_else(|| panic!("state {from:?} has no registered instance"))
            .exit(ctx);
        self.states
            .get_mut(&to)
            .unwrap_or_else(|| panic!("transition target {to:?} was never registered"))
            .enter(ctx);
        self.active = Some(to);
        self.handling = false;
        true
    }
}

impl<C, K, E> Default for StateMachine<C, K, E>
where
    K: Copy + Eq + Hash + Debug,
    E: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    enum Key {
        A,
        B,
    }

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    enum Ev {
        Go,
        Noise,
    }

    /// Context that counts lifecycle calls so the tests can assert on the
    /// exact enter/exit choreography.
    #[derive(Default)]
    struct Counts {
        a_enters: u32,
        a_exits: u32,
        b_enters: u32,
        b_updates: u32,
        emit: Option<Ev>,
    }

    struct StateA;
    impl State<Counts, Ev> for StateA {
        fn enter(&mut self, ctx: &mut Counts) {
            ctx.a_enters += 1;
        }
        fn update(&mut self, ctx: &mut Counts) -> Option<Ev> {
            ctx.emit.take()
        }
        fn exit(&mut self, ctx: &mut Counts) {
            ctx.a_exits += 1;
        }
    }

    struct StateB;
    impl State<Counts, Ev> for StateB {
        fn enter(&mut self, ctx: &mut Counts) {
            ctx.b_enters += 1;
        }
        fn update(&mut self, ctx: &mut Counts) -> Option<Ev> {
            ctx.b_updates += 1;
            None
        }
    }

    fn machine() -> StateMachine<Counts, Key, Ev> {
        let mut m = StateMachine::new();
        m.add_state(Key::A, Box::new(StateA));
        m.add_state(Key::B, Box::new(StateB));
        m.add_transition(Key::A, Ev::Go, Key::B);
        m
    }

    #[test]
    fn registered_transition_runs_exit_then_enter_once() {
        let mut ctx = Counts::default();
        let mut m = machine();
        m.set_initial(Key::A, &mut ctx);
        assert_eq!(ctx.a_enters, 1);

        assert!(m.handle(Ev::Go, &mut ctx));
        assert_eq!(m.active(), Some(Key::B));
        assert_eq!(ctx.a_exits, 1);
        assert_eq!(ctx.b_enters, 1);
    }

    #[test]
    fn unmatched_event_is_a_no_op() {
        let mut ctx = Counts::default();
        let mut m = machine();
        m.set_initial(Key::A, &mut ctx);

        assert!(!m.handle(Ev::Noise, &mut ctx));
        assert_eq!(m.active(), Some(Key::A));
        assert_eq!(ctx.a_exits, 0);
        assert_eq!(ctx.b_enters, 0);
    }

    #[test]
    fn update_applies_event_returned_by_state() {
        let mut ctx = Counts::default();
        let mut m = machine();
        m.set_initial(Key::A, &mut ctx);

        ctx.emit = Some(Ev::Go);
        m.update(&mut ctx);
        assert_eq!(m.active(), Some(Key::B));

        // The following tick already runs in B.
        m.update(&mut ctx);
        assert_eq!(ctx.b_updates, 1);
    }

    #[test]
    fn duplicate_registration_overwrites() {
        let mut ctx = Counts::default();
        let mut m = machine();
        // Last registration wins: Go now loops back to A.
        m.add_transition(Key::A, Ev::Go, Key::A);
        m.set_initial(Key::A, &mut ctx);

        assert!(m.handle(Ev::Go, &mut ctx));
        assert_eq!(m.active(), Some(Key::A));
        // Self-transition still runs the full exit/enter pair.
        assert_eq!(ctx.a_exits, 1);
        assert_eq!(ctx.a_enters, 2);
    }

    #[test]
    #[should_panic(expected = "set_initial called twice")]
    fn double_set_initial_panics() {
        let mut ctx = Counts::default();
        let mut m = machine();
        m.set_initial(Key::A, &mut ctx);
        m.set_initial(Key::B, &mut ctx);
    }

    #[test]
    #[should_panic(expected = "update called before set_initial")]
    fn update_before_initial_panics() {
        let mut ctx = Counts::default();
        machine().update(&mut ctx);
    }
}
