//! A cooperative finite-state machine.
//!
//! Every state of the machine is a [`StateHandler`] paired with three
//! successor states, one per [`Outcome`]. At each tick
//! [`Fsm::process_state`] runs the handler of the current state exactly once
//! and applies the transition selected by the returned outcome.
//!
//! The engine measures two quantities for the current state:
//!
//! - the **dwell time**, in milliseconds, since the first tick spent in the
//!   state;
//! - the **iteration count**, the number of consecutive ticks for which the
//!   state has been repeated because its handler returned an outcome whose
//!   successor is the state itself.
//!
//! Both are reset together on every transition, whether it comes from the
//! transition table or from [`Fsm::force_state`], and only on transitions.
//! Retry and back-off policies are left to the handlers, which read the two
//! quantities to decide when to give up.

use alloc::boxed::Box;
use alloc::vec::Vec;

use core::fmt::Debug;
use core::marker::PhantomData;

use log::debug;

use crate::clock::{Clock, elapsed_ms};
use crate::error::FsmError;

/// The result of a single run of a state handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The state reached its goal.
    Success,
    /// The state could not make progress.
    Failure,
    /// The state ran out of time, or was ended before reaching its goal.
    Timeout,
}

impl core::fmt::Display for Outcome {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
            Self::Timeout => "Timeout",
        })
    }
}

/// An identifier belonging to a dense, fixed range of states.
///
/// Identifiers index the slots of the state table, so [`StateId::index`]
/// must map every state to a distinct value lower than the table capacity.
pub trait StateId: Copy + Eq + Debug {
    /// Returns the slot of the state in the state table.
    fn index(self) -> usize;

    /// Returns a human-readable name for logs.
    fn name(self) -> &'static str;
}

/// The work performed by a state at each tick.
pub trait StateHandler<C> {
    /// Runs one unit of work for the state.
    ///
    /// `elapsed_ms` is the time spent in the state so far, and it is `0` on
    /// the first run after the state has been entered. `iterations` is the
    /// number of times the state has been repeated without a transition,
    /// and it is `0` on the first run as well.
    fn run(&mut self, ctx: &mut C, elapsed_ms: u32, iterations: u32) -> Outcome;
}

/// A [`StateHandler`] built from a closure.
///
/// Created through [`handler_fn`].
pub struct HandlerFn<C, F> {
    func: F,
    _context: PhantomData<fn(&mut C)>,
}

/// Creates a [`StateHandler`] from a closure receiving the context, the
/// elapsed time and the iteration count.
#[must_use]
#[inline]
pub fn handler_fn<C, F>(func: F) -> HandlerFn<C, F>
where
    F: FnMut(&mut C, u32, u32) -> Outcome,
{
    HandlerFn {
        func,
        _context: PhantomData,
    }
}

impl<C, F> StateHandler<C> for HandlerFn<C, F>
where
    F: FnMut(&mut C, u32, u32) -> Outcome,
{
    #[inline]
    fn run(&mut self, ctx: &mut C, elapsed_ms: u32, iterations: u32) -> Outcome {
        (self.func)(ctx, elapsed_ms, iterations)
    }
}

/// The successors of a state, one per [`Outcome`].
///
/// A successor equal to the state itself repeats the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transitions<I> {
    /// The state entered on [`Outcome::Success`].
    pub on_success: I,
    /// The state entered on [`Outcome::Failure`].
    pub on_failure: I,
    /// The state entered on [`Outcome::Timeout`].
    pub on_timeout: I,
}

impl<I: Copy> Transitions<I> {
    /// Creates [`Transitions`] with a successor for each outcome.
    #[must_use]
    #[inline]
    pub const fn new(on_success: I, on_failure: I, on_timeout: I) -> Self {
        Self {
            on_success,
            on_failure,
            on_timeout,
        }
    }

    /// Creates [`Transitions`] where every outcome leads to the same state.
    #[must_use]
    #[inline]
    pub const fn always(next: I) -> Self {
        Self::new(next, next, next)
    }

    /// Returns the successor associated with an [`Outcome`].
    #[must_use]
    #[inline]
    pub const fn successor(&self, outcome: Outcome) -> I {
        match outcome {
            Outcome::Success => self.on_success,
            Outcome::Failure => self.on_failure,
            Outcome::Timeout => self.on_timeout,
        }
    }

    fn iter(&self) -> impl Iterator<Item = I> {
        [self.on_success, self.on_failure, self.on_timeout].into_iter()
    }
}

/// A state ready to be registered in an [`FsmBuilder`].
pub struct StateDescriptor<I, C> {
    transitions: Transitions<I>,
    handler: Box<dyn StateHandler<C>>,
}

impl<I: Copy, C> StateDescriptor<I, C> {
    /// Creates a [`StateDescriptor`] from a handler and its successors.
    #[must_use]
    pub fn new<H>(handler: H, transitions: Transitions<I>) -> Self
    where
        H: StateHandler<C> + 'static,
    {
        Self {
            transitions,
            handler: Box::new(handler),
        }
    }

    /// Returns the successors of the state.
    #[must_use]
    #[inline]
    pub const fn transitions(&self) -> &Transitions<I> {
        &self.transitions
    }
}

/// Assembles the state table of an [`Fsm`].
///
/// The table has `N` slots, one per state identifier. States can only be
/// registered here, so the table of a running [`Fsm`] never changes.
pub struct FsmBuilder<I, C, K, const N: usize> {
    initial: I,
    clock: K,
    states: [Option<StateDescriptor<I, C>>; N],
}

impl<I, C, K, const N: usize> FsmBuilder<I, C, K, N>
where
    I: StateId,
    K: Clock,
{
    /// Creates an empty [`FsmBuilder`].
    ///
    /// The machine starts in the `initial` state and measures time with
    /// `clock`.
    #[must_use]
    pub fn new(initial: I, clock: K) -> Self {
        Self {
            initial,
            clock,
            states: core::array::from_fn(|_| None),
        }
    }

    /// Registers a state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state identifier does not fit in the table
    /// or if the state has already been registered.
    pub fn add_state(mut self, id: I, descriptor: StateDescriptor<I, C>) -> Result<Self, FsmError> {
        let slot = self
            .states
            .get_mut(id.index())
            .ok_or(FsmError::OutOfRange {
                index: id.index(),
                capacity: N,
            })?;

        if slot.is_some() {
            return Err(FsmError::AlreadyRegistered { state: id.name() });
        }

        *slot = Some(descriptor);
        Ok(self)
    }

    /// Builds the [`Fsm`].
    ///
    /// # Errors
    ///
    /// Returns an error if a slot of the table is empty, or if the initial
    /// state or a successor does not fit in the table.
    pub fn build(self) -> Result<Fsm<I, C, K, N>, FsmError> {
        check_index(self.initial, N)?;

        let states = self
            .states
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(FsmError::Missing { index }))
            .collect::<Result<Vec<_>, _>>()?;

        for descriptor in &states {
            for successor in descriptor.transitions.iter() {
                check_index(successor, N)?;
            }
        }

        let states = states
            .try_into()
            .map_err(|_| FsmError::Missing { index: N })?;

        Ok(Fsm {
            states,
            current: self.initial,
            entered_at: None,
            iterations: 0,
            clock: self.clock,
        })
    }
}

#[inline]
fn check_index<I: StateId>(id: I, capacity: usize) -> Result<(), FsmError> {
    if id.index() < capacity {
        Ok(())
    } else {
        Err(FsmError::OutOfRange {
            index: id.index(),
            capacity,
        })
    }
}

/// A finite-state machine with a complete state table.
///
/// Built through an [`FsmBuilder`].
pub struct Fsm<I, C, K, const N: usize> {
    states: [StateDescriptor<I, C>; N],
    current: I,
    // `None` until the first tick in the current state.
    entered_at: Option<u32>,
    iterations: u32,
    clock: K,
}

impl<I, C, K, const N: usize> Fsm<I, C, K, N>
where
    I: StateId,
    K: Clock,
{
    /// Returns the current state.
    #[must_use]
    #[inline]
    pub const fn current(&self) -> I {
        self.current
    }

    /// Returns how many consecutive times the current state has been
    /// repeated.
    #[must_use]
    #[inline]
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Returns the clock value captured on the first tick in the current
    /// state, or [`None`] if the state has just been entered.
    #[must_use]
    #[inline]
    pub const fn entered_at(&self) -> Option<u32> {
        self.entered_at
    }

    /// Returns the time spent in the current state.
    #[must_use]
    #[inline]
    pub fn elapsed_ms(&self) -> u32 {
        self.entered_at
            .map_or(0, |entered_at| self.clock.elapsed_since(entered_at))
    }

    /// Returns the clock driving the machine.
    #[must_use]
    #[inline]
    pub const fn clock(&self) -> &K {
        &self.clock
    }

    /// Returns the successors of a state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state does not fit in the table.
    pub fn transitions(&self, id: I) -> Result<&Transitions<I>, FsmError> {
        check_index(id, N)?;
        Ok(self.states[id.index()].transitions())
    }

    /// Runs the handler of the current state once and applies the
    /// transition selected by its [`Outcome`].
    ///
    /// When the selected successor is the current state, the iteration count
    /// is incremented and the dwell time keeps running. Otherwise the
    /// machine enters the successor with both of them reset.
    pub fn process_state(&mut self, ctx: &mut C) -> Outcome {
        let now = self.clock.now_ms();
        let entered_at = *self.entered_at.get_or_insert(now);
        let elapsed = elapsed_ms(entered_at, now);

        let current = self.current;
        let descriptor = &mut self.states[current.index()];

        let outcome = descriptor.handler.run(ctx, elapsed, self.iterations);
        let next = descriptor.transitions.successor(outcome);

        if next == current {
            self.iterations = self.iterations.saturating_add(1);
        } else {
            debug!(
                "{} -> {} on {outcome} after {elapsed} ms and {} iterations",
                current.name(),
                next.name(),
                self.iterations
            );
            self.enter(next);
        }

        outcome
    }

    /// Enters a state unconditionally, bypassing the transition table.
    ///
    /// Counters are reset even when `id` is the current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state does not fit in the table.
    pub fn force_state(&mut self, id: I) -> Result<(), FsmError> {
        check_index(id, N)?;

        debug!("{} -> {} forced", self.current.name(), id.name());
        self.enter(id);

        Ok(())
    }

    #[inline]
    fn enter(&mut self, id: I) {
        self.current = id;
        self.iterations = 0;
        self.entered_at = None;
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::rc::Rc;
    use std::vec;
    use std::vec::Vec;

    use core::cell::Cell;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Lamp {
        Off,
        Warming,
        On,
    }

    impl StateId for Lamp {
        fn index(self) -> usize {
            self as usize
        }

        fn name(self) -> &'static str {
            match self {
                Self::Off => "Off",
                Self::Warming => "Warming",
                Self::On => "On",
            }
        }
    }

    // A state that does not exist in a three-slot table.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Ghost;

    impl StateId for Ghost {
        fn index(self) -> usize {
            7
        }

        fn name(self) -> &'static str {
            "Ghost"
        }
    }

    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<u32>>);

    impl ManualClock {
        fn set(&self, now: u32) {
            self.0.set(now);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> u32 {
            self.0.get()
        }
    }

    // Records every handler run and replays scripted outcomes.
    #[derive(Default)]
    struct Trace {
        runs: Vec<(Lamp, u32, u32)>,
        script: Vec<Outcome>,
    }

    impl Trace {
        fn scripted(script: &[Outcome]) -> Self {
            let mut script = script.to_vec();
            script.reverse();
            Self {
                runs: Vec::new(),
                script,
            }
        }
    }

    fn recorder(lamp: Lamp) -> impl StateHandler<Trace> {
        handler_fn(move |trace: &mut Trace, elapsed, iterations| {
            trace.runs.push((lamp, elapsed, iterations));
            trace.script.pop().unwrap_or(Outcome::Timeout)
        })
    }

    fn lamp_machine(clock: ManualClock) -> Fsm<Lamp, Trace, ManualClock, 3> {
        FsmBuilder::new(Lamp::Off, clock)
            .add_state(
                Lamp::Off,
                StateDescriptor::new(
                    recorder(Lamp::Off),
                    Transitions::new(Lamp::Warming, Lamp::Off, Lamp::Off),
                ),
            )
            .unwrap()
            .add_state(
                Lamp::Warming,
                StateDescriptor::new(
                    recorder(Lamp::Warming),
                    Transitions::new(Lamp::On, Lamp::Off, Lamp::Warming),
                ),
            )
            .unwrap()
            .add_state(
                Lamp::On,
                StateDescriptor::new(recorder(Lamp::On), Transitions::always(Lamp::On)),
            )
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_successor_lookup() {
        let transitions = Transitions::new(Lamp::On, Lamp::Off, Lamp::Warming);

        assert_eq!(transitions.successor(Outcome::Success), Lamp::On);
        assert_eq!(transitions.successor(Outcome::Failure), Lamp::Off);
        assert_eq!(transitions.successor(Outcome::Timeout), Lamp::Warming);
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let result = FsmBuilder::<_, Trace, _, 3>::new(Lamp::Off, ManualClock::default())
            .add_state(
                Lamp::Off,
                StateDescriptor::new(recorder(Lamp::Off), Transitions::always(Lamp::Off)),
            )
            .unwrap()
            .add_state(
                Lamp::Off,
                StateDescriptor::new(recorder(Lamp::Off), Transitions::always(Lamp::Off)),
            );

        assert!(matches!(
            result,
            Err(FsmError::AlreadyRegistered { state: "Off" })
        ));
    }

    #[test]
    fn test_builder_rejects_out_of_range_states() {
        let result = FsmBuilder::<_, Trace, _, 2>::new(Lamp::Off, ManualClock::default())
            .add_state(
                Lamp::On,
                StateDescriptor::new(recorder(Lamp::On), Transitions::always(Lamp::On)),
            );

        assert!(matches!(
            result,
            Err(FsmError::OutOfRange {
                index: 2,
                capacity: 2
            })
        ));
    }

    #[test]
    fn test_builder_rejects_incomplete_tables() {
        let result = FsmBuilder::<_, Trace, _, 3>::new(Lamp::Off, ManualClock::default())
            .add_state(
                Lamp::Off,
                StateDescriptor::new(recorder(Lamp::Off), Transitions::always(Lamp::Off)),
            )
            .unwrap()
            .build();

        assert!(matches!(result, Err(FsmError::Missing { index: 1 })));
    }

    #[test]
    fn test_builder_rejects_out_of_range_initial_state() {
        let result = FsmBuilder::<Ghost, Trace, _, 0>::new(Ghost, ManualClock::default()).build();

        assert!(matches!(
            result,
            Err(FsmError::OutOfRange {
                index: 7,
                capacity: 0
            })
        ));
    }

    #[test]
    fn test_repeat_increments_iterations() {
        let clock = ManualClock::default();
        let mut fsm = lamp_machine(clock.clone());
        let mut trace = Trace::default();

        for tick in 0..5 {
            clock.set(tick * 10);
            assert_eq!(fsm.process_state(&mut trace), Outcome::Timeout);
            assert_eq!(fsm.current(), Lamp::Off);
            assert_eq!(fsm.iterations(), tick + 1);
        }

        assert_eq!(
            trace.runs,
            vec![
                (Lamp::Off, 0, 0),
                (Lamp::Off, 10, 1),
                (Lamp::Off, 20, 2),
                (Lamp::Off, 30, 3),
                (Lamp::Off, 40, 4),
            ]
        );
    }

    #[test]
    fn test_transition_resets_counters() {
        let clock = ManualClock::default();
        let mut fsm = lamp_machine(clock.clone());
        let mut trace = Trace::scripted(&[
            Outcome::Timeout,
            Outcome::Timeout,
            Outcome::Success,
            Outcome::Timeout,
        ]);

        clock.set(100);
        let _ = fsm.process_state(&mut trace);
        clock.set(200);
        let _ = fsm.process_state(&mut trace);
        clock.set(300);
        assert_eq!(fsm.process_state(&mut trace), Outcome::Success);

        assert_eq!(fsm.current(), Lamp::Warming);
        assert_eq!(fsm.iterations(), 0);
        assert_eq!(fsm.entered_at(), None);
        assert_eq!(fsm.elapsed_ms(), 0);

        clock.set(5_000);
        let _ = fsm.process_state(&mut trace);

        // The first run in the new state starts from a fresh entry time.
        assert_eq!(trace.runs.last(), Some(&(Lamp::Warming, 0, 0)));
        assert_eq!(fsm.entered_at(), Some(5_000));
        assert_eq!(fsm.iterations(), 1);
    }

    #[test]
    fn test_force_state_resets_counters_on_the_same_state() {
        let clock = ManualClock::default();
        let mut fsm = lamp_machine(clock.clone());
        let mut trace = Trace::default();

        clock.set(10);
        let _ = fsm.process_state(&mut trace);
        clock.set(60);
        let _ = fsm.process_state(&mut trace);
        assert_eq!(fsm.iterations(), 2);
        assert_eq!(fsm.elapsed_ms(), 50);

        fsm.force_state(Lamp::Off).unwrap();
        assert_eq!(fsm.current(), Lamp::Off);
        assert_eq!(fsm.iterations(), 0);
        assert_eq!(fsm.entered_at(), None);

        clock.set(90);
        let _ = fsm.process_state(&mut trace);
        assert_eq!(trace.runs.last(), Some(&(Lamp::Off, 0, 0)));
    }

    #[test]
    fn test_force_state_bypasses_the_table() {
        let clock = ManualClock::default();
        let mut fsm = lamp_machine(clock.clone());
        let mut trace = Trace::default();

        // `Off` never reaches `On` through its own transitions.
        fsm.force_state(Lamp::On).unwrap();
        assert_eq!(fsm.current(), Lamp::On);

        let _ = fsm.process_state(&mut trace);
        assert_eq!(trace.runs, vec![(Lamp::On, 0, 0)]);
    }

    #[test]
    fn test_elapsed_survives_clock_overflow() {
        let clock = ManualClock::default();
        let mut fsm = lamp_machine(clock.clone());
        let mut trace = Trace::default();

        clock.set(u32::MAX - 5);
        let _ = fsm.process_state(&mut trace);
        clock.set(4);
        let _ = fsm.process_state(&mut trace);

        assert_eq!(trace.runs[1], (Lamp::Off, 9, 1));
        assert_eq!(fsm.elapsed_ms(), 9);
    }

    #[test]
    fn test_transitions_lookup() {
        let fsm = lamp_machine(ManualClock::default());

        assert_eq!(
            fsm.transitions(Lamp::Warming).unwrap(),
            &Transitions::new(Lamp::On, Lamp::Off, Lamp::Warming)
        );
    }
}
