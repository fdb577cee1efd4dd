//! Properties of the state machine engine over arbitrary outcome sequences.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;

use buzzer::clock::Clock;
use buzzer::fsm::{Fsm, FsmBuilder, Outcome, StateDescriptor, StateId, Transitions, handler_fn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    First,
    Second,
    Third,
}

impl StateId for Step {
    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            Self::First => "First",
            Self::Second => "Second",
            Self::Third => "Third",
        }
    }
}

const STEPS: [Step; 3] = [Step::First, Step::Second, Step::Third];

#[derive(Clone, Default)]
struct SharedClock(Rc<Cell<u32>>);

impl Clock for SharedClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

// Outcomes handed out to handlers, one per tick, and what handlers saw.
#[derive(Default)]
struct Recorder {
    next: Option<Outcome>,
    seen: Vec<(Step, u32, u32)>,
}

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        Just(Outcome::Success),
        Just(Outcome::Failure),
        Just(Outcome::Timeout),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    (0..STEPS.len()).prop_map(|i| STEPS[i])
}

fn transitions() -> impl Strategy<Value = Transitions<Step>> {
    (step(), step(), step()).prop_map(|(s, f, t)| Transitions::new(s, f, t))
}

fn machine(
    table: &[Transitions<Step>; 3],
    clock: SharedClock,
) -> Fsm<Step, Recorder, SharedClock, 3> {
    let mut builder = FsmBuilder::new(Step::First, clock);
    for (step, transitions) in STEPS.into_iter().zip(table) {
        builder = builder
            .add_state(
                step,
                StateDescriptor::new(
                    handler_fn(move |recorder: &mut Recorder, elapsed, iterations| {
                        recorder.seen.push((step, elapsed, iterations));
                        recorder.next.take().unwrap_or(Outcome::Timeout)
                    }),
                    *transitions,
                ),
            )
            .unwrap();
    }
    builder.build().unwrap()
}

proptest! {
    #[test]
    fn counters_follow_the_transition_table(
        table in proptest::array::uniform3(transitions()),
        ticks in proptest::collection::vec((outcome(), 0u32..1_000), 1..64),
        start in any::<u32>(),
    ) {
        let clock = SharedClock::default();
        clock.0.set(start);
        let mut fsm = machine(&table, clock.clone());
        let mut recorder = Recorder::default();

        let mut now = start;
        let mut expected_iterations = 0u32;
        let mut expected_entry: Option<u32> = None;

        for (outcome, advance) in ticks {
            now = now.wrapping_add(advance);
            clock.0.set(now);

            let before = fsm.current();
            let entry = *expected_entry.get_or_insert(now);

            recorder.next = Some(outcome);
            prop_assert_eq!(fsm.process_state(&mut recorder), outcome);

            // The handler sees the dwell time and the iteration count.
            let seen = *recorder.seen.last().unwrap();
            prop_assert_eq!(seen, (before, buzzer::clock::elapsed_ms(entry, now), expected_iterations));

            let next = table[before.index()].successor(outcome);
            prop_assert_eq!(fsm.current(), next);

            if next == before {
                expected_iterations += 1;
                prop_assert_eq!(fsm.entered_at(), Some(entry));
            } else {
                expected_iterations = 0;
                expected_entry = None;
                prop_assert_eq!(fsm.entered_at(), None);
            }
            prop_assert_eq!(fsm.iterations(), expected_iterations);
        }
    }

    #[test]
    fn forced_transitions_always_reset(
        repeats in 1usize..32,
        target in step(),
    ) {
        let clock = SharedClock::default();
        let table = [Transitions::always(Step::First); 3];
        let mut fsm = machine(&table, clock.clone());
        let mut recorder = Recorder::default();

        for tick in 0..repeats {
            clock.0.set(tick as u32 * 100);
            let _ = fsm.process_state(&mut recorder);
        }
        prop_assert_eq!(fsm.iterations(), repeats as u32);

        fsm.force_state(target).unwrap();
        prop_assert_eq!(fsm.current(), target);
        prop_assert_eq!(fsm.iterations(), 0);
        prop_assert_eq!(fsm.entered_at(), None);

        clock.0.set(1_000_000);
        let _ = fsm.process_state(&mut recorder);
        prop_assert_eq!(recorder.seen.last().copied(), Some((target, 0, 0)));
    }

    #[test]
    fn elapsed_never_exceeds_the_distance_travelled(
        start in any::<u32>(),
        delta in 0u32..u32::MAX,
    ) {
        let now = start.wrapping_add(delta);
        let elapsed = buzzer::clock::elapsed_ms(start, now);

        if now >= start {
            prop_assert_eq!(elapsed, delta);
        } else {
            // Crossing zero costs one millisecond of the range.
            prop_assert_eq!(elapsed, delta - 1);
        }
    }
}
