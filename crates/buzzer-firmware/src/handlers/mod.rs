//! One handler per device state.
//!
//! Handlers share a single retry policy:
//!
//! - [`Outcome::Success`] when the state reached its goal;
//! - [`Outcome::Failure`] when the backend could not be reached, or
//!   answered that there is nothing new yet, so the state tries again;
//! - [`Outcome::Timeout`] when the state is over without reaching its goal,
//!   either because the backend ended the exchange or because the retry
//!   budget ran out.
//!
//! Every state that polls the backend maps [`Outcome::Failure`] onto
//! itself. `CheckRegistration` asks once, so it hands a failure over to
//! `InitNetwork`.

use core::fmt::Write as _;

use buzzer::fsm::Outcome;

use crate::board::Board;
use crate::context::Context;

/// Power-on and network start-up states.
pub mod startup;
/// Name issuing and registration states.
pub mod registration;
/// Party lifecycle states.
pub mod party;
/// Power management states.
pub mod power;

/// Counts consecutive errors of a state.
///
/// The count restarts every time the state is entered, which the handler
/// detects through an iteration count of zero.
#[derive(Debug, Default)]
pub(crate) struct ErrorBudget {
    errors: u32,
}

impl ErrorBudget {
    pub(crate) fn enter(&mut self, iterations: u32) {
        if iterations == 0 {
            self.errors = 0;
        }
    }

    // Records an error. The state tries again on `Failure` and gives up on
    // `Timeout`.
    pub(crate) fn spend(&mut self, max_retries: u32) -> Outcome {
        self.errors = self.errors.saturating_add(1);
        if self.errors >= max_retries {
            Outcome::Timeout
        } else {
            Outcome::Failure
        }
    }
}

// Pauses before the next attempt, unless the link timed out.
pub(crate) fn back_off<B: Board>(ctx: &mut Context<B>, timed_out: bool) {
    if !timed_out {
        ctx.board.delay_ms(ctx.settings.retry_delay_ms);
    }
}

/// Formats a wait expressed in minutes as `HHh:MMm`.
pub(crate) fn format_wait(minutes: u16) -> heapless::String<16> {
    let mut text = heapless::String::new();
    let _ = write!(text, "{:02}h:{:02}m", minutes / 60, minutes % 60);
    text
}

#[cfg(test)]
mod tests {
    use crate::testing::FakeBoard;

    use super::*;

    #[test]
    fn test_error_budget() {
        let mut budget = ErrorBudget::default();
        budget.enter(0);

        assert_eq!(budget.spend(3), Outcome::Failure);
        assert_eq!(budget.spend(3), Outcome::Failure);
        assert_eq!(budget.spend(3), Outcome::Timeout);

        // Repeating the state keeps the count.
        budget.enter(4);
        assert_eq!(budget.spend(3), Outcome::Timeout);

        // Entering it again restarts the count.
        budget.enter(0);
        assert_eq!(budget.spend(3), Outcome::Failure);
    }

    #[test]
    fn test_back_off() {
        let mut ctx = FakeBoard::context();

        back_off(&mut ctx, true);
        assert_eq!(ctx.board.delayed_ms, 0);

        back_off(&mut ctx, false);
        assert_eq!(ctx.board.delayed_ms, 1_000);
    }

    #[test]
    fn test_format_wait() {
        assert_eq!(format_wait(0).as_str(), "00h:00m");
        assert_eq!(format_wait(15).as_str(), "00h:15m");
        assert_eq!(format_wait(75).as_str(), "01h:15m");
        assert_eq!(format_wait(600).as_str(), "10h:00m");
    }
}
