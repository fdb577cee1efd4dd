use log::info;

use buzzer::fsm::{Outcome, StateHandler};

use crate::board::{Board, Screen};
use crate::context::Context;

const CHARGE_BATTERY_ROW: u8 = 1;

/// Shows the battery charge while the cable is plugged in.
///
/// Only unplugging the cable leaves this state.
#[derive(Debug, Default)]
pub struct Charge;

impl<B: Board> StateHandler<Context<B>> for Charge {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, iterations: u32) -> Outcome {
        if iterations == 0 {
            info!("Charging");
            ctx.brighten();
            ctx.show(&["Charging....."]);
        }

        if iterations % ctx.settings.battery_refresh_ticks.max(1) == 0 {
            ctx.show_battery(CHARGE_BATTERY_ROW);
        }

        Outcome::Failure
    }
}

/// Says goodbye and turns the screen off.
#[derive(Debug, Default)]
pub struct Shutdown;

impl<B: Board> StateHandler<Context<B>> for Shutdown {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, _iterations: u32) -> Outcome {
        info!("Shutting down");

        ctx.brighten();
        let ms = ctx.settings.shutdown_ms;
        ctx.notice(&["Shutting down.", " Bye bye!"], ms);

        ctx.board.screen().clear();
        ctx.dim();

        Outcome::Success
    }
}

/// Keeps the buzzer asleep until a long press.
#[derive(Debug, Default)]
pub struct Sleep;

impl<B: Board> StateHandler<Context<B>> for Sleep {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, iterations: u32) -> Outcome {
        if iterations == 0 {
            ctx.board.screen().clear();
        }
        ctx.board.delay_ms(ctx.settings.sleep_poll_ms);

        Outcome::Failure
    }
}

/// Wakes the buzzer up.
///
/// A buzzer that already completed its setup goes straight back to idle,
/// otherwise it boots again.
#[derive(Debug, Default)]
pub struct Wakeup;

impl<B: Board> StateHandler<Context<B>> for Wakeup {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, _iterations: u32) -> Outcome {
        info!("Waking up");

        ctx.brighten();
        let ms = ctx.settings.wakeup_ms;
        ctx.notice(&["Starting up....."], ms);
        ctx.board.screen().clear();

        if ctx.app.initialized {
            Outcome::Success
        } else {
            Outcome::Timeout
        }
    }
}
