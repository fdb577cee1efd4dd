use log::{error, info, warn};

use buzzer::fsm::{Outcome, StateHandler};

use crate::board::{Board, CellularLink, LinkError};
use crate::context::Context;

use super::back_off;

/// Shows the splash screen.
#[derive(Debug, Default)]
pub struct Boot;

impl<B: Board> StateHandler<Context<B>> for Boot {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, iterations: u32) -> Outcome {
        if iterations == 0 {
            ctx.brighten();
            ctx.show(&["BUZZER"]);
        }
        ctx.board.delay_ms(ctx.settings.splash_ms);

        Outcome::Success
    }
}

/// Resets the modem until it answers.
///
/// Every attempt is a repetition of the state, so the iteration count
/// bounds the attempts.
#[derive(Debug, Default)]
pub struct InitModem;

impl<B: Board> StateHandler<Context<B>> for InitModem {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, iterations: u32) -> Outcome {
        if iterations == 0 {
            ctx.show(&["Initializing", "cell modem....."]);
        }

        if iterations >= ctx.settings.max_retries {
            error!("Modem did not answer after {iterations} attempts");
            let ms = ctx.settings.failure_notice_ms;
            ctx.notice(&["Failed to initialize", "cell modem."], ms);
            return Outcome::Timeout;
        }

        match ctx.board.link().init() {
            Ok(()) => Outcome::Success,
            Err(e) => {
                warn!("Modem initialization failed: {e}");
                back_off(ctx, e == LinkError::Timeout);
                Outcome::Failure
            }
        }
    }
}

/// Attaches to the packet network until it succeeds.
#[derive(Debug, Default)]
pub struct InitNetwork;

impl<B: Board> StateHandler<Context<B>> for InitNetwork {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, iterations: u32) -> Outcome {
        if iterations == 0 {
            ctx.show(&["Initializing GPRS....."]);
        }

        if iterations >= ctx.settings.max_retries {
            error!("Network attach failed {iterations} times");
            let ms = ctx.settings.failure_notice_ms;
            ctx.notice(&["Failed to initialize", "GPRS connection."], ms);
            return Outcome::Timeout;
        }

        match ctx.board.link().attach() {
            Ok(()) => {
                ctx.app.link_lost = false;
                Outcome::Success
            }
            Err(e) => {
                warn!("Network attach failed: {e}");
                back_off(ctx, e == LinkError::Timeout);
                Outcome::Failure
            }
        }
    }
}

/// Signals an unrecoverable error before restarting.
#[derive(Debug, Default)]
pub struct Fatal;

impl<B: Board> StateHandler<Context<B>> for Fatal {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, _iterations: u32) -> Outcome {
        error!("Unrecoverable error, restarting");

        ctx.brighten();
        ctx.show(&["Something went wrong.", "Restarting....."]);

        ctx.board.set_buzzer(true);
        ctx.board.delay_ms(ctx.settings.buzz_ms);
        ctx.board.set_buzzer(false);
        ctx.board.delay_ms(ctx.settings.failure_notice_ms);

        info!("Restarting the boot sequence");
        Outcome::Success
    }
}
