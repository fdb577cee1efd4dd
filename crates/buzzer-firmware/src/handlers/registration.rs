use log::{info, warn};

use buzzer::api::{NameReply, RegistrationReply, truncated};
use buzzer::fsm::{Outcome, StateHandler};

use crate::board::Board;
use crate::context::Context;
use crate::endpoints::Endpoint;

use super::{ErrorBudget, back_off};

/// Obtains a name from the backend.
///
/// A buzzer that restored its name from storage skips the request.
#[derive(Debug, Default)]
pub struct GetName {
    budget: ErrorBudget,
}

impl<B: Board> StateHandler<Context<B>> for GetName {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, iterations: u32) -> Outcome {
        self.budget.enter(iterations);

        if ctx.app.name.is_some() {
            return Outcome::Success;
        }

        ctx.show(&["Getting a name....."]);

        match ctx.get::<NameReply>(Endpoint::NewName) {
            Ok(reply) if !reply.error.is_set() && !reply.name.is_empty() => {
                info!("Buzzer named `{}`", reply.name);
                ctx.app.name = Some(truncated(&reply.name));
                ctx.persist();
                Outcome::Success
            }
            Ok(_) => {
                warn!("The backend refused to issue a name");
                back_off(ctx, false);
                self.budget.spend(ctx.settings.max_retries)
            }
            Err(e) => {
                warn!("Unable to obtain a name: {e}");
                back_off(ctx, e.timed_out());
                self.budget.spend(ctx.settings.max_retries)
            }
        }
    }
}

/// Asks the backend once whether a restaurant registered the buzzer.
///
/// An unregistered buzzer waits for its registration, while a buzzer that
/// cannot reach the backend attaches to the network again.
#[derive(Debug, Default)]
pub struct CheckRegistration;

impl<B: Board> StateHandler<Context<B>> for CheckRegistration {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, _iterations: u32) -> Outcome {
        ctx.show(&["Checking if this", "buzzer is registered"]);

        match ctx.post_name::<RegistrationReply>(Endpoint::Registration) {
            Ok(reply) if reply.error.is_set() => {
                warn!("The backend reported an error while checking the registration");
                Outcome::Failure
            }
            Ok(reply) if reply.registered => {
                let ms = ctx.settings.registered_notice_ms;
                ctx.notice(&["Buzzer registered!"], ms);
                Outcome::Success
            }
            Ok(_) => Outcome::Timeout,
            Err(e) => {
                warn!("Unable to check the registration: {e}");
                Outcome::Failure
            }
        }
    }
}

/// Polls the backend until a restaurant registers the buzzer.
///
/// Unregistered answers are not errors, so the buzzer can wait for as long
/// as it takes.
#[derive(Debug, Default)]
pub struct WaitRegistration {
    budget: ErrorBudget,
}

impl<B: Board> StateHandler<Context<B>> for WaitRegistration {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, iterations: u32) -> Outcome {
        self.budget.enter(iterations);

        if iterations == 0 {
            let name = ctx.app.name.clone().unwrap_or_default();
            ctx.show(&["Please register", "buzzer.", "Buzzer name: ", name.as_str()]);
        }

        match ctx.post_name::<RegistrationReply>(Endpoint::Registration) {
            Ok(reply) if reply.registered && !reply.error.is_set() => {
                info!("Buzzer `{}` registered", ctx.app.name());
                let ms = ctx.settings.notice_ms;
                ctx.notice(&["Buzzer successfully", "registered!"], ms);
                Outcome::Success
            }
            Ok(reply) if !reply.error.is_set() => {
                self.budget.enter(0);
                ctx.board.delay_ms(ctx.settings.retry_delay_ms);
                Outcome::Failure
            }
            Ok(_) => {
                warn!("The backend reported an error while checking the registration");
                back_off(ctx, false);
                self.budget.spend(ctx.settings.max_retries)
            }
            Err(e) => {
                warn!("Unable to check the registration: {e}");
                back_off(ctx, e.timed_out());
                self.budget.spend(ctx.settings.max_retries)
            }
        }
    }
}
