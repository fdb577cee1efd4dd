use log::{info, warn};

use buzzer::api::{AcceptReply, BuzzerRequest, HeartbeatReply, PartyReply, truncated};
use buzzer::fsm::{Outcome, StateHandler};

use crate::board::Board;
use crate::context::{Context, Party};
use crate::endpoints::Endpoint;

use super::{ErrorBudget, back_off, format_wait};

const IDLE_BATTERY_ROW: u8 = 2;
const HEARTBEAT_BATTERY_ROW: u8 = 4;

/// Waits for a button press.
///
/// The first idle tick marks the first-time setup as completed. A buzzer in
/// charge of a party resumes polling its status, and a buzzer that lost its
/// link attaches to the network again.
#[derive(Debug, Default)]
pub struct Idle {
    dimmed: bool,
}

impl<B: Board> StateHandler<Context<B>> for Idle {
    fn run(&mut self, ctx: &mut Context<B>, elapsed_ms: u32, iterations: u32) -> Outcome {
        ctx.app.initialized = true;

        if ctx.app.link_lost {
            return Outcome::Timeout;
        }
        if ctx.app.accepted_party().is_some() {
            return Outcome::Success;
        }

        if iterations == 0 {
            self.dimmed = false;
            let name = ctx.app.name.clone().unwrap_or_default();
            ctx.brighten();
            ctx.show(&["Buzzer name:", name.as_str()]);
        }

        if iterations % ctx.settings.battery_refresh_ticks.max(1) == 0 {
            ctx.show_battery(IDLE_BATTERY_ROW);
        }

        if !self.dimmed && elapsed_ms >= ctx.settings.idle_dim_after_ms {
            self.dimmed = true;
            ctx.dim();
        }

        Outcome::Failure
    }
}

/// Asks the backend for a party without a buzzer.
#[derive(Debug, Default)]
pub struct GetAvailableParty {
    budget: ErrorBudget,
}

impl<B: Board> StateHandler<Context<B>> for GetAvailableParty {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, iterations: u32) -> Outcome {
        self.budget.enter(iterations);

        ctx.brighten();
        ctx.show(&["Checking for parties", "with no buzzer"]);

        match ctx.post_name::<PartyReply>(Endpoint::AvailableParty) {
            Ok(reply) if reply.error.is_set() => {
                warn!("The backend reported an error while looking for a party");
                back_off(ctx, false);
                self.budget.spend(ctx.settings.max_retries)
            }
            Ok(reply) if reply.available => {
                info!("Party `{}` ({}) is available", reply.name, reply.party_id);
                ctx.app.party = Some(Party {
                    id: reply.party_id,
                    name: truncated(&reply.name),
                    wait_minutes: reply.wait_minutes,
                    accepted: false,
                });
                Outcome::Success
            }
            Ok(_) => {
                let ms = ctx.settings.notice_ms;
                ctx.notice(&["No avail parties."], ms);
                Outcome::Timeout
            }
            Err(e) => {
                warn!("Unable to look for a party: {e}");
                back_off(ctx, e.timed_out());
                self.budget.spend(ctx.settings.max_retries)
            }
        }
    }
}

/// Takes charge of the available party.
#[derive(Debug, Default)]
pub struct AcceptParty {
    budget: ErrorBudget,
}

impl<B: Board> StateHandler<Context<B>> for AcceptParty {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, iterations: u32) -> Outcome {
        self.budget.enter(iterations);

        let Some(party_id) = ctx.app.party.as_ref().map(|party| party.id) else {
            warn!("No party to accept");
            return Outcome::Timeout;
        };

        let name = ctx.app.name.clone().unwrap_or_default();
        let request = BuzzerRequest::accept(&name, party_id);

        match ctx.post::<AcceptReply>(Endpoint::AcceptParty, &request) {
            Ok(reply) if reply.error.is_set() => {
                warn!("The backend refused to hand party {party_id} over");
                ctx.app.party = None;
                Outcome::Timeout
            }
            Ok(_) => {
                if let Some(party) = ctx.app.party.as_mut() {
                    party.accepted = true;
                }
                info!("Party {party_id} accepted");
                ctx.persist();
                Outcome::Success
            }
            Err(e) => {
                warn!("Unable to accept party {party_id}: {e}");
                back_off(ctx, e.timed_out());
                let outcome = self.budget.spend(ctx.settings.max_retries);
                if outcome == Outcome::Timeout {
                    ctx.app.party = None;
                }
                outcome
            }
        }
    }
}

/// Polls the status of the accepted party until its table is ready.
///
/// A wait announced by the backend is shown as soon as it changes. Once the
/// error budget is exhausted the link is flagged as lost and the buzzer goes
/// back to idle, keeping its party.
#[derive(Debug, Default)]
pub struct Heartbeat {
    budget: ErrorBudget,
}

impl Heartbeat {
    fn show_party<B: Board>(ctx: &mut Context<B>) {
        let Some(party) = ctx.app.party.clone() else {
            return;
        };

        let wait = format_wait(party.wait_minutes);
        ctx.brighten();
        ctx.show(&[
            "Party name:",
            party.name.as_str(),
            "Expected wait time: ",
            wait.as_str(),
        ]);
        ctx.show_battery(HEARTBEAT_BATTERY_ROW);
    }

    fn update_wait<B: Board>(ctx: &mut Context<B>, wait_minutes: Option<u16>) {
        let Some(wait_minutes) = wait_minutes else {
            return;
        };

        let changed = match ctx.app.party.as_mut() {
            Some(party) if party.wait_minutes != wait_minutes => {
                party.wait_minutes = wait_minutes;
                true
            }
            _ => false,
        };

        if changed {
            ctx.persist();
            Self::show_party(ctx);
        }
    }
}

impl<B: Board> StateHandler<Context<B>> for Heartbeat {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, iterations: u32) -> Outcome {
        self.budget.enter(iterations);

        if iterations == 0 {
            Self::show_party(ctx);
        } else if iterations % ctx.settings.battery_refresh_ticks.max(1) == 0 {
            ctx.show_battery(HEARTBEAT_BATTERY_ROW);
        }

        let outcome = match ctx.post_name::<HeartbeatReply>(Endpoint::Heartbeat) {
            Ok(reply) if reply.error.is_set() => {
                warn!("The backend reported an error on heartbeat");
                back_off(ctx, false);
                self.budget.spend(ctx.settings.max_retries)
            }
            Ok(reply) if !reply.active => {
                info!("The party is no longer waiting");
                ctx.app.party = None;
                ctx.persist();
                return Outcome::Timeout;
            }
            Ok(reply) if reply.buzz => return Outcome::Success,
            Ok(reply) => {
                self.budget.enter(0);
                Self::update_wait(ctx, reply.wait_minutes);
                ctx.board.delay_ms(ctx.settings.retry_delay_ms);
                return Outcome::Failure;
            }
            Err(e) => {
                warn!("Heartbeat failed: {e}");
                back_off(ctx, e.timed_out());
                self.budget.spend(ctx.settings.max_retries)
            }
        };

        if outcome == Outcome::Timeout {
            warn!("Too many heartbeat errors, reattaching");
            ctx.app.link_lost = true;
        }
        outcome
    }
}

/// Buzzes until the party is served.
#[derive(Debug, Default)]
pub struct Buzz {
    budget: ErrorBudget,
}

impl<B: Board> StateHandler<Context<B>> for Buzz {
    fn run(&mut self, ctx: &mut Context<B>, _elapsed_ms: u32, iterations: u32) -> Outcome {
        self.budget.enter(iterations);

        if iterations == 0 {
            info!("Table ready");
            ctx.brighten();
            ctx.show(&["Table Ready!"]);
        }

        ctx.board.set_buzzer(true);
        ctx.board.delay_ms(ctx.settings.buzz_ms);
        ctx.board.set_buzzer(false);

        let outcome = match ctx.post_name::<HeartbeatReply>(Endpoint::Heartbeat) {
            Ok(reply) if reply.error.is_set() => self.budget.spend(ctx.settings.max_retries),
            Ok(reply) if !reply.active => {
                info!("Party served");
                ctx.app.party = None;
                ctx.persist();
                return Outcome::Success;
            }
            Ok(_) => Outcome::Failure,
            Err(e) => {
                warn!("Heartbeat failed while buzzing: {e}");
                self.budget.spend(ctx.settings.max_retries)
            }
        };

        if outcome == Outcome::Timeout {
            ctx.app.link_lost = true;
        }
        outcome
    }
}
