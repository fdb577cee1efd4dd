use log::{debug, info};

use buzzer::clock::Clock;
use buzzer::fsm::Outcome;

use crate::board::Board;
use crate::context::Context;
use crate::endpoints::Endpoints;
use crate::error::Result;
use crate::input::{InputEvent, forced_state};
use crate::settings::Settings;
use crate::state::DeviceState;
use crate::table::{DeviceFsm, state_table};

/// A buzzer.
///
/// The board main loop calls [`Buzzer::tick`] as often as possible and
/// forwards button and cable events through [`Buzzer::handle_input`].
pub struct Buzzer<B: Board, K: Clock> {
    fsm: DeviceFsm<B, K>,
    ctx: Context<B>,
}

impl<B, K> Buzzer<B, K>
where
    B: Board,
    K: Clock,
{
    /// Creates a [`Buzzer`] starting at [`DeviceState::Boot`].
    ///
    /// The identity persisted by a previous run, if any, is restored.
    ///
    /// # Errors
    ///
    /// Returns an error if the state table is incomplete.
    pub fn new(board: B, clock: K, settings: Settings, endpoints: Endpoints) -> Result<Self> {
        let fsm = state_table(clock)?;

        let mut ctx = Context::new(board, settings, endpoints);
        if ctx.restore() {
            info!("Resuming as `{}`", ctx.app.name());
        }

        Ok(Self { fsm, ctx })
    }

    /// Runs the current state once.
    pub fn tick(&mut self) -> Outcome {
        self.fsm.process_state(&mut self.ctx)
    }

    /// Applies an external event.
    ///
    /// Returns whether the event forced a transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the forced state is missing from the table.
    pub fn handle_input(&mut self, event: InputEvent) -> Result<bool> {
        let Some(next) = forced_state(event, self.fsm.current()) else {
            debug!("Ignoring {event} in {}", self.fsm.current());
            return Ok(false);
        };

        info!("{event}: entering {next}");
        self.fsm.force_state(next)?;
        Ok(true)
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.fsm.current()
    }

    /// Returns the time spent in the current state.
    #[must_use]
    pub fn elapsed_ms(&self) -> u32 {
        self.fsm.elapsed_ms()
    }

    /// Returns the shared context.
    #[must_use]
    pub const fn context(&self) -> &Context<B> {
        &self.ctx
    }

    /// Returns the shared context, mutably.
    pub const fn context_mut(&mut self) -> &mut Context<B> {
        &mut self.ctx
    }
}
