use buzzer::clock::Clock;
use buzzer::error::FsmError;
use buzzer::fsm::{Fsm, FsmBuilder, StateDescriptor, StateHandler, Transitions};

use crate::board::Board;
use crate::context::Context;
use crate::handlers::party::{AcceptParty, Buzz, GetAvailableParty, Heartbeat, Idle};
use crate::handlers::power::{Charge, Shutdown, Sleep, Wakeup};
use crate::handlers::registration::{CheckRegistration, GetName, WaitRegistration};
use crate::handlers::startup::{Boot, Fatal, InitModem, InitNetwork};
use crate::state::{DeviceState, STATE_COUNT};

/// The state machine driving a buzzer.
pub type DeviceFsm<B, K> = Fsm<DeviceState, Context<B>, K, STATE_COUNT>;

/// Returns the successors of a device state.
///
/// Every state that tries again repeats itself on
/// [`Outcome::Failure`](buzzer::fsm::Outcome::Failure), and leaves for its
/// fallback on [`Outcome::Timeout`](buzzer::fsm::Outcome::Timeout).
#[must_use]
pub const fn transitions(state: DeviceState) -> Transitions<DeviceState> {
    use DeviceState::{
        AcceptParty, Boot, Buzz, Charge, CheckRegistration, Fatal, GetAvailableParty, GetName,
        Heartbeat, Idle, InitModem, InitNetwork, Shutdown, Sleep, WaitRegistration, Wakeup,
    };

    match state {
        Boot => Transitions::always(InitModem),
        InitModem => Transitions::new(InitNetwork, InitModem, Fatal),
        InitNetwork => Transitions::new(GetName, InitNetwork, Fatal),
        GetName => Transitions::new(CheckRegistration, GetName, InitNetwork),
        CheckRegistration => Transitions::new(Idle, InitNetwork, WaitRegistration),
        WaitRegistration => Transitions::new(Idle, WaitRegistration, InitNetwork),
        Idle => Transitions::new(Heartbeat, Idle, InitNetwork),
        GetAvailableParty => Transitions::new(AcceptParty, GetAvailableParty, Idle),
        AcceptParty => Transitions::new(Heartbeat, AcceptParty, Idle),
        Heartbeat => Transitions::new(Buzz, Heartbeat, Idle),
        Buzz => Transitions::new(Idle, Buzz, Idle),
        Charge => Transitions::always(Charge),
        Shutdown => Transitions::always(Sleep),
        Sleep => Transitions::always(Sleep),
        Wakeup => Transitions::new(Idle, Boot, Boot),
        Fatal => Transitions::always(Boot),
    }
}

/// Builds the state machine of a buzzer, starting at
/// [`DeviceState::Boot`].
///
/// # Errors
///
/// Returns an error if the table is incomplete.
pub fn state_table<B, K>(clock: K) -> Result<DeviceFsm<B, K>, FsmError>
where
    B: Board,
    K: Clock,
{
    FsmBuilder::<_, Context<B>, K, STATE_COUNT>::new(DeviceState::Boot, clock)
        .add_state(DeviceState::Boot, descriptor(DeviceState::Boot, Boot))?
        .add_state(DeviceState::InitModem, descriptor(DeviceState::InitModem, InitModem))?
        .add_state(DeviceState::InitNetwork, descriptor(DeviceState::InitNetwork, InitNetwork))?
        .add_state(DeviceState::GetName, descriptor(DeviceState::GetName, GetName::default()))?
        .add_state(
            DeviceState::CheckRegistration,
            descriptor(DeviceState::CheckRegistration, CheckRegistration::default()),
        )?
        .add_state(
            DeviceState::WaitRegistration,
            descriptor(DeviceState::WaitRegistration, WaitRegistration::default()),
        )?
        .add_state(DeviceState::Idle, descriptor(DeviceState::Idle, Idle::default()))?
        .add_state(
            DeviceState::GetAvailableParty,
            descriptor(DeviceState::GetAvailableParty, GetAvailableParty::default()),
        )?
        .add_state(
            DeviceState::AcceptParty,
            descriptor(DeviceState::AcceptParty, AcceptParty::default()),
        )?
        .add_state(
            DeviceState::Heartbeat,
            descriptor(DeviceState::Heartbeat, Heartbeat::default()),
        )?
        .add_state(DeviceState::Buzz, descriptor(DeviceState::Buzz, Buzz::default()))?
        .add_state(DeviceState::Charge, descriptor(DeviceState::Charge, Charge))?
        .add_state(DeviceState::Shutdown, descriptor(DeviceState::Shutdown, Shutdown))?
        .add_state(DeviceState::Sleep, descriptor(DeviceState::Sleep, Sleep))?
        .add_state(DeviceState::Wakeup, descriptor(DeviceState::Wakeup, Wakeup))?
        .add_state(DeviceState::Fatal, descriptor(DeviceState::Fatal, Fatal))?
        .build()
}

fn descriptor<B, H>(state: DeviceState, handler: H) -> StateDescriptor<DeviceState, Context<B>>
where
    B: Board,
    H: StateHandler<Context<B>> + 'static,
{
    StateDescriptor::new(handler, transitions(state))
}
