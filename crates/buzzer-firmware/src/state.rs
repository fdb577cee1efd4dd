use buzzer::fsm::StateId;

/// Number of device states.
pub const STATE_COUNT: usize = DeviceState::ALL.len();

/// The states of a buzzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceState {
    /// Power-on splash screen.
    Boot,
    /// Reset the modem and wait until it answers.
    InitModem,
    /// Attach to the packet network.
    InitNetwork,
    /// Obtain a name from the backend.
    GetName,
    /// Ask the backend whether a restaurant registered the buzzer.
    CheckRegistration,
    /// Wait until a restaurant registers the buzzer.
    WaitRegistration,
    /// Wait for a button press.
    Idle,
    /// Look for a party without a buzzer.
    GetAvailableParty,
    /// Take charge of the available party.
    AcceptParty,
    /// Poll the status of the accepted party.
    Heartbeat,
    /// Vibrate until the party is served.
    Buzz,
    /// Show the charge level while plugged in.
    Charge,
    /// Say goodbye before sleeping.
    Shutdown,
    /// Wait for a long press.
    Sleep,
    /// Resume from sleep.
    Wakeup,
    /// Signal an unrecoverable error and restart.
    Fatal,
}

impl DeviceState {
    /// All device states, in table order.
    pub const ALL: [Self; 16] = [
        Self::Boot,
        Self::InitModem,
        Self::InitNetwork,
        Self::GetName,
        Self::CheckRegistration,
        Self::WaitRegistration,
        Self::Idle,
        Self::GetAvailableParty,
        Self::AcceptParty,
        Self::Heartbeat,
        Self::Buzz,
        Self::Charge,
        Self::Shutdown,
        Self::Sleep,
        Self::Wakeup,
        Self::Fatal,
    ];
}

impl StateId for DeviceState {
    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            Self::Boot => "Boot",
            Self::InitModem => "InitModem",
            Self::InitNetwork => "InitNetwork",
            Self::GetName => "GetName",
            Self::CheckRegistration => "CheckRegistration",
            Self::WaitRegistration => "WaitRegistration",
            Self::Idle => "Idle",
            Self::GetAvailableParty => "GetAvailableParty",
            Self::AcceptParty => "AcceptParty",
            Self::Heartbeat => "Heartbeat",
            Self::Buzz => "Buzz",
            Self::Charge => "Charge",
            Self::Shutdown => "Shutdown",
            Self::Sleep => "Sleep",
            Self::Wakeup => "Wakeup",
            Self::Fatal => "Fatal",
        }
    }
}

impl core::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
