use buzzer::clock::elapsed_ms;

use crate::state::DeviceState;

/// Events raised outside of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// The button has been released before the long press threshold.
    ShortPress,
    /// The button has been held down past the long press threshold.
    LongPress,
    /// The charging cable has been plugged in.
    UsbInserted,
    /// The charging cable has been unplugged.
    UsbRemoved,
}

impl core::fmt::Display for InputEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::ShortPress => "short press",
            Self::LongPress => "long press",
            Self::UsbInserted => "USB inserted",
            Self::UsbRemoved => "USB removed",
        })
    }
}

/// Returns the state an event forces the machine into, or [`None`] if the
/// event is ignored in the `current` state.
///
/// A short press only matters while idle, where it starts looking for a
/// party. A long press wakes a sleeping buzzer up and shuts down any other.
#[must_use]
pub const fn forced_state(event: InputEvent, current: DeviceState) -> Option<DeviceState> {
    match (event, current) {
        (InputEvent::ShortPress, DeviceState::Idle) => Some(DeviceState::GetAvailableParty),
        (InputEvent::ShortPress, _) => None,
        (InputEvent::LongPress, DeviceState::Sleep) => Some(DeviceState::Wakeup),
        (InputEvent::LongPress, _) => Some(DeviceState::Shutdown),
        (InputEvent::UsbInserted, _) => Some(DeviceState::Charge),
        (InputEvent::UsbRemoved, _) => Some(DeviceState::Shutdown),
    }
}

/// Classifies button presses by how long the button is held down.
#[derive(Debug, Default)]
pub struct Button {
    pressed_at: Option<u32>,
}

impl Button {
    /// Creates a released [`Button`].
    #[must_use]
    pub const fn new() -> Self {
        Self { pressed_at: None }
    }

    /// Records the button going down at `now_ms`.
    ///
    /// A press already in progress keeps its original start.
    pub fn press(&mut self, now_ms: u32) {
        if self.pressed_at.is_none() {
            self.pressed_at = Some(now_ms);
        }
    }

    /// Records the button going up at `now_ms` and classifies the press.
    ///
    /// Returns [`None`] when no press was in progress.
    pub fn release(&mut self, now_ms: u32, long_press_ms: u32) -> Option<InputEvent> {
        let pressed_at = self.pressed_at.take()?;

        if elapsed_ms(pressed_at, now_ms) >= long_press_ms {
            Some(InputEvent::LongPress)
        } else {
            Some(InputEvent::ShortPress)
        }
    }

    /// Returns whether the button is held down.
    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }
}
