/// Timings and retry bounds of the device states.
///
/// Durations are in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Consecutive errors tolerated by a state before it gives up.
    pub max_retries: u32,
    /// Pause after a failed attempt, and between two status polls.
    pub retry_delay_ms: u32,
    /// Duration of the power-on splash screen.
    pub splash_ms: u32,
    /// Duration of an error notice.
    pub failure_notice_ms: u32,
    /// Duration of an informative notice.
    pub notice_ms: u32,
    /// Duration of the confirmation shown when the buzzer is registered.
    pub registered_notice_ms: u32,
    /// Duration of a single buzz.
    pub buzz_ms: u32,
    /// Idle time after which the screen is dimmed.
    pub idle_dim_after_ms: u32,
    /// Duration of the wake-up screen.
    pub wakeup_ms: u32,
    /// Duration of the goodbye screen.
    pub shutdown_ms: u32,
    /// Pause between two ticks while sleeping.
    pub sleep_poll_ms: u32,
    /// Press duration from which a press is long.
    pub long_press_ms: u32,
    /// Number of ticks between two battery readings on screen.
    pub battery_refresh_ticks: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay_ms: 1_000,
            splash_ms: 5_000,
            failure_notice_ms: 10_000,
            notice_ms: 5_000,
            registered_notice_ms: 2_000,
            buzz_ms: 2_000,
            idle_dim_after_ms: 20_000,
            wakeup_ms: 2_500,
            shutdown_ms: 5_000,
            sleep_poll_ms: 500,
            long_press_ms: 2_000,
            battery_refresh_ticks: 1_000,
        }
    }
}
