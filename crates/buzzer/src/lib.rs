//! The device-independent core of a cellular restaurant buzzer.
//!
//! This crate provides APIs to:
//!
//! - Sequence device behaviour through a cooperative finite-state machine.
//!   Each state is a handler that performs one unit of work per tick and
//!   reports an [`fsm::Outcome`]. The engine looks the outcome up in the
//!   state's transition table, tracks how long the device has been in the
//!   current state and how many consecutive times the state has been repeated,
//!   and accepts forced transitions coming from external events.
//! - Measure elapsed time on a free-running millisecond clock that wraps
//!   around.
//! - Encode requests for, and decode replies from, the backend that assigns
//!   buzzers to dining parties. Messages are single-line JSON objects with
//!   short keys.
//! - Encode and decode the fixed-layout identity record that a device keeps
//!   in persistent storage to survive a restart.
//!
//! The engine runs a single thread of control and never yields: a handler
//! returns before the engine makes its next decision, and every wait inside
//! a handler has an upper bound.
//!
//! This crate can be compiled for both `std` and `no_std` environments.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![no_std]

extern crate alloc;

/// Requests and replies exchanged with the backend.
pub mod api;
/// Monotonic millisecond clock and wraparound-safe elapsed time.
pub mod clock;
/// Error management.
pub mod error;
/// The finite-state machine engine.
pub mod fsm;
/// The persisted device identity record.
pub mod identity;

#[cfg(test)]
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap()
}
