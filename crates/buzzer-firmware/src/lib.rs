//! `buzzer-firmware` wires the device states of a cellular restaurant
//! buzzer onto the [`buzzer`] state machine engine.
//!
//! It provides APIs to:
//!
//! - Describe the hardware of a board through the [`board::Board`] trait and
//!   its collaborators: a cellular link, a small text screen, persistent
//!   storage, a vibration motor and a battery gauge
//! - Run one handler per device state, from modem start-up to the buzz that
//!   tells a party its table is ready
//! - Map button presses and cable plug events onto forced transitions
//! - Drive everything from a single [`controller::Buzzer`] ticked by the
//!   board main loop
//!
//! A buzzer first obtains a name from the backend, waits until a restaurant
//! registers it, and then idles. A short press asks the backend for a party
//! without a buzzer; once the party is accepted, the buzzer polls its status
//! until the table is ready and buzzes until the party is served.
//!
//! The name and the accepted party are persisted, so a restarted buzzer
//! resumes where it left off.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![no_std]

extern crate alloc;

/// Hardware collaborators of a board.
pub mod board;
/// The state shared by every device state.
pub mod context;
/// The top-level controller.
pub mod controller;
/// Backend endpoints.
pub mod endpoints;
/// Error management.
pub mod error;
/// Device state handlers.
pub mod handlers;
/// External input events.
pub mod input;
/// The cellular link backed by the `SIM800` driver.
pub mod link;
/// Firmware settings.
pub mod settings;
/// Device state identifiers.
pub mod state;
/// The device state table.
pub mod table;

#[cfg(test)]
pub(crate) mod testing;
