//! `buzzer-drivers` is a library crate that provides architecture-agnostic
//! drivers for the peripherals of a cellular restaurant buzzer.
//!
//! All drivers are implemented using only the [`embedded-hal`] and
//! [`embedded-io`] traits, ensuring compatibility with any platform
//! that supports these abstractions.
//!
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal
//! [`embedded-io`]: https://crates.io/crates/embedded-io

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![no_std]

/// The `SIM800` cellular modem driver.
#[cfg(feature = "sim800")]
pub mod sim800;
