//! Messages exchanged with the backend.
//!
//! Every request is a single-line JSON object carrying the buzzer name, and
//! every reply is a single-line JSON object. Keys are short tokens so that a
//! whole message fits in a modem line buffer.

use alloc::string::String;
use alloc::vec::Vec;

use core::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// Maximum length of a buzzer name, in bytes.
pub const NAME_CAPACITY: usize = 30;

/// Maximum length of a party name, in bytes.
pub const PARTY_NAME_CAPACITY: usize = 20;

/// A buzzer name.
pub type BuzzerName = heapless::String<NAME_CAPACITY>;

/// A party name.
pub type PartyName = heapless::String<PARTY_NAME_CAPACITY>;

/// Copies `text` into a fixed-capacity string.
///
/// Text longer than the capacity is cut at the last character boundary that
/// fits.
#[must_use]
pub fn truncated<const N: usize>(text: &str) -> heapless::String<N> {
    let mut end = text.len().min(N);
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let mut out = heapless::String::new();
    // Cannot fail, the slice fits by construction.
    let _ = out.push_str(&text[..end]);
    out
}

/// A request body.
///
/// The same shape is sent to every endpoint. The party identifier is only
/// present when a party is being accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuzzerRequest<'a> {
    /// Buzzer name.
    #[serde(rename = "bn")]
    pub name: &'a str,
    /// Party identifier.
    #[serde(rename = "id", skip_serializing_if = "Option::is_none")]
    pub party_id: Option<u32>,
}

impl<'a> BuzzerRequest<'a> {
    /// Creates a [`BuzzerRequest`] carrying only the buzzer name.
    #[must_use]
    #[inline]
    pub const fn new(name: &'a str) -> Self {
        Self {
            name,
            party_id: None,
        }
    }

    /// Creates a [`BuzzerRequest`] that accepts a party.
    #[must_use]
    #[inline]
    pub const fn accept(name: &'a str, party_id: u32) -> Self {
        Self {
            name,
            party_id: Some(party_id),
        }
    }

    /// Encodes the request as a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be serialized.
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Decodes a reply line.
///
/// # Errors
///
/// Returns an error if the line is not a JSON object of the expected shape.
pub fn decode<'de, T: Deserialize<'de>>(line: &'de [u8]) -> serde_json::Result<T> {
    serde_json::from_slice(line)
}

/// The error status attached to a reply.
///
/// The backend reports it as a boolean, as an integer, where any value
/// other than zero is an error, or as `null`. A missing status means no
/// error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorStatus(bool);

impl ErrorStatus {
    /// Whether the backend reported an error.
    #[must_use]
    #[inline]
    pub const fn is_set(self) -> bool {
        self.0
    }
}

impl<'de> Deserialize<'de> for ErrorStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StatusVisitor;

        impl<'de> Visitor<'de> for StatusVisitor {
            type Value = ErrorStatus;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a boolean, an integer or null")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(ErrorStatus(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(ErrorStatus(v != 0))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(ErrorStatus(v != 0))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(ErrorStatus(false))
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(ErrorStatus(false))
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
                d.deserialize_any(StatusVisitor)
            }
        }

        deserializer.deserialize_any(StatusVisitor)
    }
}

/// Reply of the name-issuing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NameReply {
    /// The name issued to the buzzer.
    #[serde(rename = "bn")]
    pub name: String,
    /// Error status.
    #[serde(rename = "e", default)]
    pub error: ErrorStatus,
}

/// Reply of the registration-check endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RegistrationReply {
    /// Whether a restaurant has registered the buzzer.
    #[serde(rename = "i_reg")]
    pub registered: bool,
    /// Error status.
    #[serde(rename = "e", default)]
    pub error: ErrorStatus,
}

/// Reply of the available-party endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PartyReply {
    /// Whether a party without a buzzer is waiting.
    #[serde(rename = "p_a")]
    pub available: bool,
    /// Party identifier.
    #[serde(rename = "id", default)]
    pub party_id: u32,
    /// Party name.
    #[serde(rename = "n", default)]
    pub name: String,
    /// Expected wait, in minutes.
    #[serde(rename = "t", default)]
    pub wait_minutes: u16,
    /// Error status.
    #[serde(rename = "e", default)]
    pub error: ErrorStatus,
}

/// Reply of the accept-party endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AcceptReply {
    /// Error status.
    #[serde(rename = "e", default)]
    pub error: ErrorStatus,
}

/// Reply of the heartbeat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HeartbeatReply {
    /// Whether the party is still waiting for its table.
    #[serde(rename = "i_a")]
    pub active: bool,
    /// Whether the buzzer must buzz now.
    #[serde(rename = "b", default)]
    pub buzz: bool,
    /// Updated expected wait, in minutes.
    #[serde(rename = "t", default)]
    pub wait_minutes: Option<u16>,
    /// Error status.
    #[serde(rename = "e", default)]
    pub error: ErrorStatus,
}
