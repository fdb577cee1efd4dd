use core::fmt;

/// Errors raised while assembling or driving a state table.
///
/// All of them are configuration mistakes detected before or outside the
/// per-tick processing: once a [`crate::fsm::Fsm`] is built,
/// [`crate::fsm::Fsm::process_state`] cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsmError {
    /// A state identifier does not fit in the state table.
    OutOfRange {
        /// Index of the offending state.
        index: usize,
        /// Number of slots in the state table.
        capacity: usize,
    },
    /// A state has been registered twice.
    AlreadyRegistered {
        /// Name of the offending state.
        state: &'static str,
    },
    /// A slot of the state table has been left empty.
    Missing {
        /// Index of the empty slot.
        index: usize,
    },
}

impl fmt::Display for FsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { index, capacity } => write!(
                f,
                "state index {index} does not fit in a table of {capacity} states"
            ),
            Self::AlreadyRegistered { state } => {
                write!(f, "state `{state}` has already been registered")
            }
            Self::Missing { index } => write!(f, "no state has been registered at index {index}"),
        }
    }
}

impl core::error::Error for FsmError {}

/// Errors raised while decoding a persisted identity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityError {
    /// The storage does not hold a record.
    Blank,
    /// The record is shorter than its fixed layout.
    Truncated {
        /// Number of bytes available.
        len: usize,
    },
    /// A field of the record holds an invalid value.
    Corrupted {
        /// Name of the offending field.
        field: &'static str,
    },
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => f.write_str("no identity record has been stored"),
            Self::Truncated { len } => write!(f, "identity record truncated to {len} bytes"),
            Self::Corrupted { field } => write!(f, "identity record field `{field}` is corrupted"),
        }
    }
}

impl core::error::Error for IdentityError {}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::string::ToString;

    use super::{FsmError, IdentityError};

    #[test]
    fn test_display() {
        assert_eq!(
            FsmError::OutOfRange {
                index: 9,
                capacity: 4
            }
            .to_string(),
            "state index 9 does not fit in a table of 4 states"
        );
        assert_eq!(
            FsmError::AlreadyRegistered { state: "Idle" }.to_string(),
            "state `Idle` has already been registered"
        );
        assert_eq!(
            FsmError::Missing { index: 3 }.to_string(),
            "no state has been registered at index 3"
        );
        assert_eq!(
            IdentityError::Corrupted { field: "name" }.to_string(),
            "identity record field `name` is corrupted"
        );
    }
}
