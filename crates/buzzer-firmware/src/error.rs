use alloc::borrow::Cow;
use alloc::format;

use buzzer::error::{FsmError, IdentityError};

/// All possible error kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Persistent storage could not be read or written.
    Storage,
    /// The persisted identity record could not be decoded.
    Identity,
    /// The device state table is inconsistent.
    StateTable,
}

impl ErrorKind {
    pub(crate) const fn description(self) -> &'static str {
        match self {
            Self::Storage => "Storage",
            Self::Identity => "Identity",
            Self::StateTable => "State Table",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.description())
    }
}

/// Firmware error.
#[derive(Debug, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    description: Cow<'static, str>,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.kind, self.description)
    }
}

impl core::error::Error for Error {}

impl Error {
    /// Creates an [`Error`] from an [`ErrorKind`] and a description.
    #[must_use]
    pub fn new(kind: ErrorKind, description: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    /// Returns the [`ErrorKind`].
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<FsmError> for Error {
    fn from(e: FsmError) -> Self {
        Self::new(ErrorKind::StateTable, format!("{e}"))
    }
}

impl From<IdentityError> for Error {
    fn from(e: IdentityError) -> Self {
        Self::new(ErrorKind::Identity, format!("{e}"))
    }
}

/// A specialized [`Result`] type for [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
