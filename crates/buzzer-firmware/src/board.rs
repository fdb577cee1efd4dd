use crate::error::Result;

/// Errors reported by a [`CellularLink`].
///
/// Device states try again at once after a timeout, and back off after any
/// other failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The modem or the server did not answer in time.
    Timeout,
    /// Any other failure.
    Failure,
}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Timeout => "link timed out",
            Self::Failure => "link failure",
        })
    }
}

/// A cellular data link able to perform single-line HTTP requests.
pub trait CellularLink {
    /// Resets the modem and waits until it answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the modem never answers.
    fn init(&mut self) -> core::result::Result<(), LinkError>;

    /// Attaches to the packet network.
    ///
    /// # Errors
    ///
    /// Returns an error if a step of the attach sequence fails.
    fn attach(&mut self) -> core::result::Result<(), LinkError>;

    /// Performs an HTTP `GET` request and copies the first line of the
    /// response body into `out`, returning its length.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn get(&mut self, url: &str, out: &mut [u8]) -> core::result::Result<usize, LinkError>;

    /// Performs an HTTP `POST` request with a JSON `body` and copies the
    /// first line of the response body into `out`, returning its length.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn post(
        &mut self,
        url: &str,
        body: &[u8],
        out: &mut [u8],
    ) -> core::result::Result<usize, LinkError>;
}

/// A small text screen organized in rows.
pub trait Screen {
    /// Clears the screen and moves the cursor to the first row.
    fn clear(&mut self);

    /// Prints a line at the cursor and moves the cursor to the next row.
    fn print_line(&mut self, text: &str);

    /// Replaces the content of a row, leaving the cursor untouched.
    fn write_row(&mut self, row: u8, text: &str);

    /// Sets the contrast, where `0` dims the screen.
    fn set_contrast(&mut self, level: u8);
}

/// Persistent storage holding the identity record.
pub trait Storage {
    /// Reads the stored bytes into `buf`, returning how many were read.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn load(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Replaces the stored bytes with `record`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be written.
    fn store(&mut self, record: &[u8]) -> Result<()>;
}

/// The hardware of a buzzer.
pub trait Board {
    /// The cellular link.
    type Link: CellularLink;
    /// The screen.
    type Screen: Screen;
    /// The persistent storage.
    type Storage: Storage;

    /// Returns the cellular link.
    fn link(&mut self) -> &mut Self::Link;

    /// Returns the screen.
    fn screen(&mut self) -> &mut Self::Screen;

    /// Returns the persistent storage.
    fn storage(&mut self) -> &mut Self::Storage;

    /// Turns the vibration motor on or off.
    fn set_buzzer(&mut self, on: bool);

    /// Returns the battery charge, in percent.
    fn battery_percent(&mut self) -> u8;

    /// Blocks for the given time.
    fn delay_ms(&mut self, ms: u32);
}
