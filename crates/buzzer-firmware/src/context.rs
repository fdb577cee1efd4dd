use core::fmt::Write as _;

use log::{info, warn};

use serde::de::DeserializeOwned;

use buzzer::api::{self, BuzzerName, BuzzerRequest, PartyName};
use buzzer::error::IdentityError;
use buzzer::identity::{Identity, RECORD_LEN, StoredParty};

use crate::board::{Board, CellularLink, LinkError, Screen, Storage};
use crate::endpoints::{Endpoint, Endpoints};
use crate::settings::Settings;

// Longest reply line accepted from the backend.
const REPLY_LEN: usize = 256;

/// A party handed to the buzzer by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    /// Party identifier.
    pub id: u32,
    /// Party name.
    pub name: PartyName,
    /// Expected wait, in minutes.
    pub wait_minutes: u16,
    /// Whether the backend confirmed the buzzer is in charge of the party.
    pub accepted: bool,
}

/// Values read and written by the device states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    /// Name issued by the backend.
    pub name: Option<BuzzerName>,
    /// The current party, if any.
    pub party: Option<Party>,
    /// Whether the buzzer reached the idle state at least once.
    pub initialized: bool,
    /// Whether the packet network must be attached again.
    pub link_lost: bool,
}

impl AppState {
    /// Restores the values persisted in an [`Identity`].
    ///
    /// A stored party has always been accepted.
    #[must_use]
    pub fn from_identity(identity: Identity) -> Self {
        Self {
            name: Some(identity.name),
            party: identity.party.map(|party| Party {
                id: party.id,
                name: party.name,
                wait_minutes: party.wait_minutes,
                accepted: true,
            }),
            initialized: false,
            link_lost: false,
        }
    }

    /// Returns the values to persist, or [`None`] before a name has been
    /// issued.
    ///
    /// Only an accepted party is persisted.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        let name = self.name.clone()?;
        let party = self
            .party
            .as_ref()
            .filter(|party| party.accepted)
            .map(|party| StoredParty {
                id: party.id,
                name: party.name.clone(),
                wait_minutes: party.wait_minutes,
            });

        Some(Identity { name, party })
    }

    /// Returns the buzzer name, or an empty string before a name has been
    /// issued.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    /// Returns the accepted party, if any.
    #[must_use]
    pub fn accepted_party(&self) -> Option<&Party> {
        self.party.as_ref().filter(|party| party.accepted)
    }
}

/// Why an exchange with the backend failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeError {
    /// The request did not go through.
    Link(LinkError),
    /// The reply is not what the endpoint returns.
    Malformed,
}

impl ExchangeError {
    /// Whether the link did not answer in time.
    #[must_use]
    pub const fn timed_out(self) -> bool {
        matches!(self, Self::Link(LinkError::Timeout))
    }
}

impl From<LinkError> for ExchangeError {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

impl core::fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Link(e) => write!(f, "{e}"),
            Self::Malformed => f.write_str("malformed reply"),
        }
    }
}

/// Everything a device state can act upon.
pub struct Context<B> {
    /// The board hardware.
    pub board: B,
    /// Values shared across states.
    pub app: AppState,
    /// Timings and retry bounds.
    pub settings: Settings,
    endpoints: Endpoints,
}

impl<B: Board> Context<B> {
    /// Creates a [`Context`] with an empty [`AppState`].
    #[must_use]
    pub fn new(board: B, settings: Settings, endpoints: Endpoints) -> Self {
        Self {
            board,
            app: AppState::default(),
            settings,
            endpoints,
        }
    }

    /// Returns the backend endpoints.
    #[must_use]
    pub const fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Clears the screen and prints the given lines.
    pub fn show(&mut self, lines: &[&str]) {
        let screen = self.board.screen();
        screen.clear();
        for line in lines {
            screen.print_line(line);
        }
    }

    /// Restores the full screen contrast.
    pub fn brighten(&mut self) {
        self.board.screen().set_contrast(u8::MAX);
    }

    /// Dims the screen.
    pub fn dim(&mut self) {
        self.board.screen().set_contrast(0);
    }

    /// Shows the battery charge on a row of the screen.
    pub fn show_battery(&mut self, row: u8) {
        let percent = self.board.battery_percent();

        let mut line: heapless::String<16> = heapless::String::new();
        let _ = write!(line, "Battery: {percent}%");
        self.board.screen().write_row(row, &line);
    }

    /// Shows a notice for the given time.
    pub fn notice(&mut self, lines: &[&str], ms: u32) {
        self.show(lines);
        self.board.delay_ms(ms);
    }

    /// Requests an endpoint with `GET` and decodes its reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the reply cannot be decoded.
    pub fn get<T: DeserializeOwned>(&mut self, endpoint: Endpoint) -> Result<T, ExchangeError> {
        let mut reply = [0; REPLY_LEN];
        let url = self.endpoints.url(endpoint);
        let len = self.board.link().get(url, &mut reply)?;

        decode(&reply[..len])
    }

    /// Posts a request to an endpoint and decodes its reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the reply cannot be decoded.
    pub fn post<T: DeserializeOwned>(
        &mut self,
        endpoint: Endpoint,
        request: &BuzzerRequest<'_>,
    ) -> Result<T, ExchangeError> {
        let body = request.encode().map_err(|_| ExchangeError::Malformed)?;

        let mut reply = [0; REPLY_LEN];
        let url = self.endpoints.url(endpoint);
        let len = self.board.link().post(url, &body, &mut reply)?;

        decode(&reply[..len])
    }

    /// Posts a request carrying only the buzzer name.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the reply cannot be decoded.
    pub fn post_name<T: DeserializeOwned>(&mut self, endpoint: Endpoint) -> Result<T, ExchangeError> {
        let name = self.app.name.clone().unwrap_or_default();
        self.post(endpoint, &BuzzerRequest::new(&name))
    }

    /// Writes the identity record to persistent storage.
    ///
    /// Storage errors are logged and otherwise ignored.
    pub fn persist(&mut self) {
        let Some(identity) = self.app.identity() else {
            return;
        };

        match self.board.storage().store(&identity.encode()) {
            Ok(()) => info!("Identity of `{}` stored", identity.name),
            Err(e) => warn!("Unable to store the identity: {e}"),
        }
    }

    /// Restores the identity record from persistent storage.
    ///
    /// Returns whether a record has been restored.
    pub fn restore(&mut self) -> bool {
        let mut record = [0; RECORD_LEN];
        let len = match self.board.storage().load(&mut record) {
            Ok(len) => len,
            Err(e) => {
                warn!("Unable to read the identity: {e}");
                return false;
            }
        };

        match Identity::decode(&record[..len]) {
            Ok(identity) => {
                info!("Restored the identity of `{}`", identity.name);
                self.app = AppState::from_identity(identity);
                true
            }
            Err(IdentityError::Blank) => {
                info!("No identity stored");
                false
            }
            Err(e) => {
                warn!("Discarding the stored identity: {e}");
                false
            }
        }
    }
}

fn decode<T: DeserializeOwned>(line: &[u8]) -> Result<T, ExchangeError> {
    api::decode(line).map_err(|e| {
        warn!("Unable to decode the reply: {e}");
        ExchangeError::Malformed
    })
}
