use alloc::format;
use alloc::string::String;

const API_PATH: &str = "buzzer_api";

/// A backend endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Issues a new buzzer name.
    NewName,
    /// Tells whether a buzzer is registered.
    Registration,
    /// Returns a party without a buzzer.
    AvailableParty,
    /// Hands a party to a buzzer.
    AcceptParty,
    /// Returns the status of the party of a buzzer.
    Heartbeat,
}

impl Endpoint {
    const fn path(self) -> &'static str {
        match self {
            Self::NewName => "get_new_buzzer_name",
            Self::Registration => "is_buzzer_registered",
            Self::AvailableParty => "get_available_party",
            Self::AcceptParty => "accept_party",
            Self::Heartbeat => "heartbeat",
        }
    }
}

/// The URLs of the backend endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    new_name: String,
    registration: String,
    available_party: String,
    accept_party: String,
    heartbeat: String,
}

impl Endpoints {
    /// Derives the endpoint URLs from the backend base URL.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let url = |endpoint: Endpoint| format!("{base}/{API_PATH}/{}", endpoint.path());

        Self {
            new_name: url(Endpoint::NewName),
            registration: url(Endpoint::Registration),
            available_party: url(Endpoint::AvailableParty),
            accept_party: url(Endpoint::AcceptParty),
            heartbeat: url(Endpoint::Heartbeat),
        }
    }

    /// Returns the URL of an endpoint.
    #[must_use]
    pub fn url(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::NewName => &self.new_name,
            Endpoint::Registration => &self.registration,
            Endpoint::AvailableParty => &self.available_party,
            Endpoint::AcceptParty => &self.accept_party,
            Endpoint::Heartbeat => &self.heartbeat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let endpoints = Endpoints::new("http://backend.local/");

        assert_eq!(
            endpoints.url(Endpoint::NewName),
            "http://backend.local/buzzer_api/get_new_buzzer_name"
        );
        assert_eq!(
            endpoints.url(Endpoint::Registration),
            "http://backend.local/buzzer_api/is_buzzer_registered"
        );
        assert_eq!(
            endpoints.url(Endpoint::AvailableParty),
            "http://backend.local/buzzer_api/get_available_party"
        );
        assert_eq!(
            endpoints.url(Endpoint::AcceptParty),
            "http://backend.local/buzzer_api/accept_party"
        );
        assert_eq!(
            Endpoints::new("http://backend.local").url(Endpoint::Heartbeat),
            "http://backend.local/buzzer_api/heartbeat"
        );
    }
}
