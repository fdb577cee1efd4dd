use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use embedded_io::{Read, ReadReady, Write};

use buzzer::clock::Clock;
use buzzer::fsm::Outcome;

use buzzer_drivers::sim800::{Sim800, Sim800Error};

use crate::board::{CellularLink, LinkError};

impl<E> From<Sim800Error<E>> for LinkError {
    fn from(e: Sim800Error<E>) -> Self {
        match e.outcome() {
            Outcome::Timeout => Self::Timeout,
            _ => Self::Failure,
        }
    }
}

impl<S, P, D, K> CellularLink for Sim800<S, P, D, K>
where
    S: Read + ReadReady + Write,
    P: OutputPin,
    D: DelayNs,
    K: Clock,
{
    fn init(&mut self) -> Result<(), LinkError> {
        Ok(Sim800::init(self)?)
    }

    fn attach(&mut self) -> Result<(), LinkError> {
        Ok(Sim800::attach(self)?)
    }

    fn get(&mut self, url: &str, out: &mut [u8]) -> Result<usize, LinkError> {
        Ok(self.http_get(url, out)?)
    }

    fn post(&mut self, url: &str, body: &[u8], out: &mut [u8]) -> Result<usize, LinkError> {
        Ok(self.http_post(url, body, out)?)
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use super::*;

    #[test]
    fn test_driver_errors() {
        let timeout: Sim800Error<Infallible> = Sim800Error::Timeout;
        assert_eq!(LinkError::from(timeout), LinkError::Timeout);

        for e in [
            Sim800Error::<Infallible>::NoAcknowledgment,
            Sim800Error::HttpStatus(500),
            Sim800Error::MalformedReply,
            Sim800Error::Reset,
        ] {
            assert_eq!(LinkError::from(e), LinkError::Failure);
        }
    }
}
