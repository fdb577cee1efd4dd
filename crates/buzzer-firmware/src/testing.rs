// In-memory board used by the unit tests.

extern crate std;
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::{String, ToString};
use std::vec::Vec;

use core::cell::Cell;

use buzzer::clock::Clock;

use crate::board::{Board, CellularLink, LinkError, Screen, Storage};
use crate::context::Context;
use crate::endpoints::{Endpoint, Endpoints};
use crate::error::{Error, ErrorKind, Result};
use crate::settings::Settings;

pub(crate) const BASE_URL: &str = "http://backend.local";

type Reply = core::result::Result<String, LinkError>;

#[derive(Default)]
pub(crate) struct FakeLink {
    replies: Vec<(String, VecDeque<Reply>)>,
    pub(crate) init_results: VecDeque<core::result::Result<(), LinkError>>,
    pub(crate) attach_results: VecDeque<core::result::Result<(), LinkError>>,
    pub(crate) requests: Vec<(String, String)>,
    pub(crate) inits: u32,
    pub(crate) attaches: u32,
}

impl FakeLink {
    pub(crate) fn reply(&mut self, endpoint: Endpoint, body: &str) {
        self.push(endpoint, Ok(body.to_string()));
    }

    pub(crate) fn fail(&mut self, endpoint: Endpoint, error: LinkError) {
        self.push(endpoint, Err(error));
    }

    fn push(&mut self, endpoint: Endpoint, reply: Reply) {
        let url = Endpoints::new(BASE_URL).url(endpoint).to_string();
        match self.replies.iter_mut().find(|(known, _)| *known == url) {
            Some((_, queue)) => queue.push_back(reply),
            None => self.replies.push((url, VecDeque::from([reply]))),
        }
    }

    fn answer(&mut self, url: &str, body: &[u8], out: &mut [u8]) -> core::result::Result<usize, LinkError> {
        self.requests.push((
            url.to_string(),
            String::from_utf8_lossy(body).into_owned(),
        ));

        let reply = self
            .replies
            .iter_mut()
            .find(|(known, _)| known == url)
            .and_then(|(_, queue)| queue.pop_front())
            .unwrap_or(Err(LinkError::Timeout))?;

        let len = reply.len().min(out.len());
        out[..len].copy_from_slice(&reply.as_bytes()[..len]);
        Ok(len)
    }
}

impl CellularLink for FakeLink {
    fn init(&mut self) -> core::result::Result<(), LinkError> {
        self.inits += 1;
        self.init_results.pop_front().unwrap_or(Ok(()))
    }

    fn attach(&mut self) -> core::result::Result<(), LinkError> {
        self.attaches += 1;
        self.attach_results.pop_front().unwrap_or(Ok(()))
    }

    fn get(&mut self, url: &str, out: &mut [u8]) -> core::result::Result<usize, LinkError> {
        self.answer(url, &[], out)
    }

    fn post(&mut self, url: &str, body: &[u8], out: &mut [u8]) -> core::result::Result<usize, LinkError> {
        self.answer(url, body, out)
    }
}

#[derive(Default)]
pub(crate) struct FakeScreen {
    pub(crate) lines: Vec<String>,
    pub(crate) rows: Vec<(u8, String)>,
    pub(crate) contrast: Option<u8>,
}

impl FakeScreen {
    pub(crate) fn shows(&self, text: &str) -> bool {
        self.lines.iter().any(|line| line == text)
    }
}

impl Screen for FakeScreen {
    fn clear(&mut self) {
        self.lines.clear();
        self.rows.clear();
    }

    fn print_line(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn write_row(&mut self, row: u8, text: &str) {
        self.rows.push((row, text.to_string()));
    }

    fn set_contrast(&mut self, level: u8) {
        self.contrast = Some(level);
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakeStorage {
    pub(crate) bytes: Vec<u8>,
    pub(crate) read_only: bool,
}

impl Storage for FakeStorage {
    fn load(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = self.bytes.len().min(buf.len());
        buf[..len].copy_from_slice(&self.bytes[..len]);
        Ok(len)
    }

    fn store(&mut self, record: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(Error::new(ErrorKind::Storage, "read only"));
        }
        self.bytes = record.to_vec();
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeBoard {
    pub(crate) link: FakeLink,
    pub(crate) screen: FakeScreen,
    pub(crate) storage: FakeStorage,
    pub(crate) buzzer_on: bool,
    pub(crate) buzzes: u32,
    pub(crate) battery: u8,
    pub(crate) delayed_ms: u64,
}

impl FakeBoard {
    pub(crate) fn context() -> Context<Self> {
        Context::new(Self::default(), Settings::default(), Endpoints::new(BASE_URL))
    }
}

impl Board for FakeBoard {
    type Link = FakeLink;
    type Screen = FakeScreen;
    type Storage = FakeStorage;

    fn link(&mut self) -> &mut Self::Link {
        &mut self.link
    }

    fn screen(&mut self) -> &mut Self::Screen {
        &mut self.screen
    }

    fn storage(&mut self) -> &mut Self::Storage {
        &mut self.storage
    }

    fn set_buzzer(&mut self, on: bool) {
        if on && !self.buzzer_on {
            self.buzzes += 1;
        }
        self.buzzer_on = on;
    }

    fn battery_percent(&mut self) -> u8 {
        self.battery
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delayed_ms += u64::from(ms);
    }
}

#[derive(Clone, Default)]
pub(crate) struct TestClock(pub(crate) Rc<Cell<u32>>);

impl TestClock {
    pub(crate) fn advance(&self, ms: u32) {
        self.0.set(self.0.get().wrapping_add(ms));
    }
}

impl Clock for TestClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}
