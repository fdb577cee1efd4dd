//! # SIM800 Driver
//!
//! This module provides an architecture-agnostic driver for the `SIM800`
//! family of GSM/GPRS modems, controlled through AT commands over a serial
//! line.
//!
//! The driver turns the modem into a minimal HTTP client:
//! - **Initialization**: hardware reset followed by a bounded number of
//!   liveness checks
//! - **Network attach**: opening a GPRS bearer on a configured access point
//! - **HTTP**: single-line `GET` and `POST` requests, whose response body is
//!   copied into a caller buffer
//!
//! Every wait is bounded by a timeout measured on a [`Clock`], and every
//! HTTP session is closed before a request returns, whether it succeeded or
//! not. Apart from initialization, the driver never retries on its own.
//!
//! The HTTP status is not polled with a status command. Once the server
//! answers, the modem reports it in an unsolicited
//! `+HTTPACTION: <method>,<status>,<length>` line, which the driver awaits
//! together with the acknowledgment of the action command, for up to the
//! request timeout.
//!
//! A response body longer than the reply buffer is cut at the end of the
//! buffer.
//!
//! For detailed specifications, refer to the
//! [AT command manual](https://www.simcom.com/product/SIM800.html).

use core::fmt::{self, Write as _};
use core::result::Result::{self, Err, Ok};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use embedded_io::{Read, ReadReady, Write};

use heapless::String;

use log::{debug, info, warn};

use buzzer::clock::Clock;
use buzzer::fsm::Outcome;

// Protocol-specific constants.
const LINE_LEN: usize = 256; // Size of the reply buffer.
const COMMAND_LEN: usize = 256; // Longest command, terminator included.
const RESET_PULSE_MS: u32 = 100; // Width of each phase of the reset pulse.
const POLL_DELAY_US: u32 = 200; // Delay between polls of an idle line.
const HTTP_OK: u16 = 200;

const OK: &[u8] = b"OK\r\n";
const OK_REPLY: &[u8] = b"\r\nOK\r\n";
const ERROR: &[u8] = b"ERROR";
const SHUT_OK: &[u8] = b"SHUT OK";
const DOWNLOAD: &[u8] = b"DOWNLOAD";
const ACTION_REPORT: &[u8] = b"+HTTPACTION:";

/// Errors that may occur when interacting with the `SIM800` modem.
#[derive(Debug, PartialEq, Eq)]
pub enum Sim800Error<E> {
    /// Serial line errors.
    Serial(E),
    /// The reset line could not be driven.
    Reset,
    /// The modem answered with something other than the expected reply.
    NoAcknowledgment,
    /// The modem did not answer in time.
    Timeout,
    /// The server answered with a status other than `200`.
    HttpStatus(u16),
    /// A reply could not be parsed.
    MalformedReply,
    /// A command does not fit in the command buffer.
    CommandTooLong,
}

impl<E> Sim800Error<E> {
    /// Maps the error onto a state machine [`Outcome`].
    ///
    /// A modem that did not answer within its time bound yields
    /// [`Outcome::Timeout`], while every other error yields
    /// [`Outcome::Failure`].
    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        match self {
            Self::Timeout => Outcome::Timeout,
            _ => Outcome::Failure,
        }
    }
}

impl<E> From<E> for Sim800Error<E> {
    fn from(e: E) -> Self {
        Sim800Error::Serial(e)
    }
}

impl<E: fmt::Debug> fmt::Display for Sim800Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial(e) => write!(f, "serial line error: {e:?}"),
            Self::Reset => f.write_str("unable to drive the reset line"),
            Self::NoAcknowledgment => f.write_str("command not acknowledged"),
            Self::Timeout => f.write_str("no reply from the modem"),
            Self::HttpStatus(status) => write!(f, "server answered with status {status}"),
            Self::MalformedReply => f.write_str("malformed reply"),
            Self::CommandTooLong => f.write_str("command too long"),
        }
    }
}

/// Timing and network settings of a [`Sim800`] driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sim800Config {
    apn: &'static str,
    reply_timeout_ms: u32,
    slow_timeout_ms: u32,
    request_timeout_ms: u32,
    upload_window_ms: u32,
    init_retries: u8,
    init_retry_delay_ms: u32,
}

impl Default for Sim800Config {
    fn default() -> Self {
        Self::new("internet")
    }
}

impl Sim800Config {
    /// Creates a [`Sim800Config`] for the given access point name, with
    /// default timings.
    #[must_use]
    pub const fn new(apn: &'static str) -> Self {
        Self {
            apn,
            reply_timeout_ms: 500,
            slow_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            upload_window_ms: 10_000,
            init_retries: 5,
            init_retry_delay_ms: 1_000,
        }
    }

    /// Sets the longest silence tolerated on the line while waiting for
    /// the reply to a command.
    #[must_use]
    pub const fn reply_timeout_ms(mut self, ms: u32) -> Self {
        self.reply_timeout_ms = ms;
        self
    }

    /// Sets the longest silence tolerated for commands that touch the
    /// network, such as attaching to the packet domain.
    #[must_use]
    pub const fn slow_timeout_ms(mut self, ms: u32) -> Self {
        self.slow_timeout_ms = ms;
        self
    }

    /// Sets the longest time an HTTP request may take to be answered.
    #[must_use]
    pub const fn request_timeout_ms(mut self, ms: u32) -> Self {
        self.request_timeout_ms = ms;
        self
    }

    /// Sets the time granted to upload a request body.
    #[must_use]
    pub const fn upload_window_ms(mut self, ms: u32) -> Self {
        self.upload_window_ms = ms;
        self
    }

    /// Sets how many liveness checks are attempted during initialization,
    /// and the pause between two of them.
    #[must_use]
    pub const fn init_retries(mut self, retries: u8, delay_ms: u32) -> Self {
        self.init_retries = retries;
        self.init_retry_delay_ms = delay_ms;
        self
    }

    /// Returns the access point name.
    #[must_use]
    pub const fn apn(&self) -> &'static str {
        self.apn
    }
}

/// HTTP methods supported by the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

impl Method {
    const fn action(self) -> u8 {
        match self {
            Self::Get => 0,
            Self::Post => 1,
        }
    }
}

// How a read ends when the early-exit condition is never met.
#[derive(Debug, Clone, Copy)]
enum Wait {
    // No byte received for the given time.
    Idle(u32),
    // The given time elapsed since the read started.
    Total(u32),
}

// How a reply is matched against the expected one.
#[derive(Debug, Clone, Copy)]
enum Expect {
    Exact(&'static [u8]),
    Contains(&'static [u8]),
}

/// The `SIM800` driver.
pub struct Sim800<S, P, D, K>
where
    S: Read + ReadReady + Write,
    P: OutputPin,
    D: DelayNs,
    K: Clock,
{
    serial: S,
    reset: P,
    delay: D,
    clock: K,
    config: Sim800Config,
    rx: [u8; LINE_LEN],
}

impl<S, P, D, K> Sim800<S, P, D, K>
where
    S: Read + ReadReady + Write,
    P: OutputPin,
    D: DelayNs,
    K: Clock,
{
    /// Creates a [`Sim800`] driver for the given serial line, reset pin,
    /// delay provider and clock.
    #[must_use]
    pub fn new(serial: S, reset: P, delay: D, clock: K, config: Sim800Config) -> Self {
        Self {
            serial,
            reset,
            delay,
            clock,
            config,
            rx: [0; LINE_LEN],
        }
    }

    /// Returns the driver settings.
    #[must_use]
    pub const fn config(&self) -> &Sim800Config {
        &self.config
    }

    /// Resets the modem and waits until it answers to commands.
    ///
    /// Liveness is checked up to the configured number of times. Once the
    /// modem answers, command echo is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The reset line cannot be driven
    /// - Writing to or reading from the serial line fails
    /// - The modem never acknowledges the liveness check
    pub fn init(&mut self) -> Result<(), Sim800Error<S::Error>> {
        self.pulse_reset()?;

        for attempt in 1..=self.config.init_retries {
            match self.handshake() {
                Ok(()) => {
                    info!("Modem ready after {attempt} attempt(s)");
                    return Ok(());
                }
                Err(Sim800Error::Serial(e)) => return Err(Sim800Error::Serial(e)),
                Err(e) => {
                    warn!("Modem handshake attempt {attempt} failed: {e:?}");
                    self.delay.delay_ms(self.config.init_retry_delay_ms);
                }
            }
        }

        Err(Sim800Error::NoAcknowledgment)
    }

    /// Attaches to the packet domain and opens the GPRS bearer used by HTTP
    /// requests.
    ///
    /// # Errors
    ///
    /// Returns the error of the first step of the attach sequence that
    /// fails.
    pub fn attach(&mut self) -> Result<(), Sim800Error<S::Error>> {
        let reply = self.config.reply_timeout_ms;
        let slow = self.config.slow_timeout_ms;
        let apn = self.config.apn;

        self.command(format_args!("AT+CIPSHUT"), Expect::Contains(SHUT_OK), slow)?;
        self.command(format_args!("AT+CGATT=1"), Expect::Contains(OK), slow)?;
        self.command(
            format_args!("AT+SAPBR=3,1,\"CONTYPE\",\"GPRS\""),
            Expect::Contains(OK),
            reply,
        )?;
        self.command(
            format_args!("AT+SAPBR=3,1,\"APN\",\"{apn}\""),
            Expect::Contains(OK),
            reply,
        )?;
        self.command(format_args!("AT+SAPBR=1,1"), Expect::Contains(OK), slow)?;

        info!("GPRS bearer open on `{apn}`");
        Ok(())
    }

    /// Performs an HTTP `GET` request.
    ///
    /// The first line of the response body is copied into `out`, truncated
    /// to its length, and the number of copied bytes is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of the request fails or if the server
    /// does not answer with status `200`. The HTTP session is closed in
    /// every case.
    pub fn http_get(&mut self, url: &str, out: &mut [u8]) -> Result<usize, Sim800Error<S::Error>> {
        self.http_request(Method::Get, url, None, out)
    }

    /// Performs an HTTP `POST` request with a JSON `body`.
    ///
    /// The first line of the response body is copied into `out`, truncated
    /// to its length, and the number of copied bytes is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of the request fails or if the server
    /// does not answer with status `200`. The HTTP session is closed in
    /// every case.
    pub fn http_post(
        &mut self,
        url: &str,
        body: &[u8],
        out: &mut [u8],
    ) -> Result<usize, Sim800Error<S::Error>> {
        self.http_request(Method::Post, url, Some(body), out)
    }

    fn http_request(
        &mut self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
        out: &mut [u8],
    ) -> Result<usize, Sim800Error<S::Error>> {
        // A session left open by an interrupted request makes HTTPINIT fail.
        let _ = self.terminate_session();

        let result = self.http_exchange(method, url, body, out);

        match &result {
            Ok(len) => debug!("{method:?} {url} answered with {len} bytes"),
            Err(e) => warn!("{method:?} {url} failed: {e:?}"),
        }

        if let Err(e) = self.terminate_session() {
            warn!("Unable to close the HTTP session: {e:?}");
        }

        result
    }

    fn http_exchange(
        &mut self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
        out: &mut [u8],
    ) -> Result<usize, Sim800Error<S::Error>> {
        let reply = self.config.reply_timeout_ms;

        self.command(format_args!("AT+HTTPINIT"), Expect::Exact(OK_REPLY), reply)?;
        self.command(
            format_args!("AT+HTTPPARA=\"CID\",1"),
            Expect::Exact(OK_REPLY),
            reply,
        )?;
        if needs_quotes(url) {
            self.command(
                format_args!("AT+HTTPPARA=\"URL\",\"{url}\""),
                Expect::Exact(OK_REPLY),
                reply,
            )?;
        } else {
            self.command(
                format_args!("AT+HTTPPARA=\"URL\",{url}"),
                Expect::Exact(OK_REPLY),
                reply,
            )?;
        }

        if let Some(body) = body {
            self.upload(body)?;
        }

        self.send(format_args!("AT+HTTPACTION={}", method.action()))?;
        let status = self.await_action_report()?;
        if status != HTTP_OK {
            return Err(Sim800Error::HttpStatus(status));
        }

        self.read_payload(out)
    }

    fn upload(&mut self, body: &[u8]) -> Result<(), Sim800Error<S::Error>> {
        let reply = self.config.reply_timeout_ms;
        let window = self.config.upload_window_ms;

        self.command(
            format_args!("AT+HTTPPARA=\"CONTENT\",\"application/json\""),
            Expect::Exact(OK_REPLY),
            reply,
        )?;
        self.command(
            format_args!("AT+HTTPDATA={},{window}", body.len()),
            Expect::Contains(DOWNLOAD),
            reply,
        )?;

        self.serial.write_all(body)?;
        self.serial.flush()?;

        self.expect(Expect::Contains(OK), window)
    }

    // Reads the acknowledgment of the action command and the status report
    // that follows it as a single reply, and returns the status.
    fn await_action_report(&mut self) -> Result<u16, Sim800Error<S::Error>> {
        let ceiling = self.config.request_timeout_ms;
        let len = self.receive(Wait::Total(ceiling), |rx| {
            action_report(rx).is_some() || contains(rx, ERROR)
        })?;

        let rx = &self.rx[..len];
        match action_report(rx) {
            Some(report) => parse_status(report).ok_or(Sim800Error::MalformedReply),
            None if contains(rx, ERROR) => Err(Sim800Error::NoAcknowledgment),
            None => Err(Sim800Error::Timeout),
        }
    }

    // Copies the second line of the `AT+HTTPREAD` block into `out`.
    fn read_payload(&mut self, out: &mut [u8]) -> Result<usize, Sim800Error<S::Error>> {
        self.send(format_args!("AT+HTTPREAD"))?;
        let len = self.receive(Wait::Idle(self.config.slow_timeout_ms), |rx| {
            contains(rx, OK_REPLY) || contains(rx, ERROR)
        })?;

        let rx = &self.rx[..len];
        if len == 0 {
            return Err(Sim800Error::Timeout);
        }
        // A full buffer holds a truncated block without its acknowledgment.
        if len < LINE_LEN && !contains(rx, OK_REPLY) {
            return Err(Sim800Error::NoAcknowledgment);
        }

        let payload = second_line(rx).ok_or(Sim800Error::MalformedReply)?;
        let copied = payload.len().min(out.len());
        out[..copied].copy_from_slice(&payload[..copied]);

        Ok(copied)
    }

    fn terminate_session(&mut self) -> Result<(), Sim800Error<S::Error>> {
        self.command(
            format_args!("AT+HTTPTERM"),
            Expect::Contains(OK),
            self.config.reply_timeout_ms,
        )
    }

    fn handshake(&mut self) -> Result<(), Sim800Error<S::Error>> {
        let reply = self.config.reply_timeout_ms;

        self.command(format_args!("AT"), Expect::Contains(OK), reply)?;
        self.command(format_args!("ATE0"), Expect::Contains(OK), reply)
    }

    fn pulse_reset(&mut self) -> Result<(), Sim800Error<S::Error>> {
        self.reset.set_high().map_err(|_| Sim800Error::Reset)?;
        self.delay.delay_ms(RESET_PULSE_MS);

        self.reset.set_low().map_err(|_| Sim800Error::Reset)?;
        self.delay.delay_ms(RESET_PULSE_MS);

        self.reset.set_high().map_err(|_| Sim800Error::Reset)?;

        Ok(())
    }

    // Sends a command and checks its reply.
    fn command(
        &mut self,
        command: fmt::Arguments<'_>,
        expect: Expect,
        timeout_ms: u32,
    ) -> Result<(), Sim800Error<S::Error>> {
        self.send(command)?;
        self.expect(expect, timeout_ms)
    }

    // Writes a command line, dropping whatever the modem sent before.
    fn send(&mut self, command: fmt::Arguments<'_>) -> Result<(), Sim800Error<S::Error>> {
        let mut line: String<COMMAND_LEN> = String::new();
        line.write_fmt(command)
            .and_then(|()| line.write_str("\r\n"))
            .map_err(|_| Sim800Error::CommandTooLong)?;

        self.discard_input()?;

        debug!("> {}", line.trim_end());
        self.serial.write_all(line.as_bytes())?;
        self.serial.flush()?;

        Ok(())
    }

    fn expect(&mut self, expect: Expect, timeout_ms: u32) -> Result<(), Sim800Error<S::Error>> {
        let wait = Wait::Idle(timeout_ms);
        let len = match expect {
            Expect::Exact(literal) => self.receive(wait, |rx| {
                rx.len() >= literal.len() || contains(rx, ERROR)
            })?,
            Expect::Contains(marker) => {
                self.receive(wait, |rx| contains(rx, marker) || contains(rx, ERROR))?
            }
        };

        let rx = &self.rx[..len];
        let matched = match expect {
            Expect::Exact(literal) => rx == literal,
            Expect::Contains(marker) => contains(rx, marker),
        };

        if matched {
            Ok(())
        } else if len == 0 {
            Err(Sim800Error::Timeout)
        } else {
            Err(Sim800Error::NoAcknowledgment)
        }
    }

    // Fills the reply buffer until it is full, `done` holds, or `wait`
    // expires, and returns the number of bytes received.
    fn receive<F>(&mut self, wait: Wait, done: F) -> Result<usize, Sim800Error<S::Error>>
    where
        F: Fn(&[u8]) -> bool,
    {
        let start = self.clock.now_ms();
        let mut last_byte = start;
        let mut len = 0;

        while len < LINE_LEN {
            if self.serial.read_ready()? {
                let read = self.serial.read(&mut self.rx[len..])?;
                if read == 0 {
                    break;
                }
                len += read;
                last_byte = self.clock.now_ms();

                if done(&self.rx[..len]) {
                    break;
                }
                continue;
            }

            let expired = match wait {
                Wait::Idle(ms) => self.clock.elapsed_since(last_byte) >= ms,
                Wait::Total(ms) => self.clock.elapsed_since(start) >= ms,
            };
            if expired {
                break;
            }

            self.delay.delay_us(POLL_DELAY_US);
        }

        debug!(
            "< {:?}",
            core::str::from_utf8(&self.rx[..len]).unwrap_or("<binary>")
        );

        Ok(len)
    }

    // Drops bytes left over from a previous exchange.
    fn discard_input(&mut self) -> Result<(), Sim800Error<S::Error>> {
        while self.serial.read_ready()? {
            if self.serial.read(&mut self.rx)? == 0 {
                break;
            }
        }
        Ok(())
    }
}

#[inline]
fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}

// The complete `+HTTPACTION:` line of a reply, if any.
fn action_report(rx: &[u8]) -> Option<&[u8]> {
    let start = rx
        .windows(ACTION_REPORT.len())
        .position(|window| window == ACTION_REPORT)?;
    let rest = &rx[start..];
    let end = rest.windows(2).position(|window| window == b"\r\n")?;

    Some(&rest[..end])
}

// The status is the three-digit field after the first comma.
fn parse_status(report: &[u8]) -> Option<u16> {
    let comma = report.iter().position(|&b| b == b',')?;
    let digits = report.get(comma + 1..comma + 4)?;

    digits.iter().try_fold(0u16, |status, &b| {
        b.is_ascii_digit()
            .then(|| status * 10 + u16::from(b - b'0'))
    })
}

// The second non-empty line of a reply. The first one is the header echoed
// by the command, such as `+HTTPREAD: <length>`.
fn second_line(rx: &[u8]) -> Option<&[u8]> {
    rx.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .nth(1)
}

// Characters that split AT command parameters or a query string.
fn needs_quotes(url: &str) -> bool {
    url.bytes()
        .any(|b| matches!(b, b',' | b';' | b'?' | b'&' | b'=' | b' '))
}
