//! Scripted link and delay for unit tests

use std::collections::VecDeque;

use embedded_hal::delay::DelayNs;
use embedded_io::ErrorKind;
use nodecom_hal::bus::{BusStatus, I2cConfig, TwoWireMaster, TwoWireSlave};
use nodecom_hal::link::{ErrorType, Link, SerialLink, UartConfig};

/// Link that plays back canned peer replies
///
/// Each flush closes one outgoing frame and releases the next queued reply
/// into the receive buffer, the way a peer answers every write it sees.
#[derive(Debug, Default)]
pub struct ScriptedLink {
    rx: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    pending: Vec<u8>,
    frames: Vec<Vec<u8>>,
    pub writable: bool,
    pub uart: Option<UartConfig>,
    pub slave_address: Option<u8>,
    pub master_joined: u32,
    pub i2c: Option<I2cConfig>,
    pub bus_timeout_ms: Option<u32>,
    pub addressed: Option<u8>,
    pub requested: Option<(u8, u8)>,
    pub end_status: Option<BusStatus>,
    pub ended: u32,
}

impl ScriptedLink {
    pub fn new() -> Self {
        Self {
            writable: true,
            ..Self::default()
        }
    }

    /// Bytes already queued before the first write
    pub fn with_input(bytes: &[u8]) -> Self {
        let mut link = Self::new();
        link.rx.extend(bytes);
        link
    }

    /// Queue a reply released by the next flush
    pub fn reply(mut self, bytes: &[u8]) -> Self {
        self.replies.push_back(bytes.to_vec());
        self
    }

    /// Push bytes straight into the receive buffer
    pub fn inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Flushed frames in order
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    /// Everything flushed, concatenated
    pub fn sent(&self) -> Vec<u8> {
        self.frames.concat()
    }

    /// Replies not yet released
    pub fn unreleased(&self) -> usize {
        self.replies.len()
    }
}

impl ErrorType for ScriptedLink {
    type Error = ErrorKind;
}

impl Link for ScriptedLink {
    fn available(&mut self) -> usize {
        self.rx.len()
    }

    fn available_for_write(&mut self) -> bool {
        self.writable
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), ErrorKind> {
        self.pending.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ErrorKind> {
        if !self.pending.is_empty() {
            self.frames.push(core::mem::take(&mut self.pending));
        }
        if let Some(reply) = self.replies.pop_front() {
            self.rx.extend(reply);
        }
        Ok(())
    }
}

impl SerialLink for ScriptedLink {
    fn begin(&mut self, config: &UartConfig) -> Result<(), ErrorKind> {
        self.uart = Some(*config);
        Ok(())
    }
}

impl TwoWireMaster for ScriptedLink {
    fn join_master(&mut self, config: &I2cConfig) {
        self.master_joined += 1;
        self.i2c = Some(*config);
    }

    fn set_timeout(&mut self, timeout_ms: u32) {
        self.bus_timeout_ms = Some(timeout_ms);
    }

    fn begin_transmission(&mut self, address: u8) {
        self.addressed = Some(address);
    }

    fn end_transmission(&mut self) -> BusStatus {
        self.ended += 1;
        self.end_status.unwrap_or(BusStatus::Success)
    }

    fn request_from(&mut self, address: u8, quantity: u8) -> usize {
        self.requested = Some((address, quantity));
        if let Some(reply) = self.replies.pop_front() {
            self.rx.extend(reply);
        }
        self.rx.len().min(usize::from(quantity))
    }
}

impl TwoWireSlave for ScriptedLink {
    fn join_slave(&mut self, address: u8) {
        self.slave_address = Some(address);
    }
}

/// Delay that returns immediately and remembers how long it was asked to sleep
#[derive(Debug, Default)]
pub struct NoDelay {
    pub slept_ns: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.slept_ns += u64::from(ns);
    }
}
