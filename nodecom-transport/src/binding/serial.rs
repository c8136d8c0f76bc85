//! Serial link binding
//!
//! Point-to-point messages over a UART. Fixed-size values travel as raw
//! bytes; self-describing messages are chunked with the serial chunk size.

use embedded_hal::delay::DelayNs;
use nodecom_hal::SerialLink;
use nodecom_protocol::{Decode, Encode};

use crate::chunked::ChunkedTransport;
use crate::config::SerialConfig;
use crate::error::TransportError;

/// Default bound on one encoded message
pub const SERIAL_BUFFER_SIZE: usize = 256;

/// Message endpoint on a serial port
///
/// `N` bounds the size of one encoded message.
pub struct SerialPort<L, D, const N: usize = SERIAL_BUFFER_SIZE> {
    link: L,
    transport: ChunkedTransport<D>,
    config: SerialConfig,
    initialized: bool,
}

impl<L: SerialLink, D: DelayNs, const N: usize> SerialPort<L, D, N> {
    pub fn new(link: L, transport: ChunkedTransport<D>, config: SerialConfig) -> Self {
        Self {
            link,
            transport,
            config,
            initialized: false,
        }
    }

    /// Open the port at `baudrate`
    ///
    /// Only the first call configures the link; later calls are no-ops.
    pub fn init(&mut self, baudrate: u32) -> Result<(), TransportError<L::Error>> {
        if self.initialized {
            return Ok(());
        }
        self.config.uart.baudrate = baudrate;
        if !self.config.uart.is_standard_baudrate() {
            warn!("non-standard baud rate {}", baudrate);
        }
        self.link
            .begin(&self.config.uart)
            .map_err(TransportError::Link)?;
        self.initialized = true;
        debug!("serial port open at {} baud", baudrate);
        Ok(())
    }

    /// Encode and send `message`
    ///
    /// `timeout_ms` bounds the wait for the link to accept data (0 = wait
    /// forever) and stays in effect for later writes.
    pub fn write<M: Encode>(&mut self, message: &M, timeout_ms: u32) -> Result<(), TransportError<L::Error>> {
        self.init(self.config.uart.baudrate)?;
        self.transport.config_mut().write_timeout_ms = timeout_ms;
        self.transport
            .write_message::<_, M, N>(&mut self.link, message, self.config.chunk_size)
    }

    /// Receive one message
    ///
    /// # Arguments
    /// * `blocking` - Wait for the first byte instead of returning at once
    /// * `drain` - Discard whatever is left on the link afterwards
    /// * `timeout_ms` - Bound on each wait (0 = wait forever)
    ///
    /// Returns `Ok(None)` if no byte arrived.
    pub fn read<M: Encode + Decode>(
        &mut self,
        blocking: bool,
        drain: bool,
        timeout_ms: u32,
    ) -> Result<Option<M>, TransportError<L::Error>> {
        self.init(self.config.uart.baudrate)?;
        if !self
            .transport
            .wait_available(&mut self.link, 1, blocking, timeout_ms)
        {
            return Ok(None);
        }

        let result = self
            .transport
            .read_message::<_, M, N>(&mut self.link, self.config.chunk_size, timeout_ms);
        if drain {
            let dropped = self.drain()?;
            if dropped > 0 {
                debug!("drained {} residual bytes", dropped);
            }
        }
        result.map(Some)
    }

    /// Discard every queued received byte
    pub fn drain(&mut self) -> Result<usize, TransportError<L::Error>> {
        self.link.drain().map_err(TransportError::Link)
    }

    /// Active settings
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Borrow the link
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Give back the link
    pub fn release(self) -> L {
        self.link
    }
}
