//! Byte-stream link abstractions
//!
//! A [`Link`] is the lowest layer the transport sees: a duplex byte stream
//! that can report how many received bytes are queued. Serial ports and the
//! receive/transmit buffers of a two-wire bus peripheral both fit this shape.

pub use embedded_io::{Error, ErrorKind, ErrorType};

/// Common baud rate for node-to-node serial links
pub const BAUD_COMMON: u32 = 9600;

/// Baud rate expected by ESP8266 Wi-Fi bridges
pub const BAUD_ESP8266: u32 = 115_200;

/// Supported baud rates, slowest first
pub const BAUD_RATES: [u32; 8] = [1200, 2400, 4800, 9600, 19_200, 38_400, 57_600, 115_200];

/// Duplex byte stream with a receive-availability counter
///
/// Reads never block: the transport polls [`Link::available`] and only reads
/// what is already queued. Writes may block until the transmitter accepts
/// the data.
pub trait Link: ErrorType {
    /// Number of received bytes waiting to be read
    fn available(&mut self) -> usize;

    /// Whether the transmitter can accept data right now
    fn available_for_write(&mut self) -> bool {
        true
    }

    /// Read up to `buf.len()` already-received bytes
    ///
    /// Returns the number of bytes copied into `buf`, which may be less than
    /// requested (including zero) if fewer bytes are queued.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Queue all of `data` for transmission
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Push any buffered transmit data onto the wire
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Read a single byte if one is queued
    fn read_byte(&mut self) -> Result<Option<u8>, Self::Error> {
        let mut buf = [0u8; 1];
        match self.read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    /// Discard every queued received byte
    ///
    /// Returns how many bytes were dropped.
    fn drain(&mut self) -> Result<usize, Self::Error> {
        let mut dropped = 0;
        let mut scratch = [0u8; 16];
        while self.available() > 0 {
            let n = self.read(&mut scratch)?;
            if n == 0 {
                break;
            }
            dropped += n;
        }
        Ok(dropped)
    }
}

impl<T: Link + ?Sized> Link for &mut T {
    fn available(&mut self) -> usize {
        T::available(self)
    }

    fn available_for_write(&mut self) -> bool {
        T::available_for_write(self)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        T::read(self, buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        T::write(self, data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        T::flush(self)
    }
}

/// Serial port link
///
/// A [`Link`] whose line settings can be (re)configured at runtime.
pub trait SerialLink: Link {
    /// Open the port with the given line settings
    fn begin(&mut self, config: &UartConfig) -> Result<(), Self::Error>;
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baudrate: BAUD_COMMON,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl UartConfig {
    /// 8N1 configuration at the given baud rate
    pub const fn with_baudrate(baudrate: u32) -> Self {
        Self {
            baudrate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }

    /// Whether the baud rate is one of [`BAUD_RATES`]
    pub fn is_standard_baudrate(&self) -> bool {
        BAUD_RATES.contains(&self.baudrate)
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
    Nine,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}
