//! Two-wire (I2C) multi-drop bus abstractions
//!
//! Both bus roles expose their peripheral's receive and transmit buffers as a
//! [`Link`]. The master side adds addressed transactions; the slave side
//! only needs to join the bus under its own address; data-requested and
//! data-received notifications are delivered by the board's event dispatch.

use crate::link::Link;

/// Completion code of a master write transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusStatus {
    /// Transaction acknowledged
    Success,
    /// Data did not fit the peripheral's transmit buffer
    DataTooLong,
    /// Address byte not acknowledged
    AddressNack,
    /// Data byte not acknowledged
    DataNack,
    /// Any other bus error
    Other,
    /// Transaction timed out
    Timeout,
}

// Wire format values
const STATUS_SUCCESS: u8 = 0;
const STATUS_DATA_TOO_LONG: u8 = 1;
const STATUS_ADDRESS_NACK: u8 = 2;
const STATUS_DATA_NACK: u8 = 3;
const STATUS_OTHER: u8 = 4;
const STATUS_TIMEOUT: u8 = 5;

impl BusStatus {
    /// Parse a completion code reported by the bus peripheral
    ///
    /// Unknown codes map to [`BusStatus::Other`].
    pub fn from_code(code: u8) -> Self {
        match code {
            STATUS_SUCCESS => BusStatus::Success,
            STATUS_DATA_TOO_LONG => BusStatus::DataTooLong,
            STATUS_ADDRESS_NACK => BusStatus::AddressNack,
            STATUS_DATA_NACK => BusStatus::DataNack,
            STATUS_TIMEOUT => BusStatus::Timeout,
            _ => BusStatus::Other,
        }
    }

    /// Numeric completion code
    pub fn code(self) -> u8 {
        match self {
            BusStatus::Success => STATUS_SUCCESS,
            BusStatus::DataTooLong => STATUS_DATA_TOO_LONG,
            BusStatus::AddressNack => STATUS_ADDRESS_NACK,
            BusStatus::DataNack => STATUS_DATA_NACK,
            BusStatus::Other => STATUS_OTHER,
            BusStatus::Timeout => STATUS_TIMEOUT,
        }
    }

    /// Returns true if the transaction was acknowledged
    pub fn is_success(&self) -> bool {
        matches!(self, BusStatus::Success)
    }
}

/// Bus master
///
/// Bytes written through [`Link::write`] between
/// [`begin_transmission`](TwoWireMaster::begin_transmission) and
/// [`end_transmission`](TwoWireMaster::end_transmission) form one addressed
/// write. [`request_from`](TwoWireMaster::request_from) fills the receive
/// buffer, which is then consumed through [`Link::read`].
pub trait TwoWireMaster: Link {
    /// Join the bus as master, clocking it as `config` asks
    fn join_master(&mut self, config: &I2cConfig);

    /// Set the timeout applied to subsequent transactions (0 = none)
    fn set_timeout(&mut self, timeout_ms: u32);

    /// Start an addressed write transaction
    ///
    /// # Arguments
    /// * `address` - 7-bit slave address
    fn begin_transmission(&mut self, address: u8);

    /// Send the queued bytes and release the bus
    fn end_transmission(&mut self) -> BusStatus;

    /// Ask a slave for `quantity` bytes
    ///
    /// Returns the number of bytes the slave actually delivered into the
    /// receive buffer.
    ///
    /// # Arguments
    /// * `address` - 7-bit slave address
    /// * `quantity` - Bytes to request
    fn request_from(&mut self, address: u8, quantity: u8) -> usize;
}

/// Bus slave
///
/// While a data-requested notification is being handled, [`Link::write`]
/// fills the reply. While a data-received notification is being handled,
/// [`Link::read`] yields the bytes the master sent.
pub trait TwoWireSlave: Link {
    /// Join the bus as a slave answering to `address`
    fn join_slave(&mut self, address: u8);
}

/// I2C configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            frequency: 100_000, // 100kHz standard mode
        }
    }
}

impl I2cConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self { frequency: 100_000 };

    /// Fast mode (400 kHz)
    pub const FAST: Self = Self { frequency: 400_000 };
}

/// Returns true if `address` is a usable 7-bit slave address
///
/// Addresses 0x00-0x07 and 0x78-0x7F are reserved.
pub fn is_valid_address(address: u8) -> bool {
    (0x08..0x78).contains(&address)
}
