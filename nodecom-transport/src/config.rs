//! Transport and binding configuration

use nodecom_hal::{I2cConfig, UartConfig};

/// Sleep between two availability checks
pub const POLL_INTERVAL_MS: u32 = 5;

/// How long a sender waits for each status byte
pub const STATUS_TIMEOUT_MS: u32 = 100;

/// Resends allowed for a single chunk before giving up
pub const DEFAULT_MAX_RETRIES: u16 = 8;

/// Chunk size used on the two-wire bus (unchunked)
///
/// Bus transactions are sized by the master before any byte moves, so there
/// is no room for a status handshake inside them.
pub const BUS_CHUNK_SIZE: u16 = 0;

/// Chunk size used on serial links
pub const SERIAL_CHUNK_SIZE: u16 = 32;

/// Chunked transport settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportConfig {
    /// Sleep between availability checks in milliseconds
    pub poll_interval_ms: u32,
    /// Bound on each status-byte wait (0 = wait forever)
    pub status_timeout_ms: u32,
    /// Resends allowed per chunk (`None` = retry forever)
    pub max_retries: Option<u16>,
    /// Bound on write-readiness polling (0 = wait forever)
    pub write_timeout_ms: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: POLL_INTERVAL_MS,
            status_timeout_ms: STATUS_TIMEOUT_MS,
            max_retries: Some(DEFAULT_MAX_RETRIES),
            write_timeout_ms: 0,
        }
    }
}

impl TransportConfig {
    /// Settings that never give up on a chunk
    pub const fn unbounded() -> Self {
        Self {
            poll_interval_ms: POLL_INTERVAL_MS,
            status_timeout_ms: STATUS_TIMEOUT_MS,
            max_retries: None,
            write_timeout_ms: 0,
        }
    }

    /// Whether `retries` resends of one chunk are still within budget
    pub fn allows_retry(&self, retries: u16) -> bool {
        match self.max_retries {
            Some(max) => retries <= max,
            None => true,
        }
    }
}

/// Two-wire bus binding settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    /// Chunk size for every message on this bus
    pub chunk_size: u16,
    /// Default transaction timeout in milliseconds (0 = none)
    pub timeout_ms: u32,
    /// Clock settings applied when the master joins
    pub i2c: I2cConfig,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            chunk_size: BUS_CHUNK_SIZE,
            timeout_ms: 0,
            i2c: I2cConfig::default(),
        }
    }
}

/// Serial binding settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialConfig {
    /// Chunk size for self-describing messages
    pub chunk_size: u16,
    /// Line settings applied on init
    pub uart: UartConfig,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            chunk_size: SERIAL_CHUNK_SIZE,
            uart: UartConfig::default(),
        }
    }
}

impl SerialConfig {
    /// Default settings at the given baud rate
    pub const fn with_baudrate(baudrate: u32) -> Self {
        Self {
            chunk_size: SERIAL_CHUNK_SIZE,
            uart: UartConfig::with_baudrate(baudrate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.poll_interval_ms, 5);
        assert_eq!(config.max_retries, Some(8));
        assert_eq!(config.write_timeout_ms, 0);

        assert_eq!(BusConfig::default().chunk_size, 0);
        assert_eq!(BusConfig::default().i2c.frequency, 100_000);
        assert_eq!(SerialConfig::default().chunk_size, 32);
        assert_eq!(SerialConfig::default().uart.baudrate, 9600);
        assert_eq!(SerialConfig::with_baudrate(115_200).uart.baudrate, 115_200);
    }

    #[test]
    fn test_retry_budget() {
        let config = TransportConfig {
            max_retries: Some(2),
            ..TransportConfig::default()
        };
        assert!(config.allows_retry(1));
        assert!(config.allows_retry(2));
        assert!(!config.allows_retry(3));
        assert!(TransportConfig::unbounded().allows_retry(u16::MAX));
    }
}
