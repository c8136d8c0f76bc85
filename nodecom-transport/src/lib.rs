//! Nodecom transport
//!
//! Moves encoded payloads across links that only buffer a few dozen bytes.
//! Large payloads are split into chunks, each acknowledged by the receiver
//! before the next one is sent:
//!
//! ```text
//! sender                                   receiver
//!   │── header [chunk:2][count:2][total:4] ──▶│
//!   │◀──────────────── status ────────────────│  0 ok / 1 not ready / 2 rejected
//!   │── chunk 0 ─────────────────────────────▶│
//!   │◀──────────────── status ────────────────│  non-zero: same chunk again
//!   │── ...                                   │
//! ```
//!
//! A chunk size of zero skips the handshake entirely; the receiver must then
//! know the payload length in advance.
//!
//! On top of [`ChunkedTransport`] sit the link bindings:
//! - [`binding::bus`] - master publish/request and slave reply/subscribe on a
//!   two-wire bus
//! - [`binding::serial`] - blocking or polling reads on a serial port
//!
//! Everything runs on the caller's thread; waits are polling loops that
//! sleep through an [`embedded_hal::delay::DelayNs`] between checks.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod binding;
pub mod chunked;
pub mod config;
pub mod error;
pub mod header;
pub mod shared;

#[cfg(test)]
mod mock;

pub use binding::bus::{BusMaster, BusSlave};
pub use binding::registry::{HandlerRegistry, ReplyFn, ReplyHandler, Role, SubscribeFn, SubscribeHandler};
pub use binding::serial::SerialPort;
pub use chunked::ChunkedTransport;
pub use config::{BusConfig, SerialConfig, TransportConfig};
pub use error::TransportError;
pub use header::{ChunkMetadata, ChunkStatus, METADATA_SIZE};
pub use shared::SharedLink;
