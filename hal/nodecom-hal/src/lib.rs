//! Nodecom Hardware Abstraction Layer
//!
//! This crate defines the physical-link traits the Nodecom transport is
//! written against. Board support crates implement them on top of their
//! UART and two-wire (I2C) peripherals; tests implement them on in-memory
//! queues.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (node firmware)            │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  nodecom-transport (chunking, bindings) │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  nodecom-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`link::Link`] - Byte stream with an availability counter
//! - [`link::SerialLink`] - Link with configurable line settings
//! - [`bus::TwoWireMaster`], [`bus::TwoWireSlave`] - Multi-drop bus roles

#![no_std]
#![deny(unsafe_code)]

pub mod bus;
pub mod link;

// Re-export key traits at crate root for convenience
pub use bus::{BusStatus, I2cConfig, TwoWireMaster, TwoWireSlave};
pub use link::{Link, SerialLink, UartConfig};
