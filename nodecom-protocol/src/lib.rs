//! Nodecom payload protocol
//!
//! This crate defines how values travel between sensor/actuator nodes,
//! independently of the physical link that carries them:
//!
//! - [`codec`] - the [`Encode`]/[`Decode`] contract. Arithmetic types
//!   ([`Scalar`]) are raw little-endian bytes of fixed size; every other
//!   payload type describes its own layout.
//! - [`variant`] - [`TaggedValue`], a reading that is either a float or an
//!   integer.
//! - [`event`] - the [`Event`] and [`SensorReading`] envelopes and their
//!   length-prefixed binary layouts.
//!
//! ```text
//! SensorReading
//! ┌──────────┬─────┬─────────┬─────────────┬────────────┬──────────────┬─────────┐
//! │ time_sec │ tag │ value   │ len+id      │ len+type   │ len+datatype │ len+unit│
//! │ 4B       │ 1B  │ 8B      │ 4B + n      │ 4B + n     │ 4B + n       │ 4B + n  │
//! └──────────┴─────┴─────────┴─────────────┴────────────┴──────────────┴─────────┘
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod codec;
pub mod event;
pub mod time;
pub mod variant;

pub use codec::{CodecError, Decode, Encode, Reader, Scalar, WireForm, Writer};
pub use event::{ErrorCode, Event, LogLevel, SensorReading};
pub use time::Timestamp;
pub use variant::{Alternative, FirstMatch, TaggedValue};
