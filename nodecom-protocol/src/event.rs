//! Event and sensor-reading envelopes
//!
//! These are the payloads nodes exchange most often. Both are
//! self-describing: a fixed header of scalars followed by 32-bit
//! length-prefixed strings.
//!
//! Event layout:
//! ```text
//! [time_sec:4][level:1][error_code:1][name_len:4][name][msg_len:4][msg]
//! ```

use core::fmt;

use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::codec::{prefixed_len, CodecError, Decode, Encode, Reader, WireForm, Writer};
use crate::time::Timestamp;
use crate::variant::{TaggedValue, RAW_VALUE_SIZE};

/// Maximum event source name length
pub const MAX_SOURCE_NAME_LEN: usize = 32;

/// Maximum event message length
pub const MAX_EVENT_MESSAGE_LEN: usize = 128;

/// Maximum sensor identifier length
pub const MAX_SENSOR_ID_LEN: usize = 16;

/// Maximum sensor type name length
pub const MAX_SENSOR_TYPE_LEN: usize = 16;

/// Maximum data type name length
pub const MAX_DATA_TYPE_LEN: usize = 16;

/// Maximum unit name length
pub const MAX_UNIT_LEN: usize = 8;

/// Bytes before the first string of an encoded event
const EVENT_HEADER_LEN: usize = 4 + 1 + 1;

/// Bytes before the first string of an encoded sensor reading
const READING_HEADER_LEN: usize = 4 + 1 + RAW_VALUE_SIZE;

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(i8)]
pub enum LogLevel {
    Debug = -1,
    #[default]
    Info = 0,
    Warn = 1,
    Error = 2,
    Fatal = 3,
}

impl LogLevel {
    /// Parse a level from its wire byte
    ///
    /// Unknown bytes map to [`LogLevel::Info`].
    pub fn from_byte(byte: u8) -> Self {
        match byte as i8 {
            -1 => LogLevel::Debug,
            1 => LogLevel::Warn,
            2 => LogLevel::Error,
            3 => LogLevel::Fatal,
            _ => LogLevel::Info,
        }
    }

    /// Convert to wire byte
    pub fn to_byte(self) -> u8 {
        self as i8 as u8
    }

    /// Upper-case level name
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }
}

/// Well-known event error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ErrorCode {
    Normal,
    Warn,
    Error,
}

impl ErrorCode {
    /// Parse a well-known code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ErrorCode::Normal),
            1 => Some(ErrorCode::Warn),
            2 => Some(ErrorCode::Error),
            _ => None,
        }
    }

    /// Numeric code
    pub fn code(self) -> u8 {
        match self {
            ErrorCode::Normal => 0,
            ErrorCode::Warn => 1,
            ErrorCode::Error => 2,
        }
    }

    /// Upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Normal => "INFO",
            ErrorCode::Warn => "WARN",
            ErrorCode::Error => "ERROR",
        }
    }
}

fn bounded<const N: usize>(s: &str) -> Result<String<N>, CodecError> {
    let mut out = String::new();
    out.push_str(s).map_err(|_| CodecError::CapacityExceeded)?;
    Ok(out)
}

/// Log event raised by a node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// When the event was raised
    pub time: Timestamp,
    /// Severity
    pub level: LogLevel,
    /// Application-defined error code (see [`ErrorCode`])
    pub error_code: u8,
    /// Name of the component that raised the event
    pub source_name: String<MAX_SOURCE_NAME_LEN>,
    /// Free-text message
    pub message: String<MAX_EVENT_MESSAGE_LEN>,
}

impl Event {
    /// Create an event, checking string capacities
    pub fn new(
        time: Timestamp,
        level: LogLevel,
        error_code: u8,
        source_name: &str,
        message: &str,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            time,
            level,
            error_code,
            source_name: bounded(source_name)?,
            message: bounded(message)?,
        })
    }

    /// Well-known error code, if the numeric code is one
    pub fn severity(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.error_code)
    }

    /// Render the one-line text log form
    ///
    /// `[<sec>] <LEVEL> <source>(<error_code>): <message>`
    pub fn write_text<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        write!(
            out,
            "[{}] {} {}({}): {}",
            self.time.sec(),
            self.level.as_str(),
            self.source_name,
            self.error_code,
            self.message
        )
    }
}

impl Encode for Event {
    const FORM: WireForm = WireForm::Variable;

    fn encoded_len(&self) -> usize {
        EVENT_HEADER_LEN + prefixed_len(&self.source_name) + prefixed_len(&self.message)
    }

    fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut writer = Writer::new(out);
        writer.put(self.time.sec())?;
        writer.put(self.level.to_byte())?;
        writer.put(self.error_code)?;
        writer.put_str(&self.source_name)?;
        writer.put_str(&self.message)?;
        Ok(writer.finish())
    }
}

impl Decode for Event {
    fn decode(input: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(input);
        Ok(Self {
            time: Timestamp::from_sec(reader.get()?),
            level: LogLevel::from_byte(reader.get()?),
            error_code: reader.get()?,
            source_name: reader.get_str()?,
            message: reader.get_str()?,
        })
    }
}

/// Measurement published by a sensor node
///
/// Layout:
/// ```text
/// [time_sec:4][tag:1][value:8][id][type][datatype][unit]   (strings length-prefixed)
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorReading {
    /// When the measurement was taken
    pub time: Timestamp,
    /// Sensor instance identifier
    pub sensor_id: String<MAX_SENSOR_ID_LEN>,
    /// Sensor model
    pub sensor_type: String<MAX_SENSOR_TYPE_LEN>,
    /// Measured quantity (e.g. "temperature")
    pub data_type: String<MAX_DATA_TYPE_LEN>,
    /// Measured value
    pub reading: TaggedValue,
    /// Unit of the value
    pub unit: String<MAX_UNIT_LEN>,
}

impl SensorReading {
    /// Create a reading, checking string capacities
    pub fn new(
        time: Timestamp,
        sensor_id: &str,
        sensor_type: &str,
        data_type: &str,
        reading: TaggedValue,
        unit: &str,
    ) -> Result<Self, CodecError> {
        Ok(Self {
            time,
            sensor_id: bounded(sensor_id)?,
            sensor_type: bounded(sensor_type)?,
            data_type: bounded(data_type)?,
            reading,
            unit: bounded(unit)?,
        })
    }
}

impl Encode for SensorReading {
    const FORM: WireForm = WireForm::Variable;

    fn encoded_len(&self) -> usize {
        READING_HEADER_LEN
            + prefixed_len(&self.sensor_id)
            + prefixed_len(&self.sensor_type)
            + prefixed_len(&self.data_type)
            + prefixed_len(&self.unit)
    }

    fn encode(&self, out: &mut [u8]) -> Result<usize, CodecError> {
        let mut writer = Writer::new(out);
        writer.put(self.time.sec())?;
        writer.put(self.reading.wire_tag())?;
        writer.put_bytes(&self.reading.to_raw())?;
        writer.put_str(&self.sensor_id)?;
        writer.put_str(&self.sensor_type)?;
        writer.put_str(&self.data_type)?;
        writer.put_str(&self.unit)?;
        Ok(writer.finish())
    }
}

impl Decode for SensorReading {
    fn decode(input: &[u8]) -> Result<Self, CodecError> {
        let mut reader = Reader::new(input);
        let time = Timestamp::from_sec(reader.get()?);
        let tag = reader.get::<u8>()?;
        let reading = TaggedValue::from_raw(tag, reader.take_array()?);
        Ok(Self {
            time,
            sensor_id: reader.get_str()?,
            sensor_type: reader.get_str()?,
            data_type: reader.get_str()?,
            reading,
            unit: reader.get_str()?,
        })
    }
}
