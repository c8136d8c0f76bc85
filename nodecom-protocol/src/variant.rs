//! Tagged value holding one of a closed set of reading types
//!
//! A sensor reading or actuator command is either a 64-bit float or a
//! 32-bit integer. [`TaggedValue`] stores exactly one of them (or nothing)
//! and exposes typed access through the [`Alternative`] trait, so callers
//! ask for `get_if::<f64>()` instead of matching on tags by hand.
//!
//! Alternatives are ordered: `f64` is alternative 0, `i32` is alternative 1.
//! The order matters for [`TaggedValue::construct`], which picks the first
//! alternative that can be built from its argument.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of alternatives a [`TaggedValue`] can hold
pub const ALTERNATIVE_COUNT: usize = 2;

/// Wire tag of an empty value
pub const TAG_EMPTY: u8 = 0;

/// Wire tag of a float value
pub const TAG_FLOAT: u8 = 1;

/// Wire tag of an integer value
pub const TAG_INT: u8 = 2;

/// Size of the raw value slot on the wire
pub const RAW_VALUE_SIZE: usize = 8;

/// One of `f64` or `i32`, or nothing
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TaggedValue {
    /// No alternative is held
    #[default]
    Empty,
    /// Alternative 0
    Float(f64),
    /// Alternative 1
    Int(i32),
}

/// A type that can be held by a [`TaggedValue`]
pub trait Alternative: Copy + private::Sealed {
    /// Position of this type in the alternative list
    const INDEX: usize;

    /// Wrap a value of this type
    fn wrap(self) -> TaggedValue;

    /// Borrow the held value if it is of this type
    fn peek(value: &TaggedValue) -> Option<&Self>;

    /// Mutably borrow the held value if it is of this type
    fn peek_mut(value: &mut TaggedValue) -> Option<&mut Self>;
}

impl Alternative for f64 {
    const INDEX: usize = 0;

    fn wrap(self) -> TaggedValue {
        TaggedValue::Float(self)
    }

    fn peek(value: &TaggedValue) -> Option<&Self> {
        match value {
            TaggedValue::Float(v) => Some(v),
            _ => None,
        }
    }

    fn peek_mut(value: &mut TaggedValue) -> Option<&mut Self> {
        match value {
            TaggedValue::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl Alternative for i32 {
    const INDEX: usize = 1;

    fn wrap(self) -> TaggedValue {
        TaggedValue::Int(self)
    }

    fn peek(value: &TaggedValue) -> Option<&Self> {
        match value {
            TaggedValue::Int(v) => Some(v),
            _ => None,
        }
    }

    fn peek_mut(value: &mut TaggedValue) -> Option<&mut Self> {
        match value {
            TaggedValue::Int(v) => Some(v),
            _ => None,
        }
    }
}

mod private {
    pub trait Sealed {}
    impl Sealed for f64 {}
    impl Sealed for i32 {}
}

/// Argument types accepted by [`TaggedValue::construct`]
///
/// Each implementation resolves, at compile time, to the first alternative
/// (in declaration order) that can be built from the argument. Every type
/// listed here converts losslessly to `f64`, so they all select
/// [`TaggedValue::Float`], even `i32`. Use `TaggedValue::from(x)` for an
/// exact-type match.
pub trait FirstMatch {
    /// Build a value holding the first matching alternative
    fn first_match(self) -> TaggedValue;
}

macro_rules! first_match {
    ($variant:ident <= $($ty:ty),* $(,)?) => {
        $(
            impl FirstMatch for $ty {
                fn first_match(self) -> TaggedValue {
                    TaggedValue::$variant(self.into())
                }
            }
        )*
    };
}

first_match!(Float <= u8, i8, u16, i16, u32, i32, f32, f64);

/// Raw-slot decoders indexed by alternative index
const DECODERS: [fn([u8; RAW_VALUE_SIZE]) -> TaggedValue; ALTERNATIVE_COUNT] =
    [decode_float, decode_int];

fn decode_float(raw: [u8; RAW_VALUE_SIZE]) -> TaggedValue {
    TaggedValue::Float(f64::from_le_bytes(raw))
}

fn decode_int(raw: [u8; RAW_VALUE_SIZE]) -> TaggedValue {
    TaggedValue::Int(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

impl TaggedValue {
    /// Create an empty value
    pub const fn new() -> Self {
        TaggedValue::Empty
    }

    /// Construct from the first alternative buildable from `arg`
    pub fn construct<A: FirstMatch>(arg: A) -> Self {
        arg.first_match()
    }

    /// Index of the held alternative, or `None` if empty
    pub fn index(&self) -> Option<usize> {
        match self {
            TaggedValue::Empty => None,
            TaggedValue::Float(_) => Some(f64::INDEX),
            TaggedValue::Int(_) => Some(i32::INDEX),
        }
    }

    /// Returns true if no alternative is held
    pub fn is_empty(&self) -> bool {
        matches!(self, TaggedValue::Empty)
    }

    /// Returns true if the held alternative is `T`
    pub fn holds_alternative<T: Alternative>(&self) -> bool {
        self.index() == Some(T::INDEX)
    }

    /// Borrow the held value as `T`, or `None` if another alternative is held
    pub fn get_if<T: Alternative>(&self) -> Option<&T> {
        T::peek(self)
    }

    /// Mutably borrow the held value as `T`
    pub fn get_if_mut<T: Alternative>(&mut self) -> Option<&mut T> {
        T::peek_mut(self)
    }

    /// Replace whatever is held with `value`
    pub fn emplace<T: Alternative>(&mut self, value: T) {
        *self = value.wrap();
    }

    /// Move the held value out, leaving this one empty
    pub fn take(&mut self) -> Self {
        core::mem::take(self)
    }

    /// Numeric view of the held value, if any
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            TaggedValue::Empty => None,
            TaggedValue::Float(v) => Some(v),
            TaggedValue::Int(v) => Some(v.into()),
        }
    }

    /// Wire tag (`0` empty, `1` float, `2` integer)
    pub fn wire_tag(&self) -> u8 {
        match self {
            TaggedValue::Empty => TAG_EMPTY,
            TaggedValue::Float(_) => TAG_FLOAT,
            TaggedValue::Int(_) => TAG_INT,
        }
    }

    /// Raw 8-byte value slot
    ///
    /// Integers occupy the first four bytes; the rest is zero.
    pub fn to_raw(&self) -> [u8; RAW_VALUE_SIZE] {
        let mut raw = [0u8; RAW_VALUE_SIZE];
        match self {
            TaggedValue::Empty => {}
            TaggedValue::Float(v) => raw = v.to_le_bytes(),
            TaggedValue::Int(v) => raw[..4].copy_from_slice(&v.to_le_bytes()),
        }
        raw
    }

    /// Rebuild a value from its wire tag and raw slot
    ///
    /// Unknown tags yield [`TaggedValue::Empty`].
    pub fn from_raw(tag: u8, raw: [u8; RAW_VALUE_SIZE]) -> Self {
        tag.checked_sub(1)
            .and_then(|index| DECODERS.get(index as usize))
            .map_or(TaggedValue::Empty, |decode| decode(raw))
    }
}

impl From<f64> for TaggedValue {
    fn from(value: f64) -> Self {
        TaggedValue::Float(value)
    }
}

impl From<i32> for TaggedValue {
    fn from(value: i32) -> Self {
        TaggedValue::Int(value)
    }
}
