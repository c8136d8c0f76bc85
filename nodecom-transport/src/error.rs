//! Transport errors

use embedded_io::ErrorKind;
use nodecom_protocol::CodecError;

/// Errors returned by the chunked transport and its bindings
///
/// `E` is the error type of the underlying link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError<E> {
    /// The link itself failed
    Link(E),
    /// Payload could not be encoded or decoded
    Codec(CodecError),
    /// Expected bytes did not arrive within the timeout
    Timeout,
    /// Link never became ready for writing within the write timeout
    WriteTimeout,
    /// Receiver refused the header (chunk size above its capacity)
    Rejected,
    /// Header is internally inconsistent
    InvalidHeader,
    /// Payload does not fit the header fields or the destination buffer
    PayloadTooLarge,
    /// Bus address is reserved or outside the 7-bit range
    InvalidAddress(u8),
    /// One chunk was retried more often than allowed
    RetriesExhausted {
        /// Index of the chunk that kept failing
        chunk: u16,
    },
}

impl<E> From<CodecError> for TransportError<E> {
    fn from(err: CodecError) -> Self {
        TransportError::Codec(err)
    }
}

impl<E: embedded_io::Error> TransportError<E> {
    /// Closest generic I/O error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::Link(err) => err.kind(),
            TransportError::Codec(_) | TransportError::InvalidHeader => ErrorKind::InvalidData,
            TransportError::Timeout | TransportError::WriteTimeout => ErrorKind::TimedOut,
            TransportError::Rejected | TransportError::InvalidAddress(_) => ErrorKind::InvalidInput,
            TransportError::PayloadTooLarge => ErrorKind::OutOfMemory,
            TransportError::RetriesExhausted { .. } => ErrorKind::Other,
        }
    }

    /// Returns true for failures that may succeed if the call is repeated
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout
                | TransportError::WriteTimeout
                | TransportError::RetriesExhausted { .. }
        )
    }
}
