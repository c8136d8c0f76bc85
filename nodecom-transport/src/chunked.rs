//! Chunked transport engine
//!
//! Splits a payload into acknowledged chunks on the sending side and
//! reassembles it on the receiving side. See the crate docs for the
//! exchange diagram.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use nodecom_hal::Link;
use nodecom_protocol::{Decode, Encode, WireForm};

use crate::config::TransportConfig;
use crate::error::TransportError;
use crate::header::{ChunkMetadata, ChunkStatus, METADATA_SIZE};

type Result<T, L> = core::result::Result<T, TransportError<<L as embedded_io::ErrorType>::Error>>;

/// Chunked, acknowledged transfer over any [`Link`]
///
/// The engine owns the delay used for polling but not the link, so one
/// engine can serve several links and a link can be borrowed from a
/// [`SharedLink`](crate::SharedLink) for the duration of one exchange.
pub struct ChunkedTransport<D> {
    delay: D,
    config: TransportConfig,
}

impl<D: DelayNs> ChunkedTransport<D> {
    /// Create an engine
    ///
    /// # Arguments
    /// * `delay` - Sleeps between availability checks
    /// * `config` - Poll interval, status wait and retry limits
    pub fn new(delay: D, config: TransportConfig) -> Self {
        Self { delay, config }
    }

    /// Current settings
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Mutable settings
    pub fn config_mut(&mut self) -> &mut TransportConfig {
        &mut self.config
    }

    /// Give back the delay
    pub fn release(self) -> D {
        self.delay
    }

    /// Poll until at least `count` bytes are queued on `link`
    ///
    /// Returns false if `blocking` is false and the bytes are not already
    /// there, or if `timeout_ms` elapses first (0 = wait forever).
    pub fn wait_available<L: Link>(
        &mut self,
        link: &mut L,
        count: usize,
        blocking: bool,
        timeout_ms: u32,
    ) -> bool {
        let mut waited_ms: u32 = 0;
        while link.available() < count {
            if !blocking || (timeout_ms != 0 && waited_ms >= timeout_ms) {
                return false;
            }
            self.delay.delay_ms(self.config.poll_interval_ms);
            waited_ms = waited_ms.saturating_add(self.config.poll_interval_ms.max(1));
        }
        true
    }

    /// Send `payload`
    ///
    /// With `chunk_size == 0` the payload goes out as one blob and no status
    /// is exchanged. Otherwise the header is sent first and every chunk is
    /// repeated until the receiver acknowledges it.
    pub fn write<L: Link>(&mut self, link: &mut L, payload: &[u8], chunk_size: u16) -> Result<(), L> {
        if chunk_size == 0 {
            trace!("unchunked write of {} bytes", payload.len());
            return self.write_blob(link, payload);
        }

        let meta =
            ChunkMetadata::for_payload(payload.len(), chunk_size).ok_or(TransportError::PayloadTooLarge)?;
        let mut raw = [0u8; METADATA_SIZE];
        let len = meta.encode(&mut raw)?;
        self.write_blob(link, &raw[..len])?;
        debug!(
            "header sent: {} bytes in {} chunks of {}",
            meta.total_bytes,
            meta.num_chunks,
            meta.chunk_size
        );

        match self.read_status(link)? {
            ChunkStatus::Ok => {}
            ChunkStatus::NotReady => warn!("receiver reported a header size mismatch"),
            ChunkStatus::Rejected => {
                warn!("receiver rejected chunk size {}", chunk_size);
                return Err(TransportError::Rejected);
            }
        }

        let mut index: u16 = 0;
        let mut retries: u16 = 0;
        while index < meta.num_chunks {
            self.write_blob(link, &payload[meta.chunk_range(index)])?;
            let status = self.read_status(link)?;
            trace!("chunk {}/{} status {}", index, meta.num_chunks, status.to_byte());

            if status.is_ok() {
                index += 1;
                retries = 0;
                continue;
            }

            retries = retries.saturating_add(1);
            if !self.config.allows_retry(retries) {
                warn!("chunk {} not acknowledged after {} resends", index, retries - 1);
                return Err(TransportError::RetriesExhausted { chunk: index });
            }
            warn!("resending chunk {}", index);
        }

        Ok(())
    }

    /// Receive a payload
    ///
    /// With `chunk_size == 0` exactly `expected_len` raw bytes are read.
    /// Otherwise a header is expected and `chunk_size` is the largest chunk
    /// this side accepts; `expected_len` is ignored.
    pub fn read<L: Link, const N: usize>(
        &mut self,
        link: &mut L,
        chunk_size: u16,
        expected_len: usize,
        timeout_ms: u32,
    ) -> Result<Vec<u8, N>, L> {
        if chunk_size == 0 {
            self.read_unchunked(link, expected_len, timeout_ms)
        } else {
            self.read_chunked(link, chunk_size, timeout_ms)
        }
    }

    /// Read exactly `len` raw bytes
    ///
    /// Nothing is consumed if they do not all arrive within `timeout_ms`.
    pub fn read_unchunked<L: Link, const N: usize>(
        &mut self,
        link: &mut L,
        len: usize,
        timeout_ms: u32,
    ) -> Result<Vec<u8, N>, L> {
        let mut out = Vec::new();
        out.resize_default(len).map_err(|_| TransportError::PayloadTooLarge)?;
        if !self.wait_available(link, len, true, timeout_ms) {
            return Err(TransportError::Timeout);
        }
        let got = fill(link, &mut out)?;
        out.truncate(got);
        Ok(out)
    }

    /// Read a header and the chunks it announces
    ///
    /// # Arguments
    /// * `max_chunk` - Largest chunk size this receiver accepts
    /// * `timeout_ms` - Bound on the header wait and on each chunk wait
    pub fn read_chunked<L: Link, const N: usize>(
        &mut self,
        link: &mut L,
        max_chunk: u16,
        timeout_ms: u32,
    ) -> Result<Vec<u8, N>, L> {
        if !self.wait_available(link, METADATA_SIZE, true, timeout_ms) {
            return Err(TransportError::Timeout);
        }

        let queued = link.available();
        let mut raw = [0u8; METADATA_SIZE];
        fill(link, &mut raw)?;
        let meta = ChunkMetadata::decode(&raw)?;
        debug!(
            "header received: {} bytes in {} chunks of {}",
            meta.total_bytes,
            meta.num_chunks,
            meta.chunk_size
        );

        let refusal = if !meta.is_consistent() {
            Some(TransportError::InvalidHeader)
        } else if meta.chunk_size > max_chunk {
            Some(TransportError::Rejected)
        } else if meta.total_len() > N {
            Some(TransportError::PayloadTooLarge)
        } else {
            None
        };
        if let Some(err) = refusal {
            warn!("refusing header, chunk size {} max {}", meta.chunk_size, max_chunk);
            self.write_status(link, ChunkStatus::Rejected)?;
            return Err(err);
        }

        if queued != METADATA_SIZE {
            warn!("{} bytes queued at header, expected {}", queued, METADATA_SIZE);
            self.write_status(link, ChunkStatus::NotReady)?;
        } else {
            self.write_status(link, ChunkStatus::Ok)?;
        }

        let mut out = Vec::new();
        out.resize_default(meta.total_len())
            .map_err(|_| TransportError::PayloadTooLarge)?;

        let mut index: u16 = 0;
        let mut retries: u16 = 0;
        while index < meta.num_chunks {
            let range = meta.chunk_range(index);
            let status = if self.wait_available(link, range.len(), true, timeout_ms) {
                ChunkStatus::Ok
            } else {
                ChunkStatus::NotReady
            };
            // Keep whatever arrived even on timeout; the resend overwrites it.
            fill(link, &mut out[range])?;
            self.write_status(link, status)?;
            trace!("chunk {}/{} status {}", index, meta.num_chunks, status.to_byte());

            if status.is_ok() {
                index += 1;
                retries = 0;
                continue;
            }

            retries = retries.saturating_add(1);
            if !self.config.allows_retry(retries) {
                warn!("chunk {} never arrived complete", index);
                return Err(TransportError::RetriesExhausted { chunk: index });
            }
        }

        Ok(out)
    }

    /// Encode and send a message
    ///
    /// Fixed-size messages always go unchunked regardless of `chunk_size`.
    pub fn write_message<L: Link, M: Encode, const N: usize>(
        &mut self,
        link: &mut L,
        message: &M,
        chunk_size: u16,
    ) -> Result<(), L> {
        let encoded: Vec<u8, N> = message.encode_to_vec()?;
        let chunk_size = match M::FORM {
            WireForm::Fixed(_) => 0,
            WireForm::Variable => chunk_size,
        };
        self.write(link, &encoded, chunk_size)
    }

    /// Receive and decode a message
    ///
    /// Fixed-size messages are read unchunked with their own size; others
    /// are read chunked with `chunk_size` as the largest accepted chunk.
    pub fn read_message<L: Link, M: Encode + Decode, const N: usize>(
        &mut self,
        link: &mut L,
        chunk_size: u16,
        timeout_ms: u32,
    ) -> Result<M, L> {
        let bytes: Vec<u8, N> = match M::FORM {
            WireForm::Fixed(size) => self.read_unchunked(link, size, timeout_ms)?,
            WireForm::Variable => self.read_chunked(link, chunk_size, timeout_ms)?,
        };
        Ok(M::decode(&bytes)?)
    }

    fn write_blob<L: Link>(&mut self, link: &mut L, data: &[u8]) -> Result<(), L> {
        let timeout_ms = self.config.write_timeout_ms;
        let mut waited_ms: u32 = 0;
        while !link.available_for_write() {
            if timeout_ms != 0 && waited_ms >= timeout_ms {
                return Err(TransportError::WriteTimeout);
            }
            self.delay.delay_ms(self.config.poll_interval_ms);
            waited_ms = waited_ms.saturating_add(self.config.poll_interval_ms.max(1));
        }
        link.write(data).map_err(TransportError::Link)?;
        link.flush().map_err(TransportError::Link)
    }

    fn read_status<L: Link>(&mut self, link: &mut L) -> Result<ChunkStatus, L> {
        if !self.wait_available(link, 1, true, self.config.status_timeout_ms) {
            return Ok(ChunkStatus::NotReady);
        }
        match link.read_byte().map_err(TransportError::Link)? {
            Some(byte) => Ok(ChunkStatus::from_byte(byte)),
            None => Ok(ChunkStatus::NotReady),
        }
    }

    fn write_status<L: Link>(&mut self, link: &mut L, status: ChunkStatus) -> Result<(), L> {
        self.write_blob(link, &[status.to_byte()])
    }
}

/// Copy queued bytes into `buf` until it is full or the link runs dry
fn fill<L: Link>(link: &mut L, buf: &mut [u8]) -> Result<usize, L> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = link.read(&mut buf[filled..]).map_err(TransportError::Link)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
