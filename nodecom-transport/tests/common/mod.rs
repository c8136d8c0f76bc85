//! Host-side links and delays shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_io::ErrorKind;
use nodecom_hal::link::{ErrorType, Link, SerialLink, UartConfig};
use nodecom_transport::{ChunkedTransport, TransportConfig};

type Queue = Arc<Mutex<VecDeque<u8>>>;

/// One end of an in-memory full-duplex link
pub struct LoopbackLink {
    rx: Queue,
    tx: Queue,
}

/// Two connected ends: whatever one writes, the other reads
pub fn pair() -> (LoopbackLink, LoopbackLink) {
    let a: Queue = Arc::default();
    let b: Queue = Arc::default();
    (
        LoopbackLink {
            rx: a.clone(),
            tx: b.clone(),
        },
        LoopbackLink { rx: b, tx: a },
    )
}

impl ErrorType for LoopbackLink {
    type Error = ErrorKind;
}

impl Link for LoopbackLink {
    fn available(&mut self) -> usize {
        self.rx.lock().unwrap().len()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        let mut rx = self.rx.lock().unwrap();
        let n = buf.len().min(rx.len());
        for (slot, byte) in buf.iter_mut().zip(rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), ErrorKind> {
        self.tx.lock().unwrap().extend(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ErrorKind> {
        Ok(())
    }
}

impl SerialLink for LoopbackLink {
    fn begin(&mut self, _config: &UartConfig) -> Result<(), ErrorKind> {
        Ok(())
    }
}

/// Delay backed by the OS scheduler
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// Engine tuned for tests: 1 ms polls and a generous status wait
pub fn transport() -> ChunkedTransport<StdDelay> {
    let config = TransportConfig {
        poll_interval_ms: 1,
        status_timeout_ms: 2000,
        ..TransportConfig::default()
    };
    ChunkedTransport::new(StdDelay, config)
}
