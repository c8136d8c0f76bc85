//! Shared access to one physical link
//!
//! A node usually has a single bus peripheral that both the main loop and
//! the bus event dispatch want to use. [`SharedLink`] keeps the link behind
//! a blocking mutex so each exchange runs with exclusive access.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Link guarded by a blocking mutex
///
/// Pick `M` to match the execution context: `CriticalSectionRawMutex` when
/// an interrupt handler shares the link, `NoopRawMutex` when everything runs
/// in one thread of control.
pub struct SharedLink<M: RawMutex, L> {
    inner: Mutex<M, RefCell<L>>,
}

impl<M: RawMutex, L> SharedLink<M, L> {
    /// Wrap a link
    pub const fn new(raw: M, link: L) -> Self {
        Self {
            inner: Mutex::const_new(raw, RefCell::new(link)),
        }
    }

    /// Run `f` with exclusive access to the link
    ///
    /// Returns `None` if the link is already borrowed further up the call
    /// stack, for example when a bus callback fires in the middle of an
    /// exchange started by the main loop.
    pub fn try_with<R>(&self, f: impl FnOnce(&mut L) -> R) -> Option<R> {
        self.inner.lock(|cell| {
            let mut link = cell.try_borrow_mut().ok()?;
            Some(f(&mut link))
        })
    }

    /// Whether an exchange is currently in progress
    pub fn is_busy(&self) -> bool {
        self.inner.lock(|cell| cell.try_borrow_mut().is_err())
    }

    /// Consume the wrapper and give back the link
    pub fn into_inner(self) -> L {
        self.inner.into_inner().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunked::ChunkedTransport;
    use crate::config::TransportConfig;
    use crate::mock::{NoDelay, ScriptedLink};
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use nodecom_hal::Link;

    #[test]
    fn test_exchange_under_lock() {
        let shared = SharedLink::new(NoopRawMutex::new(), ScriptedLink::new().reply(&[0]).reply(&[0]));
        let mut transport = ChunkedTransport::new(NoDelay::default(), TransportConfig::default());

        let result = shared.try_with(|link| transport.write(link, &[1, 2, 3], 8));
        assert_eq!(result, Some(Ok(())));
        assert!(!shared.is_busy());

        let link = shared.into_inner();
        assert_eq!(link.frames().len(), 2);
    }

    #[test]
    fn test_nested_access_is_refused() {
        let shared = SharedLink::new(NoopRawMutex::new(), ScriptedLink::with_input(&[1]));

        let nested = shared.try_with(|link| {
            assert_eq!(link.available(), 1);
            assert!(shared.is_busy());
            shared.try_with(|inner| inner.available())
        });
        assert_eq!(nested, Some(None));
    }
}
