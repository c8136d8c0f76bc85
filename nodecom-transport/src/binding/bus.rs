//! Two-wire bus binding
//!
//! The master publishes messages to addressed slaves and requests replies
//! from them. A slave registers a reply handler and a subscriber; the board's
//! bus event dispatch calls [`BusSlave::on_request`] and
//! [`BusSlave::on_receive`] when the master asks for or sends data.

use embedded_hal::delay::DelayNs;
use heapless::Vec;
use nodecom_hal::bus::is_valid_address;
use nodecom_hal::{BusStatus, TwoWireMaster, TwoWireSlave};
use nodecom_protocol::{Decode, Encode, Scalar, WireForm};

use crate::binding::registry::{ErasedReply, ErasedSubscribe, HandlerRegistry, Role};
use crate::chunked::ChunkedTransport;
use crate::config::BusConfig;
use crate::error::TransportError;

/// Size of the bus peripheral's transmit and receive buffers
pub const BUS_BUFFER_SIZE: usize = 32;

/// Bus master
///
/// `N` bounds the size of one encoded message.
pub struct BusMaster<B, D, const N: usize = BUS_BUFFER_SIZE> {
    bus: B,
    transport: ChunkedTransport<D>,
    config: BusConfig,
    joined: bool,
}

impl<B: TwoWireMaster, D: DelayNs, const N: usize> BusMaster<B, D, N> {
    pub fn new(bus: B, transport: ChunkedTransport<D>, config: BusConfig) -> Self {
        Self {
            bus,
            transport,
            config,
            joined: false,
        }
    }

    /// Join the bus as master
    ///
    /// Only the first call touches the peripheral.
    pub fn init(&mut self) -> bool {
        if !self.joined {
            self.bus.join_master(&self.config.i2c);
            self.joined = true;
            debug!("joined bus as master");
        }
        self.joined
    }

    /// Send `message` to the slave at `address`
    ///
    /// Returns the bus completion code of the transaction. The transaction is
    /// closed even when the message could not be written.
    pub fn publish<M: Encode>(
        &mut self,
        address: u8,
        message: &M,
    ) -> Result<BusStatus, TransportError<B::Error>> {
        check_address(address)?;
        self.init();
        self.bus.set_timeout(self.config.timeout_ms);
        self.bus.begin_transmission(address);
        let written = self
            .transport
            .write_message::<_, M, N>(&mut self.bus, message, self.config.chunk_size);
        let status = self.bus.end_transmission();
        written?;
        if !status.is_success() {
            warn!("publish to {=u8:#x} failed: {}", address, status.code());
        }
        Ok(status)
    }

    /// Request a fixed-size value from the slave at `address`
    pub fn request_from<M: Scalar>(
        &mut self,
        address: u8,
        timeout_ms: u32,
    ) -> Result<M, TransportError<B::Error>> {
        self.request(address, M::SIZE, timeout_ms)?;
        self.transport
            .read_message::<_, M, N>(&mut self.bus, 0, timeout_ms)
    }

    /// Request `quantity` raw bytes from the slave at `address`
    pub fn request_bytes(
        &mut self,
        address: u8,
        quantity: u8,
        timeout_ms: u32,
    ) -> Result<Vec<u8, N>, TransportError<B::Error>> {
        self.request(address, usize::from(quantity), timeout_ms)?;
        self.transport
            .read_unchunked(&mut self.bus, usize::from(quantity), timeout_ms)
    }

    /// Request a self-describing message of `quantity` encoded bytes
    pub fn request_message<M: Decode>(
        &mut self,
        address: u8,
        quantity: u8,
        timeout_ms: u32,
    ) -> Result<M, TransportError<B::Error>> {
        let bytes = self.request_bytes(address, quantity, timeout_ms)?;
        Ok(M::decode(&bytes)?)
    }

    /// Borrow the bus peripheral
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Give back the bus peripheral
    pub fn release(self) -> B {
        self.bus
    }

    fn request(
        &mut self,
        address: u8,
        quantity: usize,
        timeout_ms: u32,
    ) -> Result<(), TransportError<B::Error>> {
        check_address(address)?;
        let quantity = u8::try_from(quantity).map_err(|_| TransportError::PayloadTooLarge)?;
        self.init();
        self.bus.set_timeout(timeout_ms);
        let delivered = self.bus.request_from(address, quantity);
        if delivered < usize::from(quantity) {
            // The receive buffer will not grow after the transaction; don't wait on it.
            warn!("slave {=u8:#x} sent {} of {} bytes", address, delivered, quantity);
            self.bus.drain().map_err(TransportError::Link)?;
            return Err(TransportError::Timeout);
        }
        Ok(())
    }
}

fn check_address<E>(address: u8) -> Result<(), TransportError<E>> {
    if is_valid_address(address) {
        Ok(())
    } else {
        warn!("reserved bus address {=u8:#x}", address);
        Err(TransportError::InvalidAddress(address))
    }
}

/// Bus slave
///
/// Handlers are borrowed for `'h`. `N` bounds the size of one encoded
/// message.
pub struct BusSlave<'h, S, D, const N: usize = BUS_BUFFER_SIZE> {
    bus: S,
    transport: ChunkedTransport<D>,
    config: BusConfig,
    registry: HandlerRegistry<'h>,
    address: Option<u8>,
}

impl<'h, S: TwoWireSlave, D: DelayNs, const N: usize> BusSlave<'h, S, D, N> {
    pub fn new(bus: S, transport: ChunkedTransport<D>, config: BusConfig) -> Self {
        Self {
            bus,
            transport,
            config,
            registry: HandlerRegistry::new(),
            address: None,
        }
    }

    /// Join the bus as a slave answering to `address`
    ///
    /// The first call wins; later calls return whether they asked for the
    /// address already in use. Reserved addresses are refused.
    pub fn init(&mut self, address: u8) -> bool {
        if !is_valid_address(address) {
            return false;
        }
        match self.address {
            Some(current) => current == address,
            None => {
                self.bus.join_slave(address);
                self.address = Some(address);
                debug!("joined bus as slave {=u8:#x}", address);
                true
            }
        }
    }

    /// Address this slave answers to, once joined
    pub fn address(&self) -> Option<u8> {
        self.address
    }

    /// Install the handler called when the master requests data
    pub fn register_reply(&mut self, handler: &'h mut dyn ErasedReply) {
        self.registry.register_reply(handler);
    }

    /// Install the handler called when the master sends data
    pub fn register_subscriber(&mut self, handler: &'h mut dyn ErasedSubscribe) {
        self.registry.register_subscriber(handler);
    }

    /// Remove the handler for `role`
    pub fn unregister(&mut self, role: Role) -> bool {
        self.registry.unregister(role)
    }

    /// Data-requested event
    ///
    /// Builds one reply through the reply handler and writes it to the bus.
    /// Returns false if no reply handler is registered.
    pub fn on_request(&mut self) -> Result<bool, TransportError<S::Error>> {
        let mut out = [0u8; N];
        let (len, form) = match self.registry.dispatch_request(&mut out) {
            Some(result) => result?,
            None => return Ok(false),
        };
        let chunk_size = match form {
            WireForm::Fixed(_) => 0,
            WireForm::Variable => self.config.chunk_size,
        };
        self.transport.write(&mut self.bus, &out[..len], chunk_size)?;
        Ok(true)
    }

    /// Data-received event
    ///
    /// Reads the `bytes` the master sent and hands them to the subscriber.
    /// Returns false if nothing was queued or no subscriber is registered;
    /// the queued bytes are discarded in the latter case.
    pub fn on_receive(&mut self, bytes: usize) -> Result<bool, TransportError<S::Error>> {
        let queued = self.bus.available();
        if queued == 0 {
            return Ok(false);
        }
        if !self.registry.is_registered(Role::Subscriber) {
            self.bus.drain().map_err(TransportError::Link)?;
            return Ok(false);
        }

        let data: Vec<u8, N> = self.transport.read(
            &mut self.bus,
            self.config.chunk_size,
            bytes.min(queued),
            self.config.timeout_ms,
        )?;
        match self.registry.dispatch_receive(&data, bytes) {
            Some(result) => result?,
            None => return Ok(false),
        }
        Ok(true)
    }

    /// Borrow the bus peripheral
    pub fn bus_mut(&mut self) -> &mut S {
        &mut self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use crate::mock::{NoDelay, ScriptedLink};
    use crate::{ReplyFn, SubscribeFn};
    use nodecom_hal::{I2cConfig, Link};
    use nodecom_protocol::CodecError;

    fn transport() -> ChunkedTransport<NoDelay> {
        ChunkedTransport::new(NoDelay::default(), TransportConfig::default())
    }

    fn master(bus: ScriptedLink) -> BusMaster<ScriptedLink, NoDelay> {
        BusMaster::new(bus, transport(), BusConfig::default())
    }

    #[test]
    fn test_publish_scalar() {
        let mut master = master(ScriptedLink::new());

        assert_eq!(master.publish(0x42, &1234u16), Ok(BusStatus::Success));

        let bus = master.release();
        assert_eq!(bus.master_joined, 1);
        assert_eq!(bus.i2c, Some(I2cConfig::STANDARD));
        assert_eq!(bus.addressed, Some(0x42));
        assert_eq!(bus.ended, 1);
        assert_eq!(bus.frames(), [[0xD2, 0x04]]);
    }

    #[test]
    fn test_publish_reports_bus_status() {
        let mut bus = ScriptedLink::new();
        bus.end_status = Some(BusStatus::AddressNack);
        let mut master = master(bus);

        assert_eq!(master.publish(0x10, &1u8), Ok(BusStatus::AddressNack));
        assert_eq!(master.publish(0x10, &2u8), Ok(BusStatus::AddressNack));
        assert_eq!(master.release().master_joined, 1);
    }

    #[test]
    fn test_failed_write_still_ends_transaction() {
        let mut master: BusMaster<ScriptedLink, NoDelay, 4> =
            BusMaster::new(ScriptedLink::new(), transport(), BusConfig::default());

        assert_eq!(
            master.publish(0x42, &1u64),
            Err(TransportError::Codec(CodecError::BufferTooSmall))
        );

        let bus = master.release();
        assert_eq!(bus.addressed, Some(0x42));
        assert_eq!(bus.ended, 1);
        assert!(bus.frames().is_empty());
    }

    #[test]
    fn test_master_refuses_reserved_addresses() {
        let mut master = master(ScriptedLink::new().reply(&[1]));

        assert_eq!(master.publish(0x03, &1u8), Err(TransportError::InvalidAddress(0x03)));
        assert_eq!(
            master.request_from::<u8>(0x7F, 10),
            Err(TransportError::InvalidAddress(0x7F))
        );

        let bus = master.release();
        assert_eq!(bus.master_joined, 0);
        assert_eq!(bus.addressed, None);
        assert_eq!(bus.requested, None);
        assert_eq!(bus.ended, 0);
        assert_eq!(bus.unreleased(), 1);
    }

    #[test]
    fn test_master_joins_with_configured_clock() {
        let config = BusConfig {
            i2c: I2cConfig::FAST,
            ..BusConfig::default()
        };
        let mut master: BusMaster<ScriptedLink, NoDelay> =
            BusMaster::new(ScriptedLink::new(), transport(), config);

        assert!(master.init());
        assert_eq!(master.release().i2c, Some(I2cConfig::FAST));
    }

    #[test]
    fn test_request_scalar() {
        let bus = ScriptedLink::new().reply(&2.5f32.to_le_bytes());
        let mut master = master(bus);

        let value: f32 = master.request_from(0x20, 50).unwrap();
        assert_eq!(value, 2.5);

        let bus = master.release();
        assert_eq!(bus.requested, Some((0x20, 4)));
        assert_eq!(bus.bus_timeout_ms, Some(50));
    }

    #[test]
    fn test_short_reply_is_timeout() {
        let bus = ScriptedLink::new().reply(&[1, 2]);
        let mut master = master(bus);

        assert_eq!(
            master.request_from::<u32>(0x20, 0),
            Err(TransportError::Timeout)
        );
        assert_eq!(master.bus_mut().available(), 0);
    }

    #[test]
    fn test_request_bytes() {
        let bus = ScriptedLink::new().reply(&[9, 8, 7, 6, 5]);
        let mut master = master(bus);

        let bytes = master.request_bytes(0x30, 3, 10).unwrap();
        assert_eq!(&bytes[..], &[9, 8, 7]);
    }

    #[test]
    fn test_slave_init_is_idempotent() {
        let mut slave: BusSlave<'_, ScriptedLink, NoDelay> =
            BusSlave::new(ScriptedLink::new(), transport(), BusConfig::default());

        assert!(slave.init(0x42));
        assert!(slave.init(0x42));
        assert!(!slave.init(0x43));
        assert_eq!(slave.address(), Some(0x42));
    }

    #[test]
    fn test_slave_refuses_reserved_address() {
        let mut slave: BusSlave<'_, ScriptedLink, NoDelay> =
            BusSlave::new(ScriptedLink::new(), transport(), BusConfig::default());

        assert!(!slave.init(0x02));
        assert_eq!(slave.address(), None);
        assert_eq!(slave.bus_mut().slave_address, None);
    }

    #[test]
    fn test_slave_reply() {
        let mut reply = ReplyFn::new(|m: &mut i32| *m = -2);
        let mut slave: BusSlave<'_, ScriptedLink, NoDelay> =
            BusSlave::new(ScriptedLink::new(), transport(), BusConfig::default());

        assert_eq!(slave.on_request(), Ok(false));
        slave.register_reply(&mut reply);
        assert_eq!(slave.on_request(), Ok(true));
        assert_eq!(slave.bus_mut().frames(), [(-2i32).to_le_bytes()]);
    }

    #[test]
    fn test_slave_subscriber() {
        let mut received = None;
        let mut subscriber = SubscribeFn::new(|m: u16, bytes| received = Some((m, bytes)));
        {
            let mut slave: BusSlave<'_, ScriptedLink, NoDelay> =
                BusSlave::new(ScriptedLink::new(), transport(), BusConfig::default());
            slave.register_subscriber(&mut subscriber);

            assert_eq!(slave.on_receive(2), Ok(false));
            slave.bus_mut().inject(&[0x34, 0x12]);
            assert_eq!(slave.on_receive(2), Ok(true));
        }
        drop(subscriber);
        assert_eq!(received, Some((0x1234, 2)));
    }

    #[test]
    fn test_slave_without_subscriber_drains() {
        let mut slave: BusSlave<'_, ScriptedLink, NoDelay> =
            BusSlave::new(ScriptedLink::new(), transport(), BusConfig::default());
        slave.bus_mut().inject(&[1, 2, 3]);

        assert_eq!(slave.on_receive(3), Ok(false));
        assert_eq!(slave.bus_mut().available(), 0);
    }
}
