//! Bus callback registry
//!
//! A slave answers two kinds of bus events: the master asking for data
//! ([`Role::Reply`]) and the master sending data ([`Role::Subscriber`]).
//! Each role holds at most one handler, borrowed for the registry's
//! lifetime. Handlers are typed by the message they produce or consume; the
//! registry stores them behind object-safe adapters so one slave can serve
//! any message type.

use core::marker::PhantomData;

use nodecom_protocol::{CodecError, Decode, Encode, WireForm};

/// Registry slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Called when the master requests data
    Reply,
    /// Called when the master sends data
    Subscriber,
}

/// Produces the message sent back when the master requests data
pub trait ReplyHandler {
    /// Message type this handler fills in
    type Message: Encode + Default;

    /// Fill in `message` before it is encoded and sent
    fn on_request(&mut self, message: &mut Self::Message);
}

/// Consumes messages the master sends
pub trait SubscribeHandler {
    /// Message type this handler expects
    type Message: Decode;

    /// Handle one decoded message
    ///
    /// `bytes` is the number of bytes the bus reported for the transfer.
    fn on_receive(&mut self, message: Self::Message, bytes: usize);
}

/// Type-erased reply handler
pub trait ErasedReply {
    /// Encode a fresh reply into `out`
    ///
    /// Returns the encoded length and the message's wire form.
    fn serve(&mut self, out: &mut [u8]) -> Result<(usize, WireForm), CodecError>;
}

impl<H: ReplyHandler> ErasedReply for H {
    fn serve(&mut self, out: &mut [u8]) -> Result<(usize, WireForm), CodecError> {
        let mut message = H::Message::default();
        self.on_request(&mut message);
        let len = message.encode(out)?;
        Ok((len, H::Message::FORM))
    }
}

/// Type-erased subscribe handler
pub trait ErasedSubscribe {
    /// Decode `input` and pass it on
    fn deliver(&mut self, input: &[u8], bytes: usize) -> Result<(), CodecError>;
}

impl<H: SubscribeHandler> ErasedSubscribe for H {
    fn deliver(&mut self, input: &[u8], bytes: usize) -> Result<(), CodecError> {
        let message = H::Message::decode(input)?;
        self.on_receive(message, bytes);
        Ok(())
    }
}

/// Closure adapter for [`ReplyHandler`]
pub struct ReplyFn<M, F> {
    f: F,
    _message: PhantomData<fn() -> M>,
}

impl<M, F> ReplyFn<M, F>
where
    M: Encode + Default,
    F: FnMut(&mut M),
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _message: PhantomData,
        }
    }
}

impl<M, F> ReplyHandler for ReplyFn<M, F>
where
    M: Encode + Default,
    F: FnMut(&mut M),
{
    type Message = M;

    fn on_request(&mut self, message: &mut M) {
        (self.f)(message)
    }
}

/// Closure adapter for [`SubscribeHandler`]
pub struct SubscribeFn<M, F> {
    f: F,
    _message: PhantomData<fn(M)>,
}

impl<M, F> SubscribeFn<M, F>
where
    M: Decode,
    F: FnMut(M, usize),
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _message: PhantomData,
        }
    }
}

impl<M, F> SubscribeHandler for SubscribeFn<M, F>
where
    M: Decode,
    F: FnMut(M, usize),
{
    type Message = M;

    fn on_receive(&mut self, message: M, bytes: usize) {
        (self.f)(message, bytes)
    }
}

/// Handlers registered on one binding, keyed by [`Role`]
#[derive(Default)]
pub struct HandlerRegistry<'h> {
    reply: Option<&'h mut dyn ErasedReply>,
    subscriber: Option<&'h mut dyn ErasedSubscribe>,
}

impl<'h> HandlerRegistry<'h> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the reply handler, replacing any previous one
    pub fn register_reply(&mut self, handler: &'h mut dyn ErasedReply) {
        self.reply = Some(handler);
    }

    /// Install the subscriber, replacing any previous one
    pub fn register_subscriber(&mut self, handler: &'h mut dyn ErasedSubscribe) {
        self.subscriber = Some(handler);
    }

    /// Remove the handler for `role`
    ///
    /// Returns true if one was registered.
    pub fn unregister(&mut self, role: Role) -> bool {
        match role {
            Role::Reply => self.reply.take().is_some(),
            Role::Subscriber => self.subscriber.take().is_some(),
        }
    }

    /// Whether a handler is installed for `role`
    pub fn is_registered(&self, role: Role) -> bool {
        match role {
            Role::Reply => self.reply.is_some(),
            Role::Subscriber => self.subscriber.is_some(),
        }
    }

    /// Run the reply handler
    ///
    /// Returns `None` if no reply handler is registered.
    pub fn dispatch_request(&mut self, out: &mut [u8]) -> Option<Result<(usize, WireForm), CodecError>> {
        self.reply.as_mut().map(|handler| handler.serve(out))
    }

    /// Run the subscriber
    ///
    /// Returns `None` if no subscriber is registered.
    pub fn dispatch_receive(&mut self, input: &[u8], bytes: usize) -> Option<Result<(), CodecError>> {
        self.subscriber
            .as_mut()
            .map(|handler| handler.deliver(input, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        next: u16,
    }

    impl ReplyHandler for Counter {
        type Message = u16;

        fn on_request(&mut self, message: &mut u16) {
            *message = self.next;
            self.next += 1;
        }
    }

    #[test]
    fn test_reply_dispatch() {
        let mut counter = Counter { next: 7 };
        let mut registry = HandlerRegistry::new();
        assert!(registry.dispatch_request(&mut [0u8; 4]).is_none());

        registry.register_reply(&mut counter);
        assert!(registry.is_registered(Role::Reply));
        assert!(!registry.is_registered(Role::Subscriber));

        let mut out = [0u8; 4];
        assert_eq!(
            registry.dispatch_request(&mut out),
            Some(Ok((2, WireForm::Fixed(2))))
        );
        assert_eq!(&out[..2], &[7, 0]);
        registry.dispatch_request(&mut out);
        assert_eq!(&out[..2], &[8, 0]);

        assert!(registry.unregister(Role::Reply));
        assert!(!registry.unregister(Role::Reply));
        drop(registry);
        assert_eq!(counter.next, 9);
    }

    #[test]
    fn test_subscriber_dispatch() {
        let mut seen = None;
        let mut handler = SubscribeFn::new(|value: i32, bytes| seen = Some((value, bytes)));
        let mut registry = HandlerRegistry::new();
        registry.register_subscriber(&mut handler);

        assert_eq!(
            registry.dispatch_receive(&(-3i32).to_le_bytes(), 4),
            Some(Ok(()))
        );
        assert_eq!(
            registry.dispatch_receive(&[1, 2], 2),
            Some(Err(CodecError::UnexpectedEnd))
        );
        drop(registry);
        drop(handler);
        assert_eq!(seen, Some((-3, 4)));
    }

    #[test]
    fn test_register_replaces() {
        let mut first = ReplyFn::new(|m: &mut u8| *m = 1);
        let mut second = ReplyFn::new(|m: &mut u8| *m = 2);
        let mut registry = HandlerRegistry::new();
        registry.register_reply(&mut first);
        registry.register_reply(&mut second);

        let mut out = [0u8; 1];
        registry.dispatch_request(&mut out);
        assert_eq!(out, [2]);
    }
}
