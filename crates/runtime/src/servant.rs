//! Servant-side dispatch for generated interfaces
//!
//! A request message opens with a one-byte method id. The generated code
//! for an interface produces a [`Skeleton`]: one [`MethodStub`] per method
//! id across the whole inheritance chain, carrying the codec entry points
//! the servant needs. [`Servant::call`] reads the prefix, decodes the
//! in-arguments through the stub, and hands them to the single dispatch
//! callback. Anything that goes wrong before dispatch is answered with the
//! canonical one-byte error reply `[0x01]`.
//!
//! Dispatch is synchronous: `call` returns once the callback has either
//! replied through [`Servant::send_return`] or declined. An implementation
//! that wants to reply later keeps the replier it was handed.

use crate::msg::Msg;
use crate::segment::DecodeError;
use std::any::Any;

/// Prefix byte of a successful reply.
pub const REPLY_OK_PREFIX: u8 = 0;
/// Prefix byte of the canonical dispatch error reply.
pub const REPLY_ERROR_PREFIX: u8 = 1;

/// Receives reply messages for one call.
pub trait Replier {
    fn reply(&mut self, msg: Msg);
}

/// Decodes a request message into boxed in-arguments.
pub type ReadMsgFn = fn(&mut Msg) -> Result<Box<dyn Any>, DecodeError>;

/// Serializes out-arguments into a reply message.
pub type CreateReplyFn = fn(&dyn Any) -> Msg;

/// Codec entry points for one method id.
pub struct MethodStub {
    /// Decoder for the in-arguments; `None` when the method takes none.
    pub read_msg: Option<ReadMsgFn>,
    /// Encoder for the out-arguments.
    pub create_reply: CreateReplyFn,
}

/// The compile-time-known dispatch table of an interface: stubs indexed
/// by method id. Read-only after construction and freely shared.
pub struct Skeleton {
    pub stubs: &'static [MethodStub],
}

impl Skeleton {
    /// Total number of methods, inherited ones included.
    pub fn len(&self) -> usize {
        self.stubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }
}

/// Reads the method-id prefix off a request message, if present.
pub fn read_prefix(msg: &Msg) -> Option<u8> {
    msg.bytes.first().copied()
}

/// A one-byte message holding just a prefix.
pub fn prefixed_empty_msg(prefix: u8) -> Msg {
    Msg {
        bytes: vec![prefix],
        submsgs: Vec::new(),
    }
}

/// The canonical dispatch error reply `[0x01]`.
pub fn error_reply() -> Msg {
    prefixed_empty_msg(REPLY_ERROR_PREFIX)
}

/// Dispatch callback: receives the servant, the replier for this call,
/// the method id, and the decoded in-arguments (absent for methods that
/// take none).
pub type ImplFn<U> = fn(&Servant<U>, &mut dyn Replier, u8, Option<&mut dyn Any>);

/// A servant: a skeleton bound to one dispatch callback and its state.
pub struct Servant<U = ()> {
    skel: &'static Skeleton,
    handler: ImplFn<U>,
    user_data: U,
}

impl<U> Servant<U> {
    pub fn new(skel: &'static Skeleton, handler: ImplFn<U>, user_data: U) -> Servant<U> {
        Servant {
            skel,
            handler,
            user_data,
        }
    }

    pub fn user_data(&self) -> &U {
        &self.user_data
    }

    /// Dispatches one request message.
    ///
    /// A missing or out-of-range method id, or an in-argument decode
    /// failure, answers with [`error_reply`] and never reaches the
    /// callback. In-arguments are released when `call` returns.
    pub fn call(&self, msg: &mut Msg, replier: &mut dyn Replier) {
        let id = match read_prefix(msg) {
            Some(id) if (id as usize) < self.skel.stubs.len() => id,
            _ => {
                replier.reply(error_reply());
                return;
            }
        };
        let stub = &self.skel.stubs[id as usize];

        let mut args: Option<Box<dyn Any>> = None;
        if let Some(read_msg) = stub.read_msg {
            match read_msg(msg) {
                Ok(decoded) => args = Some(decoded),
                Err(_) => {
                    replier.reply(error_reply());
                    return;
                }
            }
        }

        (self.handler)(self, replier, id, args.as_deref_mut());
        // args dropped here: the in-arguments are freed after dispatch.
    }

    /// Serializes `out_args` through the method's stub and hands the
    /// reply to the replier. Convenience for implementations answering a
    /// call.
    pub fn send_return(&self, method_id: u8, replier: &mut dyn Replier, out_args: &dyn Any) {
        let reply = (self.skel.stubs[method_id as usize].create_reply)(out_args);
        replier.reply(reply);
    }
}
