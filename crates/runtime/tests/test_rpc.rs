//! RPC dispatch over a generated-style skeleton
//!
//! Hand-expanded output of `midlc` for
//!
//! ```text
//! interface Calc
//! {
//!     increment(i32 in) : (i32 out);
//!     decrement(i32 in) : (i32 out);
//! }
//! ```
//!
//! driven through the servant runtime end to end.

use midl_runtime::servant::{self, MethodStub, Skeleton};
use midl_runtime::{DLen, DecodeError, Msg, MsgIter, Replier, Servant};
use std::any::Any;

pub const CALC_INCREMENT_ID: u8 = 0;
pub const CALC_DECREMENT_ID: u8 = 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalcIncrementIn {
    pub r#in: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalcIncrementOut {
    pub out: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalcDecrementIn {
    pub r#in: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalcDecrementOut {
    pub out: i32,
}

impl CalcIncrementIn {
    pub fn create_msg(&self) -> Msg {
        let size = DLen {
            bytes: 1 + 4,
            submsgs: 0,
        };
        let mut msg = Msg::new(size.bytes, size.submsgs);
        {
            let mut iter = MsgIter::new(&mut msg);
            let mut seg = iter.get_segment(1 + 4, 0).expect("message sized by count");
            seg.write_u8(CALC_INCREMENT_ID);
            seg.write_i32(self.r#in);
        }
        msg
    }

    pub fn read_msg(msg: &mut Msg) -> Result<CalcIncrementIn, DecodeError> {
        let mut iter = MsgIter::new(msg);
        let mut seg = iter.get_segment(1, 0)?;
        if seg.read_u8() != CALC_INCREMENT_ID {
            return Err(DecodeError::BadPrefix);
        }
        let mut seg = iter.get_segment(4, 0)?;
        let r#in = seg.read_i32();
        if !iter.at_end() {
            return Err(DecodeError::TrailingData);
        }
        Ok(CalcIncrementIn { r#in })
    }
}

impl CalcIncrementOut {
    pub fn create_reply(&self) -> Msg {
        let size = DLen {
            bytes: 1 + 4,
            submsgs: 0,
        };
        let mut msg = Msg::new(size.bytes, size.submsgs);
        {
            let mut iter = MsgIter::new(&mut msg);
            let mut seg = iter.get_segment(1 + 4, 0).expect("message sized by count");
            seg.write_u8(servant::REPLY_OK_PREFIX);
            seg.write_i32(self.out);
        }
        msg
    }

    pub fn read_reply(msg: &mut Msg) -> Result<CalcIncrementOut, DecodeError> {
        let mut iter = MsgIter::new(msg);
        let mut seg = iter.get_segment(1, 0)?;
        if seg.read_u8() != servant::REPLY_OK_PREFIX {
            return Err(DecodeError::BadPrefix);
        }
        let mut seg = iter.get_segment(4, 0)?;
        let out = seg.read_i32();
        if !iter.at_end() {
            return Err(DecodeError::TrailingData);
        }
        Ok(CalcIncrementOut { out })
    }
}

impl CalcDecrementIn {
    pub fn create_msg(&self) -> Msg {
        let size = DLen {
            bytes: 1 + 4,
            submsgs: 0,
        };
        let mut msg = Msg::new(size.bytes, size.submsgs);
        {
            let mut iter = MsgIter::new(&mut msg);
            let mut seg = iter.get_segment(1 + 4, 0).expect("message sized by count");
            seg.write_u8(CALC_DECREMENT_ID);
            seg.write_i32(self.r#in);
        }
        msg
    }

    pub fn read_msg(msg: &mut Msg) -> Result<CalcDecrementIn, DecodeError> {
        let mut iter = MsgIter::new(msg);
        let mut seg = iter.get_segment(1, 0)?;
        if seg.read_u8() != CALC_DECREMENT_ID {
            return Err(DecodeError::BadPrefix);
        }
        let mut seg = iter.get_segment(4, 0)?;
        let r#in = seg.read_i32();
        if !iter.at_end() {
            return Err(DecodeError::TrailingData);
        }
        Ok(CalcDecrementIn { r#in })
    }
}

impl CalcDecrementOut {
    pub fn create_reply(&self) -> Msg {
        let size = DLen {
            bytes: 1 + 4,
            submsgs: 0,
        };
        let mut msg = Msg::new(size.bytes, size.submsgs);
        {
            let mut iter = MsgIter::new(&mut msg);
            let mut seg = iter.get_segment(1 + 4, 0).expect("message sized by count");
            seg.write_u8(servant::REPLY_OK_PREFIX);
            seg.write_i32(self.out);
        }
        msg
    }

    pub fn read_reply(msg: &mut Msg) -> Result<CalcDecrementOut, DecodeError> {
        let mut iter = MsgIter::new(msg);
        let mut seg = iter.get_segment(1, 0)?;
        if seg.read_u8() != servant::REPLY_OK_PREFIX {
            return Err(DecodeError::BadPrefix);
        }
        let mut seg = iter.get_segment(4, 0)?;
        let out = seg.read_i32();
        if !iter.at_end() {
            return Err(DecodeError::TrailingData);
        }
        Ok(CalcDecrementOut { out })
    }
}

static CALC_STUBS: [MethodStub; 2] = [
    MethodStub {
        read_msg: Some(|msg| {
            CalcIncrementIn::read_msg(msg).map(|args| Box::new(args) as Box<dyn Any>)
        }),
        create_reply: |out_args| {
            out_args
                .downcast_ref::<CalcIncrementOut>()
                .expect("out-args type")
                .create_reply()
        },
    },
    MethodStub {
        read_msg: Some(|msg| {
            CalcDecrementIn::read_msg(msg).map(|args| Box::new(args) as Box<dyn Any>)
        }),
        create_reply: |out_args| {
            out_args
                .downcast_ref::<CalcDecrementOut>()
                .expect("out-args type")
                .create_reply()
        },
    },
];

pub static CALC_SKELETON: Skeleton = Skeleton {
    stubs: &CALC_STUBS,
};

// Test-side caller context, in the shape of the original test harness.
struct TestReplier {
    reply: Option<Msg>,
}

impl Replier for TestReplier {
    fn reply(&mut self, msg: Msg) {
        self.reply = Some(msg);
    }
}

fn calc_impl(servant: &Servant, replier: &mut dyn Replier, method_id: u8, args: Option<&mut dyn Any>) {
    match method_id {
        CALC_INCREMENT_ID => {
            let args = args
                .and_then(|a| a.downcast_ref::<CalcIncrementIn>())
                .expect("in-args type");
            let out_args = CalcIncrementOut { out: args.r#in + 1 };
            servant.send_return(method_id, replier, &out_args);
        }
        CALC_DECREMENT_ID => {
            let args = args
                .and_then(|a| a.downcast_ref::<CalcDecrementIn>())
                .expect("in-args type");
            let out_args = CalcDecrementOut { out: args.r#in - 1 };
            servant.send_return(method_id, replier, &out_args);
        }
        _ => unreachable!("skeleton bounds the method id"),
    }
}

#[test]
fn test_increment() {
    let servant = Servant::new(&CALC_SKELETON, calc_impl, ());
    let mut replier = TestReplier { reply: None };

    let mut msg = CalcIncrementIn { r#in: 1 }.create_msg();
    assert_eq!(msg.bytes[0], CALC_INCREMENT_ID);
    servant.call(&mut msg, &mut replier);

    let mut reply = replier.reply.expect("reply sent");
    let out_args = CalcIncrementOut::read_reply(&mut reply).expect("reply decodes");
    assert_eq!(out_args.out, 2);
}

#[test]
fn test_decrement() {
    let servant = Servant::new(&CALC_SKELETON, calc_impl, ());
    let mut replier = TestReplier { reply: None };

    let mut msg = CalcDecrementIn { r#in: 2 }.create_msg();
    assert_eq!(msg.bytes[0], CALC_DECREMENT_ID);
    servant.call(&mut msg, &mut replier);

    let mut reply = replier.reply.expect("reply sent");
    let out_args = CalcDecrementOut::read_reply(&mut reply).expect("reply decodes");
    assert_eq!(out_args.out, 1);
}

#[test]
fn test_unknown_method_id_gets_error_reply() {
    let servant = Servant::new(&CALC_SKELETON, calc_impl, ());
    let mut replier = TestReplier { reply: None };

    let mut msg = servant::prefixed_empty_msg(2);
    servant.call(&mut msg, &mut replier);

    let mut reply = replier.reply.expect("reply sent");
    assert_eq!(reply.bytes, vec![0x01]);
    assert_eq!(
        CalcIncrementOut::read_reply(&mut reply),
        Err(DecodeError::BadPrefix)
    );
}

#[test]
fn test_in_args_round_trip() {
    // read_msg(create_msg(args)) == args, and the first byte of the root
    // block is the method id.
    let args = CalcDecrementIn { r#in: -7 };
    let mut msg = args.create_msg();
    assert_eq!(msg.bytes[0], CALC_DECREMENT_ID);
    assert_eq!(CalcDecrementIn::read_msg(&mut msg).unwrap(), args);
}
