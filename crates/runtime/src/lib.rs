//! midl message runtime
//!
//! The primitives that serializers generated by `midlc` are written
//! against:
//!
//! - [`wire`]: machine-independent encodings for integers and floats
//! - [`msg`]: the tree-structured message container and its
//!   breadth-first wire layout
//! - [`segment`]: bounds-checked iteration over a message and the
//!   segment-at-a-time primitive codec
//! - [`servant`]: prefix-dispatched servant objects for generated
//!   interface skeletons
//!
//! Generated code imports from the crate root; everything it needs is
//! re-exported here.

pub mod msg;
pub mod segment;
pub mod servant;
pub mod wire;

pub use msg::{DLen, LayoutError, Msg};
pub use segment::{DecodeError, MsgIter, Segment};
pub use servant::{MethodStub, Replier, Servant, Skeleton};
pub use wire::FloatClass;
