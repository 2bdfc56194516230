//! Line protocol of the test-case generation service.
//!
//! The service answers with one JSON object per line. Control lines carry
//! the method signature, liveness pings and errors; data lines carry test
//! cases whose values are positionally aligned with the signature's
//! parameter list.

pub mod arguments;
pub mod codec;
pub mod lines;
pub mod materialize;

pub use arguments::{ArgKey, ArgValue, Argument, ArgumentError, FromArgument, TestArguments};
pub use codec::{
    decode_line, decode_message, decode_method_header, parse_signature, CodecError, InfoMessage,
    MethodHeader, MethodInfo, ProtocolMessage,
};
pub use lines::LineSplitter;
pub use materialize::materialize;
