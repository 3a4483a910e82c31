//! Line framing grammar, case folding and numeric replies for the IRC
//! wire protocol (RFC 1459-style). Kept free of any server state so it
//! can be fuzzed and unit-tested in isolation from the engine.

pub mod casefold;
pub mod message;
pub mod mode;
pub mod rpl;
pub mod validate;

pub use casefold::casefold;
pub use message::{parse_line, Message, ParseError, MAX_LINE, MAX_PARAMS};
