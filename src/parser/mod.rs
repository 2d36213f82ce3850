//! Basic low-level byte parser functionality.
pub mod byte_parser;
pub mod parsing_error;
pub mod utils;

pub use byte_parser::{ByteParser, ConsumeMode};
pub use parsing_error::{ParsingError, ParsingErrorType};
