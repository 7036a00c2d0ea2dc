//! Protocol module for encoding Redis commands and decoding replies

pub mod command;
pub mod parser;

pub use command::{Command, Response};
pub use parser::Parser;
