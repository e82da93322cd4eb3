//! Request metadata parsing.

pub mod parse;
