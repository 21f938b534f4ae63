//! Data structures representing format components.
//!
//! Contains the tag-length-value VarStruct codec and the decoded
//! [`Record`](record::Record) value object produced by the stream decoder.

pub mod record;
pub mod varstruct;
