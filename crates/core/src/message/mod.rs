//! The HL7v2 message model and its text codec.

/// Serialization back to delimited text.
pub mod emit;
/// Value types: separators, cells, fields, segments, messages.
pub mod model;
/// Parsing of delimited text into the model.
pub mod parse;

pub use model::{Cell, Component, Field, Message, MessageType, Segment, Separators};
