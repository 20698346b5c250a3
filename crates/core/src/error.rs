//! Typed error types for parsing, structuring, and path queries.
//!
//! The format is lenient by design: most malformed input is absorbed
//! structurally, so each enum here covers only the failures that genuinely
//! cannot be absorbed.

use hl7_toolkit_spec_tables::UnsupportedVersion;

/// Raw text could not be tokenized into segments at all.
///
/// This is rare — a record that merely lacks delimiters still parses as a
/// code-only segment. Only input with nothing recoverable in it fails.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The input was empty or whitespace-only.
    #[error("empty input")]
    Empty,
    /// No record in the input was long enough to carry a segment code.
    #[error("no parsable segments in input")]
    NoSegments,
}

/// The populated group tree is unavailable for a message.
///
/// The message itself still exists with its raw segments; only the
/// grammar-bound view is missing.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    /// The header's declared version is absent from the registry.
    #[error("unsupported HL7 version: {0:?}")]
    UnsupportedVersion(String),
    /// The header's declared type is absent from that version's grammar set.
    #[error("message type {0:?} not defined for this HL7 version")]
    UnknownMessageType(String),
}

impl From<UnsupportedVersion> for StructureError {
    fn from(e: UnsupportedVersion) -> Self {
        StructureError::UnsupportedVersion(e.0)
    }
}

/// A path failed the structural grammar check, before any tree walk.
///
/// Distinct from a lookup miss: a syntactically valid path that names
/// nothing in a particular message resolves to `None`, not to this error.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The path does not match the path grammar.
    #[error("invalid path syntax: {0}")]
    Syntax(String),
}
