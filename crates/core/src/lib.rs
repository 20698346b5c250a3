//! HL7v2 toolkit core library.
//!
//! Provides the structural message model and text codec, the grammar
//! population engine that binds parsed segments onto a version's expected
//! structure, and the path query language for addressing any value inside
//! a structured message.  The main entry points are [`Message::parse`],
//! [`Message::serialize`](Message::serialize), and [`Message::query`].

#![warn(missing_docs)]

/// Typed errors for parsing, structuring, and path queries.
pub mod error;
/// The message model and its text codec.
pub mod message;
/// The path query language.
pub mod path;
/// Grammar population: binding segments onto a grammar template.
pub mod structure;

// ── Convenience re-exports ──────────────────────────────────────────────────
// Flat imports for the most common entry points. The full module paths
// remain available for less common types.

pub use error::{ParseError, PathError, StructureError};
pub use message::{Cell, Component, Field, Message, MessageType, Segment, Separators};
pub use path::{PathExpr, complete, resolve};
pub use structure::{GroupTree, TreeItem, populate};

// Spec tables (re-exported from the spec-tables crate)
pub use hl7_toolkit_spec_tables::{
    FieldSpec, GroupTemplate, MessageTypeEntry, Registry, TemplateItem, UnsupportedVersion,
    VersionTables,
};
