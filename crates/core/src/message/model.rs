//! Message model value types: separators, cells, fields, segments, messages.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use hl7_toolkit_spec_tables::{FieldSpec, Registry};

use crate::error::StructureError;
use crate::structure::{self, GroupTree};

/// The delimiter set of one message.
///
/// The field separator is position-derived from the header (conventionally
/// `|`); the other four are the conventional encoding characters. Whatever
/// set is detected at parse time stays with the message for its whole
/// lifetime and is the set used to serialize it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Separators {
    /// Field separator (between segment code and fields, and between fields).
    pub field: char,
    /// Repetition separator (between cells of one field).
    pub repetition: char,
    /// Component separator (within a cell).
    pub component: char,
    /// Subcomponent separator (within a component).
    pub subcomponent: char,
    /// Escape character (stored for completeness; escapes pass through verbatim).
    pub escape: char,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            field: '|',
            repetition: '~',
            component: '^',
            subcomponent: '&',
            escape: '\\',
        }
    }
}

impl Separators {
    /// The 4-character encoding-characters value for a header's field 2.
    pub fn encoding_field(&self) -> String {
        [self.component, self.repetition, self.escape, self.subcomponent]
            .iter()
            .collect()
    }
}

/// One repetition of a field: a leaf value or an ordered component list.
///
/// Exactly two levels of nesting exist below a field — components, then
/// subcomponent leaves. Cells are immutable once parsed; edits go through
/// the field-level setters, which replace cells wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    /// A leaf value with no component or subcomponent separators.
    Text(String),
    /// An ordered list of components.
    Components(Vec<Component>),
}

/// One component of a cell: a leaf or an ordered subcomponent list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// A leaf value with no subcomponent separator.
    Text(String),
    /// An ordered list of subcomponent leaves.
    Subcomponents(Vec<String>),
}

impl Cell {
    /// The leaf text, if this cell has no components.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Components(_) => None,
        }
    }

    /// The 1-based `index` component. A leaf cell answers component 1 with
    /// itself, matching the convention that `PID-3-1` of an unsplit value
    /// is the value.
    pub fn component(&self, index: u32) -> Option<Component> {
        match self {
            Cell::Text(s) => (index == 1).then(|| Component::Text(s.clone())),
            Cell::Components(parts) => parts.get(index.checked_sub(1)? as usize).cloned(),
        }
    }
}

impl Component {
    /// The 1-based `index` subcomponent, with the same leaf convention as
    /// [`Cell::component`].
    pub fn subcomponent(&self, index: u32) -> Option<&str> {
        match self {
            Component::Text(s) => (index == 1).then_some(s.as_str()),
            Component::Subcomponents(parts) => {
                parts.get(index.checked_sub(1)? as usize).map(String::as_str)
            }
        }
    }
}

/// An ordered, non-empty list of cells — one per `~` repetition — plus the
/// grammar metadata bound onto it after population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Repetitions of this field, in source order. Never empty.
    pub cells: Vec<Cell>,
    /// Spec metadata (long name, data type, bounds), populated only after
    /// grammar binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<FieldSpec>,
}

impl Field {
    /// A single-repetition leaf field.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            cells: vec![Cell::Text(value.into())],
            meta: None,
        }
    }

    /// The 1-based repetition, if present. Repetition 0 is never present.
    pub fn cell(&self, repetition: u32) -> Option<&Cell> {
        self.cells.get(repetition.checked_sub(1)? as usize)
    }
}

fn default_field_sep() -> char {
    '|'
}

/// One record of a message: a 3-letter code plus indexed fields.
///
/// Field indices are 1-based and dense relative to the declared grammar;
/// fields that are empty in the raw text are simply absent from the map.
/// Header segments (MSH, BHS, FHS) hold the field separator itself at
/// index 1 and the encoding characters, verbatim and uninterpreted, at
/// index 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// The 3-letter segment code (e.g., `"PID"`).
    pub code: String,
    /// This segment's own field separator, taken from the byte after the
    /// code at parse time.
    #[serde(default = "default_field_sep")]
    pub field_sep: char,
    /// 1-based field index → field.
    pub fields: BTreeMap<u32, Field>,
}

impl Segment {
    /// An empty segment with the default delimiter.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            field_sep: default_field_sep(),
            fields: BTreeMap::new(),
        }
    }

    /// Whether this code introduces a message or batch and declares the
    /// delimiter set.
    pub fn is_header(&self) -> bool {
        matches!(self.code.as_str(), "MSH" | "BHS" | "FHS")
    }

    /// The field at a 1-based index, if populated.
    pub fn field(&self, index: u32) -> Option<&Field> {
        self.fields.get(&index)
    }

    /// Replace a field wholesale, parsing `raw` through the cell codec with
    /// the given separators. An empty `raw` removes the field.
    pub fn set_field(&mut self, index: u32, raw: &str, separators: &Separators) {
        if raw.is_empty() {
            self.fields.remove(&index);
        } else {
            self.fields
                .insert(index, super::parse::parse_field(raw, separators));
        }
    }

    /// The full serialized value of a field (all repetitions and
    /// components), if populated.
    pub fn field_raw(&self, index: u32, separators: &Separators) -> Option<String> {
        self.field(index)
            .map(|field| super::emit::emit_field(field, separators))
    }

    /// First-repetition, first-component leaf text of a field, if any.
    pub fn field_text(&self, index: u32) -> Option<String> {
        let cell = self.field(index)?.cell(1)?;
        cell.component(1)?.subcomponent(1).map(str::to_string)
    }
}

/// How the header's declared type related to the registry at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// The declared structure name exists in the version's grammar set.
    Known(String),
    /// The declared structure name (possibly empty) has no grammar entry.
    Unknown(String),
}

impl MessageType {
    /// The declared structure name, known or not.
    pub fn name(&self) -> &str {
        match self {
            MessageType::Known(n) | MessageType::Unknown(n) => n,
        }
    }
}

/// A parsed or constructed HL7v2 message.
///
/// Created by [`Message::parse`] or [`Message::from_grammar`]. Segments,
/// fields, and cells are created once and mutated only through the explicit
/// field-level setters. The populated group tree is derived data, rebuilt
/// whenever segments are parsed, never persisted on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Ordered segment list. Group tree nodes index into this list.
    pub segments: Vec<Segment>,
    /// The delimiter set detected at parse time (or the defaults for
    /// constructed messages).
    pub separators: Separators,
    /// The record separator detected at parse time (`\r`, `\n`, or `\r\n`).
    pub record_separator: String,
    /// The declared protocol version from MSH-12 (may be empty).
    pub version: String,
    /// The declared message type and whether the registry knows it.
    pub message_type: MessageType,
    pub(crate) structure: Option<GroupTree>,
    pub(crate) version_supported: bool,
    #[serde(skip)]
    pub(crate) path_index: OnceLock<Vec<String>>,
}

impl Message {
    /// The populated group tree, or why it is unavailable.
    ///
    /// An unsupported version or unknown type is surfaced here; the raw
    /// segments remain accessible either way.
    pub fn structure(&self) -> Result<&GroupTree, StructureError> {
        match &self.structure {
            Some(tree) => Ok(tree),
            None if !self.version_supported => Err(StructureError::UnsupportedVersion(
                self.version.clone(),
            )),
            None => Err(StructureError::UnknownMessageType(
                self.message_type.name().to_string(),
            )),
        }
    }

    /// First segment with the given code, if any.
    pub fn segment(&self, code: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.code == code)
    }

    /// All segments with the given code, in message order.
    pub fn segments_with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Segment> {
        self.segments.iter().filter(move |s| s.code == code)
    }

    /// Replace a field of the first segment with the given code.
    ///
    /// Returns `false` if no such segment exists. The raw text runs through
    /// the cell codec with this message's separators; the field's previous
    /// cells are replaced wholesale.
    pub fn set_field(&mut self, code: &str, index: u32, raw: &str) -> bool {
        let separators = self.separators;
        let Some(segment) = self.segments.iter_mut().find(|s| s.code == code) else {
            return false;
        };
        segment.set_field(index, raw, &separators);
        self.path_index = OnceLock::new();
        true
    }

    /// Instantiate an empty message of a known type from its grammar.
    ///
    /// Builds an MSH with default separators, the given version and type,
    /// then appends one empty segment per code in `preload` (MSH is always
    /// present and need not be listed). The group tree is populated against
    /// the preloaded sequence.
    pub fn from_grammar(
        registry: &Registry,
        version: &str,
        type_name: &str,
        preload: &[&str],
    ) -> Result<Self, StructureError> {
        let tables = registry.require(version)?;
        let entry = tables
            .message_type(type_name)
            .ok_or_else(|| StructureError::UnknownMessageType(type_name.to_string()))?;

        let separators = Separators::default();
        let mut msh = Segment::new("MSH");
        msh.fields.insert(1, Field::text(separators.field.to_string()));
        msh.fields.insert(2, Field::text(separators.encoding_field()));
        msh.set_field(9, &type_field_value(type_name), &separators);
        msh.fields.insert(12, Field::text(version));

        let mut segments = vec![msh];
        segments.extend(
            preload
                .iter()
                .filter(|code| **code != "MSH")
                .map(|code| Segment::new(*code)),
        );

        let tree = structure::populate(&entry.structure, &segments);
        structure::annotate(&mut segments, tables);

        Ok(Self {
            segments,
            separators,
            record_separator: "\r".to_string(),
            version: version.to_string(),
            message_type: MessageType::Known(type_name.to_string()),
            structure: Some(tree),
            version_supported: true,
            path_index: OnceLock::new(),
        })
    }

    /// Resolve a path query against this message.
    ///
    /// See the [`path`](crate::path) module for the path grammar.
    pub fn query(&self, path: &str) -> Result<Option<String>, crate::error::PathError> {
        crate::path::resolve(self, path)
    }

    /// Every concrete path reachable in the populated tree, built once per
    /// message by a full tree walk and cached.
    pub fn paths(&self) -> &[String] {
        self.path_index
            .get_or_init(|| crate::path::enumerate_paths(self))
    }
}

/// The MSH-9 value for a structure name: `"ADT_A01"` becomes
/// `"ADT^A01^ADT_A01"`, a bare name like `"ACK"` stays as-is.
pub(crate) fn type_field_value(type_name: &str) -> String {
    match type_name.split_once('_') {
        Some((msg, trigger)) => format!("{msg}^{trigger}^{type_name}"),
        None => type_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_separators() {
        let seps = Separators::default();
        assert_eq!(seps.field, '|');
        assert_eq!(seps.encoding_field(), "^~\\&");
    }

    #[test]
    fn leaf_cell_answers_component_one() {
        let cell = Cell::Text("ABC".to_string());
        assert_eq!(
            cell.component(1).unwrap().subcomponent(1),
            Some("ABC")
        );
        assert!(cell.component(2).is_none());
    }

    #[test]
    fn component_indexing() {
        let cell = Cell::Components(vec![
            Component::Text("A".to_string()),
            Component::Subcomponents(vec!["B".to_string(), "C".to_string()]),
        ]);
        assert_eq!(cell.component(2).unwrap().subcomponent(2), Some("C"));
        assert!(cell.component(3).is_none());
    }

    #[test]
    fn index_zero_is_a_miss_not_a_panic() {
        let cell = Cell::Components(vec![Component::Subcomponents(vec!["A".to_string()])]);
        assert!(cell.component(0).is_none());
        assert!(cell.component(1).unwrap().subcomponent(0).is_none());

        let field = Field::text("X");
        assert!(field.cell(0).is_none());
        assert!(field.cell(1).is_some());
    }

    #[test]
    fn set_field_replaces_wholesale() {
        let seps = Separators::default();
        let mut seg = Segment::new("PID");
        seg.set_field(3, "123~456", &seps);
        assert_eq!(seg.field(3).unwrap().cells.len(), 2);
        seg.set_field(3, "789", &seps);
        assert_eq!(seg.field(3).unwrap().cells.len(), 1);
        seg.set_field(3, "", &seps);
        assert!(seg.field(3).is_none());
    }

    #[test]
    fn type_field_value_splits_trigger() {
        assert_eq!(type_field_value("ADT_A01"), "ADT^A01^ADT_A01");
        assert_eq!(type_field_value("ACK"), "ACK");
    }
}
