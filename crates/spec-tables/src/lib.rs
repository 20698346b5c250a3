//! HL7v2 message specification tables.
//!
//! Defines the data structures for version-specific HL7v2 grammar metadata:
//! message type entries, grammar group templates with occurrence bounds, and
//! per-segment field definitions.  These tables are deserialized from the
//! embedded JSON definition files and consumed by the structural parser, the
//! grammar population engine, and the acknowledgment builder.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

mod registry;

pub use registry::{Registry, UnsupportedVersion};

/// Current format version for the definition JSON schema.
pub const TABLE_FORMAT_VERSION: &str = "1.0.0";

fn default_min_occurs() -> u32 {
    1
}

fn default_max_occurs() -> Option<u32> {
    Some(1)
}

/// Metadata for one field position of a segment.
///
/// Field definitions are keyed by segment code and shared across every
/// message type of a version that uses the segment. They carry no concrete
/// data; the population engine copies them onto matched `Field` values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    /// Long human-readable field name (e.g., `"Patient Identifier List"`).
    pub name: String,
    /// Declared HL7 data type code (e.g., `"CX"`, `"TS"`, `"ST"`).
    pub datatype: String,
    /// 1-based field index within the segment.
    pub index: u32,
    /// Maximum declared length in characters, if the spec bounds it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Minimum number of occurrences (0 = optional).
    #[serde(default)]
    pub min_occurs: u32,
    /// Maximum number of occurrences; `None` means unbounded repetition.
    #[serde(default = "default_max_occurs")]
    pub max_occurs: Option<u32>,
}

/// One item of a grammar template: either a segment slot or a nested group.
///
/// The tagged representation keeps the JSON self-describing:
/// `{"kind": "segment", "code": "PID"}` vs `{"kind": "group", "name": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TemplateItem {
    /// A slot expecting zero or more consecutive segments of one code.
    Segment {
        /// 3-letter segment code this slot matches (e.g., `"OBX"`).
        code: String,
        /// Minimum occurrences (0 = optional slot).
        #[serde(default = "default_min_occurs")]
        min: u32,
        /// Maximum occurrences; `None` means unbounded.
        #[serde(default = "default_max_occurs")]
        max: Option<u32>,
    },
    /// A nested group of segments and subgroups.
    Group(GroupTemplate),
}

/// A named, ordered grammar group with occurrence bounds.
///
/// This is a pure template — populating it against a concrete segment
/// sequence produces a `GroupTree` in the core crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupTemplate {
    /// Group name as used by path queries (e.g., `"PATIENT_RESULT"`).
    pub name: String,
    /// Minimum occurrences of the whole group (0 = optional).
    #[serde(default = "default_min_occurs")]
    pub min: u32,
    /// Maximum occurrences of the whole group; `None` means unbounded.
    #[serde(default = "default_max_occurs")]
    pub max: Option<u32>,
    /// Ordered child items, attempted strictly in declaration order.
    pub items: Vec<TemplateItem>,
}

/// A known message type of one HL7 version: its name and grammar root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageTypeEntry {
    /// Structure name (e.g., `"ORU_R01"`, `"ACK"`).
    pub name: String,
    /// Root grammar template; its name equals the structure name.
    pub structure: GroupTemplate,
}

/// All specification tables for one HL7 version.
///
/// Deserialized from one embedded JSON definition file. Lookup maps are
/// built lazily on first access and reused thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionTables {
    /// The HL7 version these tables describe (e.g., `"2.5.1"`).
    pub version: String,
    /// Definition format version for compatibility checks.
    #[serde(default = "default_format_version")]
    pub format_version: String,
    /// Known message types and their grammar templates.
    pub message_types: Vec<MessageTypeEntry>,
    /// Per-segment-code field metadata, shared across message types.
    pub segments: HashMap<String, Vec<FieldSpec>>,

    /// Cached map from structure name → index into `message_types`.
    #[serde(skip)]
    type_map: OnceLock<HashMap<String, usize>>,
}

fn default_format_version() -> String {
    TABLE_FORMAT_VERSION.to_string()
}

impl VersionTables {
    /// Create tables directly from parts (used by tests building
    /// hand-rolled registries).
    pub fn new(
        version: String,
        message_types: Vec<MessageTypeEntry>,
        segments: HashMap<String, Vec<FieldSpec>>,
    ) -> Self {
        Self {
            version,
            format_version: default_format_version(),
            message_types,
            segments,
            type_map: OnceLock::new(),
        }
    }

    fn type_map(&self) -> &HashMap<String, usize> {
        self.type_map.get_or_init(|| {
            self.message_types
                .iter()
                .enumerate()
                .map(|(i, e)| (e.name.clone(), i))
                .collect()
        })
    }

    /// Look up a message type entry by structure name (e.g., `"ORU_R01"`).
    pub fn message_type(&self, name: &str) -> Option<&MessageTypeEntry> {
        self.type_map().get(name).map(|&i| &self.message_types[i])
    }

    /// Field metadata for a segment code, if this version defines any.
    pub fn segment_fields(&self, code: &str) -> Option<&[FieldSpec]> {
        self.segments.get(code).map(Vec::as_slice)
    }

    /// Names of every message type this version knows, in definition order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.message_types.iter().map(|e| e.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables_json() -> &'static str {
        r#"{
            "version": "2.5",
            "messageTypes": [
                {
                    "name": "ACK",
                    "structure": {
                        "name": "ACK",
                        "items": [
                            {"kind": "segment", "code": "MSH"},
                            {"kind": "segment", "code": "MSA"},
                            {"kind": "segment", "code": "ERR", "min": 0, "max": null}
                        ]
                    }
                }
            ],
            "segments": {
                "MSA": [
                    {"name": "Acknowledgment Code", "datatype": "ID", "index": 1, "maxLength": 2},
                    {"name": "Message Control ID", "datatype": "ST", "index": 2, "maxLength": 20}
                ]
            }
        }"#
    }

    #[test]
    fn deserializes_tables() {
        let tables: VersionTables = serde_json::from_str(tables_json()).unwrap();
        assert_eq!(tables.version, "2.5");
        assert_eq!(tables.format_version, TABLE_FORMAT_VERSION);
        assert_eq!(tables.message_types.len(), 1);
    }

    #[test]
    fn occurrence_defaults() {
        let tables: VersionTables = serde_json::from_str(tables_json()).unwrap();
        let ack = tables.message_type("ACK").unwrap();
        match &ack.structure.items[0] {
            TemplateItem::Segment { code, min, max } => {
                assert_eq!(code, "MSH");
                assert_eq!(*min, 1);
                assert_eq!(*max, Some(1));
            }
            other => panic!("expected segment slot, got {:?}", other),
        }
        match &ack.structure.items[2] {
            TemplateItem::Segment { code, min, max } => {
                assert_eq!(code, "ERR");
                assert_eq!(*min, 0);
                assert_eq!(*max, None);
            }
            other => panic!("expected segment slot, got {:?}", other),
        }
    }

    #[test]
    fn type_lookup_is_cached() {
        let tables: VersionTables = serde_json::from_str(tables_json()).unwrap();
        assert!(tables.message_type("ACK").is_some());
        assert!(tables.message_type("ADT_A01").is_none());
    }

    #[test]
    fn segment_fields_lookup() {
        let tables: VersionTables = serde_json::from_str(tables_json()).unwrap();
        let msa = tables.segment_fields("MSA").unwrap();
        assert_eq!(msa.len(), 2);
        assert_eq!(msa[0].name, "Acknowledgment Code");
        assert_eq!(msa[0].index, 1);
        assert_eq!(msa[0].max_length, Some(2));
        assert!(tables.segment_fields("ZZZ").is_none());
    }
}
