//! Text → message codec: record separator detection, segment tokenizing,
//! cell splitting, and header/version/type detection.
//!
//! Parsing is deliberately lenient. Real-world feeds produce messages that
//! are structurally sloppy but semantically useful, so almost everything is
//! absorbed: a record with no delimiter at all becomes a code-only segment,
//! an unknown version or type leaves the raw segments intact, and only
//! input with nothing recoverable fails with [`ParseError`].

use std::sync::OnceLock;

use hl7_toolkit_spec_tables::Registry;

use crate::error::ParseError;
use crate::message::model::{
    Cell, Component, Field, Message, MessageType, Segment, Separators,
};
use crate::structure;

impl Message {
    /// Parse raw HL7v2 text into a message.
    ///
    /// Detects the record separator, the per-segment field separator (the
    /// byte after the 3-letter code), the declared version (MSH-12), and
    /// the declared type (MSH-9). When the registry knows the version and
    /// type, the grammar is populated and field metadata is bound;
    /// otherwise the message carries its raw segments and
    /// [`Message::structure`] reports why the tree is absent.
    pub fn parse(text: &str, registry: &Registry) -> Result<Self, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let record_separator = detect_record_separator(text);
        let mut segments: Vec<Segment> = text
            .split(record_separator)
            .map(|r| r.trim_matches(['\r', '\n']))
            .filter(|r| !r.is_empty())
            .filter_map(parse_segment)
            .collect();
        if segments.is_empty() {
            return Err(ParseError::NoSegments);
        }

        let mut separators = Separators::default();
        if let Some(header) = segments.first().filter(|s| s.is_header()) {
            separators.field = header.field_sep;
        }

        let version = segments
            .iter()
            .find(|s| s.code == "MSH")
            .and_then(|msh| msh.field_text(12))
            .unwrap_or_default();
        let type_name = segments
            .iter()
            .find(|s| s.code == "MSH")
            .and_then(|msh| msh.field(9))
            .map(structure_name)
            .unwrap_or_default();

        let (message_type, structure, version_supported) =
            match registry.tables_for(&version) {
                Some(tables) => {
                    structure::annotate(&mut segments, tables);
                    match tables.message_type(&type_name) {
                        Some(entry) => {
                            let tree = structure::populate(&entry.structure, &segments);
                            (MessageType::Known(type_name), Some(tree), true)
                        }
                        None => (MessageType::Unknown(type_name), None, true),
                    }
                }
                None => (MessageType::Unknown(type_name), None, false),
            };

        Ok(Self {
            segments,
            separators,
            record_separator: record_separator.to_string(),
            version,
            message_type,
            structure,
            version_supported,
            path_index: OnceLock::new(),
        })
    }
}

/// Pick the record separator: whichever of CR, LF, CRLF occurs more than
/// once, preferring CR, then LF, then CRLF, defaulting to CR.
pub(crate) fn detect_record_separator(text: &str) -> &'static str {
    let bytes = text.as_bytes();
    let mut cr = 0usize;
    let mut lf = 0usize;
    let mut crlf = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                crlf += 1;
                i += 2;
            }
            b'\r' => {
                cr += 1;
                i += 1;
            }
            b'\n' => {
                lf += 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    if cr > 1 {
        "\r"
    } else if lf > 1 {
        "\n"
    } else if crlf > 1 {
        "\r\n"
    } else {
        "\r"
    }
}

/// Parse one record into a segment.
///
/// The byte after the 3-letter code is that segment's own field separator,
/// which is how header segments declare their delimiter set. A record with
/// no delimiter at all is tolerated as a code-only segment; a record too
/// short to carry a code is dropped.
pub(crate) fn parse_segment(record: &str) -> Option<Segment> {
    if record.len() < 3 || !record.is_char_boundary(3) {
        return None;
    }
    let code = &record[..3];
    let mut segment = Segment::new(code);
    let Some(sep) = record[3..].chars().next() else {
        // Code-only record (degenerate but not fatal).
        return Some(segment);
    };
    segment.field_sep = sep;

    let body = &record[3 + sep.len_utf8()..];
    let separators = Separators {
        field: sep,
        ..Separators::default()
    };

    if segment.is_header() {
        // Field 1 is the separator character itself; the first token after
        // it is field 2, the encoding characters, stored verbatim.
        segment.fields.insert(1, Field::text(sep.to_string()));
        let mut tokens = body.split(sep);
        if let Some(encoding) = tokens.next()
            && !encoding.is_empty()
        {
            segment.fields.insert(2, Field::text(encoding));
        }
        for (offset, token) in tokens.enumerate() {
            if !token.is_empty() {
                segment
                    .fields
                    .insert(3 + offset as u32, parse_field(token, &separators));
            }
        }
        return Some(segment);
    }

    let mut index = 1u32;
    for token in body.split(sep) {
        if !token.is_empty() {
            segment.fields.insert(index, parse_field(token, &separators));
        }
        index += 1;
    }
    Some(segment)
}

/// Split a raw field on the repetition separator into its cell list.
pub(crate) fn parse_field(raw: &str, separators: &Separators) -> Field {
    let cells = raw
        .split(separators.repetition)
        .map(|rep| parse_cell(rep, separators))
        .collect();
    Field { cells, meta: None }
}

/// Split one repetition on the component separator; a component containing
/// the subcomponent separator is split one level deeper. A value with no
/// separators stays a leaf.
fn parse_cell(raw: &str, separators: &Separators) -> Cell {
    if !raw.contains(separators.component) && !raw.contains(separators.subcomponent) {
        return Cell::Text(raw.to_string());
    }
    let components = raw
        .split(separators.component)
        .map(|part| {
            if part.contains(separators.subcomponent) {
                Component::Subcomponents(
                    part.split(separators.subcomponent)
                        .map(str::to_string)
                        .collect(),
                )
            } else {
                Component::Text(part.to_string())
            }
        })
        .collect();
    Cell::Components(components)
}

/// Derive the structure name from an MSH-9 field: the third component if
/// present (`ORU^R01^ORU_R01`), else the first two joined with `_`
/// (`ORU^R01`), else the bare value (`ACK`).
fn structure_name(field: &Field) -> String {
    let Some(cell) = field.cell(1) else {
        return String::new();
    };
    let part = |i: u32| {
        cell.component(i)
            .and_then(|c| c.subcomponent(1).map(str::to_string))
            .filter(|s| !s.is_empty())
    };
    if let Some(explicit) = part(3) {
        return explicit;
    }
    match (part(1), part(2)) {
        (Some(msg), Some(trigger)) => format!("{msg}_{trigger}"),
        (Some(msg), None) => msg,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cr_by_preference() {
        assert_eq!(detect_record_separator("a\rb\rc"), "\r");
        assert_eq!(detect_record_separator("a\nb\nc"), "\n");
        assert_eq!(detect_record_separator("a\r\nb\r\nc"), "\r\n");
        // Single occurrence of each: default CR.
        assert_eq!(detect_record_separator("a\rb"), "\r");
        assert_eq!(detect_record_separator("abc"), "\r");
        // CR recurs, LF recurs too: CR wins.
        assert_eq!(detect_record_separator("a\rb\rc\nd\ne"), "\r");
    }

    #[test]
    fn code_only_record_is_tolerated() {
        let seg = parse_segment("DSC").unwrap();
        assert_eq!(seg.code, "DSC");
        assert!(seg.fields.is_empty());
    }

    #[test]
    fn short_record_is_dropped() {
        assert!(parse_segment("PI").is_none());
    }

    #[test]
    fn header_stores_separator_and_encoding_verbatim() {
        let seg = parse_segment("MSH|^~\\&|APP|FAC").unwrap();
        assert_eq!(seg.field_sep, '|');
        assert_eq!(seg.field_text(1).as_deref(), Some("|"));
        assert_eq!(seg.field_text(2).as_deref(), Some("^~\\&"));
        assert_eq!(seg.field_text(3).as_deref(), Some("APP"));
        assert_eq!(seg.field_text(4).as_deref(), Some("FAC"));
    }

    #[test]
    fn segment_declares_its_own_separator() {
        let seg = parse_segment("MSH#^~\\&#APP").unwrap();
        assert_eq!(seg.field_sep, '#');
        assert_eq!(seg.field_text(3).as_deref(), Some("APP"));
    }

    #[test]
    fn empty_fields_are_absent_from_the_map() {
        let seg = parse_segment("PID|1||123").unwrap();
        assert!(seg.field(1).is_some());
        assert!(seg.field(2).is_none());
        assert!(seg.field(3).is_some());
    }

    #[test]
    fn repetitions_components_subcomponents() {
        let seps = Separators::default();
        let field = parse_field("A~B^C&D", &seps);
        assert_eq!(field.cells.len(), 2);
        assert_eq!(field.cells[0], Cell::Text("A".to_string()));
        match &field.cells[1] {
            Cell::Components(parts) => {
                assert_eq!(parts[0], Component::Text("B".to_string()));
                assert_eq!(
                    parts[1],
                    Component::Subcomponents(vec!["C".to_string(), "D".to_string()])
                );
            }
            other => panic!("expected components, got {:?}", other),
        }
    }

    #[test]
    fn subcomponents_without_components() {
        let seps = Separators::default();
        let field = parse_field("C&D", &seps);
        match &field.cells[0] {
            Cell::Components(parts) => {
                assert_eq!(parts.len(), 1);
                assert_eq!(
                    parts[0],
                    Component::Subcomponents(vec!["C".to_string(), "D".to_string()])
                );
            }
            other => panic!("expected components, got {:?}", other),
        }
    }

    #[test]
    fn structure_name_variants() {
        let seps = Separators::default();
        assert_eq!(structure_name(&parse_field("ORU^R01^ORU_R01", &seps)), "ORU_R01");
        assert_eq!(structure_name(&parse_field("ORU^R01", &seps)), "ORU_R01");
        assert_eq!(structure_name(&parse_field("ACK", &seps)), "ACK");
    }
}
