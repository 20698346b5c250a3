//! Message → text codec: the exact structural inverse of parsing.
//!
//! Serialization joins with the separators detected at parse time (or the
//! defaults for constructed messages). Fields are emitted densely from
//! index 1 up to the highest populated index, so trailing empty fields are
//! dropped; parse→serialize is byte-exact for well-formed input that
//! carried none.

use crate::message::model::{Cell, Component, Field, Message, Segment, Separators};

impl Message {
    /// Serialize the message back to HL7v2 text.
    pub fn serialize(&self) -> String {
        self.segments
            .iter()
            .map(|seg| emit_segment(seg, &self.separators))
            .collect::<Vec<_>>()
            .join(&self.record_separator)
    }
}

/// Serialize one segment with its own field separator.
pub(crate) fn emit_segment(segment: &Segment, separators: &Separators) -> String {
    let Some(&max_index) = segment.fields.keys().max() else {
        return segment.code.clone();
    };

    // Header field 1 *is* the separator, so emission starts at field 2;
    // field 2 (the encoding characters) was stored verbatim and comes back
    // out verbatim.
    let first = if segment.is_header() { 2 } else { 1 };

    let mut out = segment.code.clone();
    for index in first..=max_index {
        out.push(segment.field_sep);
        if let Some(field) = segment.fields.get(&index) {
            out.push_str(&emit_field(field, separators));
        }
    }
    out
}

/// Serialize a field: repetitions joined by the repetition separator.
pub(crate) fn emit_field(field: &Field, separators: &Separators) -> String {
    field
        .cells
        .iter()
        .map(|cell| emit_cell(cell, separators))
        .collect::<Vec<_>>()
        .join(&separators.repetition.to_string())
}

/// Serialize one repetition: components joined by the component separator.
pub(crate) fn emit_cell(cell: &Cell, separators: &Separators) -> String {
    match cell {
        Cell::Text(s) => s.clone(),
        Cell::Components(parts) => parts
            .iter()
            .map(|part| emit_component(part, separators))
            .collect::<Vec<_>>()
            .join(&separators.component.to_string()),
    }
}

/// Serialize one component: subcomponents joined by their separator.
pub(crate) fn emit_component(component: &Component, separators: &Separators) -> String {
    match component {
        Component::Text(s) => s.clone(),
        Component::Subcomponents(parts) => parts.join(&separators.subcomponent.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::parse::{parse_field, parse_segment};

    #[test]
    fn segment_roundtrip() {
        let seps = Separators::default();
        for record in [
            "PID|1||123456^^^HOSP^MR||DOE^JOHN",
            "MSH|^~\\&|APP|FAC|DEST|DFAC|20240102030405||ORU^R01^ORU_R01|MSG001|P|2.5",
            "OBX|1|NM|GLU^Glucose||98|mg/dL|70-105|N|||F",
            "DSC",
        ] {
            let seg = parse_segment(record).unwrap();
            assert_eq!(emit_segment(&seg, &seps), record);
        }
    }

    #[test]
    fn trailing_empty_fields_are_dropped() {
        let seps = Separators::default();
        let seg = parse_segment("PID|1||123|||").unwrap();
        assert_eq!(emit_segment(&seg, &seps), "PID|1||123");
    }

    #[test]
    fn field_roundtrip_through_all_levels() {
        let seps = Separators::default();
        for raw in ["plain", "A^B^C", "A~B", "A&B", "X^Y&Z~Q"] {
            let field = parse_field(raw, &seps);
            assert_eq!(emit_field(&field, &seps), raw);
        }
    }

    #[test]
    fn custom_field_separator_is_kept() {
        let seps = Separators::default();
        let seg = parse_segment("PID#1##123").unwrap();
        assert_eq!(emit_segment(&seg, &seps), "PID#1##123");
    }
}
