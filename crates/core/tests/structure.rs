//! Grammar population and message construction over real grammars.

mod common;

use common::{oru_message, registry};
use hl7_toolkit_core::{Message, StructureError};

#[test]
fn oru_fixture_populates_the_expected_tree() {
    let message = oru_message();
    let root = message.structure().unwrap();
    assert_eq!(root.name, "ORU_R01");

    let pr: Vec<_> = root.child_groups("PATIENT_RESULT").collect();
    assert_eq!(pr.len(), 1);

    let patient: Vec<_> = pr[0].child_groups("PATIENT").collect();
    assert_eq!(patient.len(), 1);
    let visit: Vec<_> = patient[0].child_groups("VISIT").collect();
    assert_eq!(visit.len(), 1);

    let orders: Vec<_> = pr[0].child_groups("ORDER_OBSERVATION").collect();
    assert_eq!(orders.len(), 1);
    let observations: Vec<_> = orders[0].child_groups("OBSERVATION").collect();
    assert_eq!(observations.len(), 2);
}

#[test]
fn tree_indices_cover_the_segment_list_in_order() {
    let message = oru_message();
    let indices = message.structure().unwrap().segment_indices();
    assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn field_metadata_is_bound_after_parse() {
    let message = oru_message();
    let pid = message.segment("PID").unwrap();
    let meta = pid.field(3).unwrap().meta.as_ref().unwrap();
    assert_eq!(meta.name, "Patient Identifier List");
    assert_eq!(meta.datatype, "CX");

    let obx = message.segment("OBX").unwrap();
    assert!(obx.field(2).unwrap().meta.is_some());
}

#[test]
fn from_grammar_builds_a_structured_skeleton() {
    let registry = registry();
    let message =
        Message::from_grammar(&registry, "2.5.1", "ADT_A01", &["EVN", "PID", "PV1"]).unwrap();

    assert_eq!(message.version, "2.5.1");
    let msh = message.segment("MSH").unwrap();
    assert_eq!(msh.field_text(9).as_deref(), Some("ADT"));
    assert_eq!(msh.field_text(12).as_deref(), Some("2.5.1"));
    assert_eq!(message.structure().unwrap().segment_indices().len(), 4);
}

#[test]
fn from_grammar_output_parses_back() {
    let registry = registry();
    let mut message =
        Message::from_grammar(&registry, "2.5.1", "ADT_A01", &["EVN", "PID", "PV1"]).unwrap();
    message.set_field("PID", 5, "DOE^JOHN");

    let reparsed = Message::parse(&message.serialize(), &registry).unwrap();
    assert_eq!(reparsed.message_type.name(), "ADT_A01");
    assert_eq!(
        reparsed.segment("PID").unwrap().field_text(5).as_deref(),
        Some("DOE")
    );
    assert!(reparsed.structure().is_ok());
}

#[test]
fn from_grammar_rejects_unknown_inputs() {
    let registry = registry();
    assert!(matches!(
        Message::from_grammar(&registry, "2.9", "ACK", &[]),
        Err(StructureError::UnsupportedVersion(_))
    ));
    assert!(matches!(
        Message::from_grammar(&registry, "2.5.1", "QRY_Q01", &[]),
        Err(StructureError::UnknownMessageType(_))
    ));
}
