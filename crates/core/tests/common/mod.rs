//! Shared fixtures for the core integration tests.
#![allow(dead_code)]

use hl7_toolkit_core::{Message, Registry};

/// A well-formed ORU_R01 with repeated PID-3 and two OBX observations.
pub const ORU_FIXTURE: &str = concat!(
    "MSH|^~\\&|LAB|HOSP|EMR|HOSP|20240115083000||ORU^R01^ORU_R01|LAB20240115001|P|2.5.1\r",
    "PID|1||123456^^^HOSP^MR~987654^^^STATE^SS||DOE^JANE^M||19800202|F\r",
    "PV1|1|I|ICU^2^1\r",
    "OBR|1||FILL123|CBC^Complete Blood Count^L|||20240115080000\r",
    "OBX|1|NM|WBC^Leukocytes||9.5|10*9/L|4.0-11.0|N|||F\r",
    "OBX|2|NM|HGB^Hemoglobin||13.8|g/dL|12.0-16.0|N|||F"
);

/// A minimal ACK for the same version.
pub const ACK_FIXTURE: &str = concat!(
    "MSH|^~\\&|EMR|HOSP|LAB|HOSP|20240115083001||ACK|ACK0001|P|2.5.1\r",
    "MSA|AA|LAB20240115001"
);

pub fn registry() -> Registry {
    Registry::load_embedded()
}

pub fn oru_message() -> Message {
    Message::parse(ORU_FIXTURE, &registry()).unwrap()
}
