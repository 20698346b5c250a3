//! Acknowledgment construction and classification.
//!
//! An ACK mirrors the inbound header: the sender's application/facility
//! (MSH-3/4) become the reply's receiver (MSH-5/6) and vice versa, and the
//! inbound control ID (MSH-10) is echoed into MSA-2 so the sender can
//! correlate the reply.

use std::sync::atomic::{AtomicU64, Ordering};

use hl7_toolkit_core::{Message, Registry, StructureError};

use crate::MllpError;

/// The acknowledgment decision carried in MSA-1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckCode {
    /// Application Accept (`AA`).
    Accept,
    /// Application Error (`AE`) — received but could not be processed.
    Error,
    /// Application Reject (`AR`) — refused outright.
    Reject,
}

impl AckCode {
    /// The two-letter MSA-1 value.
    pub fn as_str(self) -> &'static str {
        match self {
            AckCode::Accept => "AA",
            AckCode::Error => "AE",
            AckCode::Reject => "AR",
        }
    }
}

/// Whether a reply acknowledged or refused the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckKind {
    /// Positive acknowledgment (`AA` or `CA`).
    Ack,
    /// Negative acknowledgment (anything else in MSA-1).
    Nak,
}

/// A classified acknowledgment reply.
#[derive(Debug, Clone)]
pub struct Acknowledgment {
    /// Positive or negative.
    pub kind: AckKind,
    /// The raw MSA-1 value (`AA`, `AE`, `AR`, or an enhanced-mode variant).
    pub code: String,
    /// The MSA-3 text, if the peer sent one.
    pub text: Option<String>,
    /// The full reply message.
    pub message: Message,
}

impl Acknowledgment {
    /// Whether the peer accepted the message.
    pub fn is_positive(&self) -> bool {
        self.kind == AckKind::Ack
    }

    /// Classify a parsed reply. The reply must declare an ACK type and
    /// carry an MSA segment; anything else was not an acknowledgment.
    pub(crate) fn classify(message: Message) -> Result<Self, MllpError> {
        let type_name = message.message_type.name().to_string();
        if !type_name.starts_with("ACK") {
            return Err(MllpError::UnexpectedMessage { type_name });
        }
        let Some(code) = message.segment("MSA").and_then(|msa| msa.field_text(1)) else {
            return Err(MllpError::Framing {
                details: "acknowledgment reply carries no MSA-1".to_string(),
            });
        };
        let text = message.segment("MSA").and_then(|msa| msa.field_text(3));
        let kind = match code.as_str() {
            "AA" | "CA" => AckKind::Ack,
            _ => AckKind::Nak,
        };
        Ok(Self {
            kind,
            code,
            text,
            message,
        })
    }
}

/// Build the acknowledgment for a successfully parsed inbound message.
///
/// The reply uses the inbound version when the registry supports it and
/// falls back to the newest registered version otherwise.
pub fn build_ack(
    registry: &Registry,
    incoming: &Message,
    code: AckCode,
    text: Option<&str>,
) -> Result<Message, StructureError> {
    let version = match registry.tables_for(&incoming.version) {
        Some(tables) => tables.version.clone(),
        None => newest_version(registry)?,
    };
    let mut ack = Message::from_grammar(registry, &version, "ACK", &["MSA"])?;

    if let Some(inbound_msh) = incoming.segment("MSH") {
        // Mirror sender/receiver identities.
        for (dst, src) in [(3u32, 5u32), (4, 6), (5, 3), (6, 4)] {
            if let Some(raw) = inbound_msh.field_raw(src, &incoming.separators) {
                ack.set_field("MSH", dst, &raw);
            }
        }
        if let Some(processing_id) = inbound_msh.field_raw(11, &incoming.separators) {
            ack.set_field("MSH", 11, &processing_id);
        }
    }
    ack.set_field("MSH", 7, &timestamp());
    ack.set_field("MSH", 10, &next_control_id());

    ack.set_field("MSA", 1, code.as_str());
    if let Some(control_id) = incoming.segment("MSH").and_then(|msh| msh.field_text(10)) {
        ack.set_field("MSA", 2, &control_id);
    }
    if let Some(text) = text {
        ack.set_field("MSA", 3, text);
    }
    Ok(ack)
}

/// Build a best-effort NAK for input that never parsed into a message.
///
/// Uses the newest registered version; MSA-2 stays empty because no
/// control ID was recoverable from the inbound bytes.
pub fn build_reject(registry: &Registry, text: &str) -> Result<Message, StructureError> {
    let version = newest_version(registry)?;
    let mut nak = Message::from_grammar(registry, &version, "ACK", &["MSA"])?;
    nak.set_field("MSH", 7, &timestamp());
    nak.set_field("MSH", 10, &next_control_id());
    nak.set_field("MSA", 1, AckCode::Reject.as_str());
    nak.set_field("MSA", 3, text);
    Ok(nak)
}

fn newest_version(registry: &Registry) -> Result<String, StructureError> {
    registry
        .newest_version()
        .map(str::to_string)
        .ok_or_else(|| StructureError::UnsupportedVersion(String::new()))
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Control IDs only need to be unique per sending process.
fn next_control_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{}{n:04}", chrono::Local::now().format("%Y%m%d%H%M%S"))
}
