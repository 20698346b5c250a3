//! The path query language for addressing values inside a populated
//! message.
//!
//! Grammar: an optional leading `/`, zero or more group steps (`NAME` or
//! `NAME(n)`), and a terminal
//! `CODE[(n)][-field[(rep)][-component[-subcomponent]]]`, all ordinals
//! 1-based. Examples against an ORU_R01:
//!
//! - `/PATIENT_RESULT/PATIENT/VISIT/PV1` — the whole PV1 segment text
//! - `PV1-1` — field 1 of the first PV1 anywhere in the message
//! - `PID-3(2)-1` — first component of the second repetition of PID-3
//! - `/PATIENT_RESULT/ORDER_OBSERVATION/OBSERVATION(2)/OBX-7` — field 7 of
//!   the OBX inside the second OBSERVATION group

/// Completion of partial paths.
pub mod complete;
/// Path expression parsing and validation.
pub mod expr;
/// Resolution of validated expressions against a message.
pub mod resolve;

pub(crate) use complete::enumerate_paths;

pub use complete::complete;
pub use expr::{GroupStep, PathExpr, Terminal};
pub use resolve::resolve;
