//! Path resolution against a populated message.

use crate::error::PathError;
use crate::message::emit::{emit_cell, emit_component, emit_field, emit_segment};
use crate::message::{Message, Segment};
use crate::path::expr::{PathExpr, Terminal};
use crate::structure::GroupTree;

/// Resolve a path against a message, returning the serialized form at the
/// depth the path specifies.
///
/// A syntactically valid path that names a group, segment, or index absent
/// from this particular message returns `Ok(None)`. A message without a
/// populated tree (unsupported version or unknown type) can answer no path
/// and also returns `Ok(None)`.
pub fn resolve(message: &Message, path: &str) -> Result<Option<String>, PathError> {
    let expr = PathExpr::parse(path)?;

    let Ok(root) = message.structure() else {
        return Ok(None);
    };

    let mut scope: &GroupTree = root;
    for step in &expr.groups {
        let ordinal = step.ordinal.unwrap_or(1) as usize;
        match scope.child_groups(&step.name).nth(ordinal - 1) {
            Some(next) => scope = next,
            None => return Ok(None),
        }
    }

    let ordinal = expr.terminal.ordinal.unwrap_or(1) as usize;
    let Some(segment) = scope
        .segment_indices()
        .into_iter()
        .map(|i| &message.segments[i])
        .filter(|s| s.code == expr.terminal.code)
        .nth(ordinal - 1)
    else {
        return Ok(None);
    };

    Ok(drill(segment, &expr.terminal, message))
}

/// Drill from a located segment down to the depth the terminal specifies.
fn drill(segment: &Segment, terminal: &Terminal, message: &Message) -> Option<String> {
    let separators = &message.separators;

    let Some(field_index) = terminal.field else {
        return Some(emit_segment(segment, separators));
    };
    let field = segment.field(field_index)?;

    // The repetition default is the first cell, so `PID-3` and `PID-3(1)`
    // are the same value; only an explicit drill below the field narrows
    // further.
    if terminal.repetition.is_none() && terminal.component.is_none() {
        return Some(emit_field(field, separators));
    }
    let cell = field.cell(terminal.repetition.unwrap_or(1))?;

    let Some(component_index) = terminal.component else {
        return Some(emit_cell(cell, separators));
    };
    let component = cell.component(component_index)?;

    match terminal.subcomponent {
        None => Some(emit_component(&component, separators)),
        Some(index) => component.subcomponent(index).map(str::to_string),
    }
}
