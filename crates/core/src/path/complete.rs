//! Path completion: enumerating the concrete paths of a populated message.
//!
//! Useful for interactive tooling — a caller types `/PATIENT_RESULT/OR`
//! and gets the reachable continuations. The full enumeration is built by
//! one tree walk and cached on the message.

use std::collections::HashMap;

use crate::message::Message;
use crate::structure::{GroupTree, TreeItem};

/// Enumerate every concrete path reachable in the populated tree.
///
/// Repeated sibling names carry their 1-based ordinal; unique names appear
/// bare, matching how the resolver defaults omitted ordinals. Terminals are
/// emitted at segment depth and at every populated field, repetition,
/// component, and subcomponent depth.
pub(crate) fn enumerate_paths(message: &Message) -> Vec<String> {
    let Ok(root) = message.structure() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    walk(root, "", message, &mut out);
    out
}

fn walk(group: &GroupTree, prefix: &str, message: &Message, out: &mut Vec<String>) {
    // Count sibling occurrences so only repeated names get ordinals.
    let mut totals: HashMap<&str, u32> = HashMap::new();
    for item in &group.children {
        *totals.entry(item_name(item, message)).or_default() += 1;
    }

    let mut seen: HashMap<&str, u32> = HashMap::new();
    for item in &group.children {
        let name = item_name(item, message);
        let nth = seen.entry(name).and_modify(|n| *n += 1).or_insert(1);
        let token = if totals[name] > 1 {
            format!("{name}({nth})")
        } else {
            name.to_string()
        };
        let path = format!("{prefix}/{token}");

        match item {
            TreeItem::Group(sub) => {
                out.push(path.clone());
                walk(sub, &path, message, out);
            }
            TreeItem::Segment(index) => {
                out.push(path.clone());
                push_field_paths(&message.segments[*index], &path, out);
            }
        }
    }
}

fn item_name<'a>(item: &'a TreeItem, message: &'a Message) -> &'a str {
    match item {
        TreeItem::Group(g) => &g.name,
        TreeItem::Segment(i) => &message.segments[*i].code,
    }
}

fn push_field_paths(
    segment: &crate::message::Segment,
    base: &str,
    out: &mut Vec<String>,
) {
    use crate::message::{Cell, Component};

    for (&index, field) in &segment.fields {
        let field_path = format!("{base}-{index}");
        out.push(field_path.clone());

        let multi_rep = field.cells.len() > 1;
        for (r, cell) in field.cells.iter().enumerate() {
            let rep_path = if multi_rep {
                let p = format!("{base}-{index}({})", r + 1);
                out.push(p.clone());
                p
            } else {
                field_path.clone()
            };
            if let Cell::Components(parts) = cell {
                for (c, part) in parts.iter().enumerate() {
                    let comp_path = format!("{rep_path}-{}", c + 1);
                    out.push(comp_path.clone());
                    if let Component::Subcomponents(subs) = part {
                        for s in 1..=subs.len() {
                            out.push(format!("{comp_path}-{s}"));
                        }
                    }
                }
            }
        }
    }
}

/// Complete a path prefix against a message.
///
/// The prefix is split at its last `/`; everything before it must match a
/// concrete path exactly, and the candidates returned are the distinct
/// continuations whose token at that depth starts with the trailing
/// fragment.
pub fn complete(message: &Message, prefix: &str) -> Vec<String> {
    let (dir, fragment) = match prefix.rsplit_once('/') {
        Some((dir, fragment)) => (dir, fragment),
        None => ("", prefix),
    };

    let mut candidates: Vec<String> = Vec::new();
    for path in message.paths() {
        let Some(rest) = path.strip_prefix(dir) else {
            continue;
        };
        let Some(rest) = rest.strip_prefix('/') else {
            continue;
        };
        let token = rest.split('/').next().unwrap_or_default();
        if !token.starts_with(fragment) {
            continue;
        }
        let candidate = format!("{dir}/{token}");
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}
