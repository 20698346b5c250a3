//! Grammar population: binding a flat segment sequence onto a version's
//! grammar template.
//!
//! The walk is depth-first and cursor-based, strictly in template
//! declaration order, and intentionally lenient: a sequence that does not
//! conform to the grammar produces a best-effort partial tree instead of an
//! error. Strict conformance checking is a separate concern and is not
//! performed here — real-world non-compliant messages are expected input.

use serde::{Deserialize, Serialize};

use hl7_toolkit_spec_tables::{GroupTemplate, TemplateItem, VersionTables};

use crate::message::Segment;

/// A populated grammar group: a structural clone of the template holding
/// the matched data.
///
/// Segment nodes carry indices into the owning message's segment list
/// rather than references, so the tree never shares or back-references
/// message data. Repeated groups appear as consecutive siblings with the
/// same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTree {
    /// Group name, equal to the template's (the root carries the structure
    /// name, e.g. `"ORU_R01"`).
    pub name: String,
    /// Matched children in template order.
    pub children: Vec<TreeItem>,
}

/// One node of a populated tree: a subgroup or a matched segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeItem {
    /// A populated subgroup.
    Group(GroupTree),
    /// Index of a matched segment in the owning message's segment list.
    Segment(usize),
}

impl GroupTree {
    /// Child groups with the given name, in match order.
    pub fn child_groups<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a GroupTree> {
        self.children.iter().filter_map(move |item| match item {
            TreeItem::Group(g) if g.name == name => Some(g),
            _ => None,
        })
    }

    /// All segment indices in this subtree, depth-first.
    pub fn segment_indices(&self) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_segments(&mut out);
        out
    }

    fn collect_segments(&self, out: &mut Vec<usize>) {
        for item in &self.children {
            match item {
                TreeItem::Segment(i) => out.push(*i),
                TreeItem::Group(g) => g.collect_segments(out),
            }
        }
    }
}

/// Populate a grammar template against a segment sequence.
///
/// Deterministic: the same template and sequence always produce the same
/// tree. Segments the template cannot account for at the cursor position
/// are simply left out of the tree.
pub fn populate(template: &GroupTemplate, segments: &[Segment]) -> GroupTree {
    let (tree, _) = populate_at(template, segments, 0);
    tree
}

/// Populate one group starting at `cursor`, returning the populated clone
/// and the advanced cursor.
fn populate_at(
    template: &GroupTemplate,
    segments: &[Segment],
    mut cursor: usize,
) -> (GroupTree, usize) {
    let mut children = Vec::new();

    for item in &template.items {
        match item {
            TemplateItem::Segment { code, max, .. } => {
                // Consume consecutive same-code segments up to max-occurs.
                let mut taken = 0u32;
                while cursor < segments.len()
                    && segments[cursor].code == *code
                    && max.is_none_or(|m| taken < m)
                {
                    children.push(TreeItem::Segment(cursor));
                    cursor += 1;
                    taken += 1;
                }
            }
            TemplateItem::Group(group) => {
                // Repeat a fresh clone as a sibling while the group keeps
                // matching, up to max-occurs.
                let mut taken = 0u32;
                while group.max.is_none_or(|m| taken < m) {
                    let (sub, next) = populate_at(group, segments, cursor);
                    if next == cursor {
                        break;
                    }
                    children.push(TreeItem::Group(sub));
                    cursor = next;
                    taken += 1;
                }
            }
        }
    }

    (
        GroupTree {
            name: template.name.clone(),
            children,
        },
        cursor,
    )
}

/// Copy per-segment-code field metadata from the version tables onto every
/// present field of every segment whose code the tables describe.
pub fn annotate(segments: &mut [Segment], tables: &VersionTables) {
    for segment in segments {
        let Some(specs) = tables.segment_fields(&segment.code) else {
            continue;
        };
        for spec in specs {
            if let Some(field) = segment.fields.get_mut(&spec.index) {
                field.meta = Some(spec.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl7_toolkit_spec_tables::Registry;

    fn segs(codes: &[&str]) -> Vec<Segment> {
        codes.iter().map(|c| Segment::new(*c)).collect()
    }

    fn ack_template() -> GroupTemplate {
        let registry = Registry::load_embedded();
        registry
            .tables_for("2.5")
            .unwrap()
            .message_type("ACK")
            .unwrap()
            .structure
            .clone()
    }

    #[test]
    fn plain_ack_population() {
        let template = ack_template();
        let tree = populate(&template, &segs(&["MSH", "MSA"]));
        assert_eq!(tree.name, "ACK");
        assert_eq!(tree.segment_indices(), vec![0, 1]);
    }

    #[test]
    fn repeated_err_segments_consumed_consecutively() {
        let template = ack_template();
        let tree = populate(&template, &segs(&["MSH", "MSA", "ERR", "ERR", "ERR"]));
        assert_eq!(tree.segment_indices(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn unexpected_segment_is_left_out() {
        let template = ack_template();
        // ZZZ does not appear anywhere in the ACK grammar: population stops
        // consuming there but still yields the tree for what matched.
        let tree = populate(&template, &segs(&["MSH", "MSA", "ZZZ", "ERR"]));
        assert_eq!(tree.segment_indices(), vec![0, 1]);
    }

    #[test]
    fn population_is_deterministic() {
        let template = ack_template();
        let segments = segs(&["MSH", "MSA", "ERR"]);
        let a = populate(&template, &segments);
        let b = populate(&template, &segments);
        assert_eq!(a, b);
    }

    #[test]
    fn finite_max_occurs_is_respected() {
        let template = GroupTemplate {
            name: "T".to_string(),
            min: 1,
            max: Some(1),
            items: vec![TemplateItem::Segment {
                code: "NTE".to_string(),
                min: 0,
                max: Some(2),
            }],
        };
        let tree = populate(&template, &segs(&["NTE", "NTE", "NTE"]));
        assert_eq!(tree.segment_indices(), vec![0, 1]);
    }

    #[test]
    fn repeated_groups_become_siblings() {
        let registry = Registry::load_embedded();
        let template = registry
            .tables_for("2.5")
            .unwrap()
            .message_type("ORU_R01")
            .unwrap()
            .structure
            .clone();
        let tree = populate(
            &template,
            &segs(&["MSH", "PID", "OBR", "OBX", "OBX", "OBR", "OBX"]),
        );
        let pr: Vec<_> = tree.child_groups("PATIENT_RESULT").collect();
        assert_eq!(pr.len(), 1);
        let orders: Vec<_> = pr[0].child_groups("ORDER_OBSERVATION").collect();
        assert_eq!(orders.len(), 2);
        let obs_first: Vec<_> = orders[0].child_groups("OBSERVATION").collect();
        assert_eq!(obs_first.len(), 2);
        let obs_second: Vec<_> = orders[1].child_groups("OBSERVATION").collect();
        assert_eq!(obs_second.len(), 1);
    }

    #[test]
    fn annotate_binds_field_metadata() {
        let registry = Registry::load_embedded();
        let tables = registry.tables_for("2.5").unwrap();
        let mut segments =
            vec![crate::message::parse::parse_segment("PID|1||123456").unwrap()];
        annotate(&mut segments, tables);
        let meta = segments[0].field(3).unwrap().meta.as_ref().unwrap();
        assert_eq!(meta.name, "Patient Identifier List");
        assert_eq!(meta.datatype, "CX");
        assert!(segments[0].field(1).unwrap().meta.is_some());
    }
}
