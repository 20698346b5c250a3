//! Path expression parsing and structural validation.
//!
//! A path is `/`-separated: zero or more group steps (`NAME` or `NAME(n)`)
//! followed by a terminal
//! `CODE[(n)][-field[(rep)][-component[-subcomponent]]]`. All ordinals are
//! 1-based. The whole expression is validated before any tree walk, so a
//! malformed path is a [`PathError`] and never a silent lookup miss.

use crate::error::PathError;

/// One non-terminal step: a group name with an optional repetition ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStep {
    /// Group name (e.g., `"PATIENT_RESULT"`).
    pub name: String,
    /// 1-based ordinal among same-named sibling groups; first match when
    /// omitted.
    pub ordinal: Option<u32>,
}

/// The terminal step: a segment code with optional drill-down indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    /// 3-letter segment code.
    pub code: String,
    /// 1-based occurrence of the code within the scope; first when omitted.
    pub ordinal: Option<u32>,
    /// 1-based field index.
    pub field: Option<u32>,
    /// 1-based cell repetition within the field; defaults to the first.
    pub repetition: Option<u32>,
    /// 1-based component index.
    pub component: Option<u32>,
    /// 1-based subcomponent index.
    pub subcomponent: Option<u32>,
}

/// A validated path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    /// Non-terminal group steps, outermost first.
    pub groups: Vec<GroupStep>,
    /// The terminal segment step.
    pub terminal: Terminal,
}

impl PathExpr {
    /// Validate and parse a path string.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let body = path.strip_prefix('/').unwrap_or(path);
        if body.is_empty() {
            return Err(PathError::Syntax(format!("empty path: {path:?}")));
        }

        let tokens: Vec<&str> = body.split('/').collect();
        let (terminal_token, group_tokens) = tokens.split_last().unwrap();

        let groups = group_tokens
            .iter()
            .map(|t| parse_group_step(t))
            .collect::<Result<Vec<_>, _>>()?;
        let terminal = parse_terminal(terminal_token)?;

        Ok(Self { groups, terminal })
    }
}

/// `NAME` or `NAME(n)` with NAME = uppercase letter then uppercase
/// alphanumerics/underscores.
fn parse_group_step(token: &str) -> Result<GroupStep, PathError> {
    let (name, ordinal) = split_ordinal(token)?;
    if !is_group_name(name) {
        return Err(PathError::Syntax(format!("invalid group name: {token:?}")));
    }
    Ok(GroupStep {
        name: name.to_string(),
        ordinal,
    })
}

fn parse_terminal(token: &str) -> Result<Terminal, PathError> {
    let mut parts = token.split('-');
    let head = parts.next().unwrap_or_default();
    let (code, ordinal) = split_ordinal(head)?;
    if !is_segment_code(code) {
        return Err(PathError::Syntax(format!("invalid segment code: {token:?}")));
    }

    let mut terminal = Terminal {
        code: code.to_string(),
        ordinal,
        field: None,
        repetition: None,
        component: None,
        subcomponent: None,
    };

    if let Some(field_part) = parts.next() {
        let (digits, repetition) = split_ordinal(field_part)?;
        terminal.field = Some(parse_index(digits, token)?);
        terminal.repetition = repetition;
    }
    if let Some(component) = parts.next() {
        terminal.component = Some(parse_index(component, token)?);
    }
    if let Some(subcomponent) = parts.next() {
        terminal.subcomponent = Some(parse_index(subcomponent, token)?);
    }
    if parts.next().is_some() {
        return Err(PathError::Syntax(format!(
            "too many index levels in terminal: {token:?}"
        )));
    }

    Ok(terminal)
}

/// Split an optional trailing `(n)` ordinal off a token.
fn split_ordinal(token: &str) -> Result<(&str, Option<u32>), PathError> {
    let Some(open) = token.find('(') else {
        return Ok((token, None));
    };
    let Some(digits) = token[open..]
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        return Err(PathError::Syntax(format!(
            "unterminated ordinal in {token:?}"
        )));
    };
    Ok((&token[..open], Some(parse_index(digits, token)?)))
}

fn parse_index(digits: &str, context: &str) -> Result<u32, PathError> {
    match digits.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(PathError::Syntax(format!(
            "expected 1-based index, got {digits:?} in {context:?}"
        ))),
    }
}

fn is_group_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn is_segment_code(code: &str) -> bool {
    code.len() == 3
        && code.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_path_parses() {
        let expr =
            PathExpr::parse("/PATIENT_RESULT/ORDER_OBSERVATION/OBSERVATION(2)/OBX-7").unwrap();
        assert_eq!(expr.groups.len(), 3);
        assert_eq!(expr.groups[0].name, "PATIENT_RESULT");
        assert_eq!(expr.groups[2].ordinal, Some(2));
        assert_eq!(expr.terminal.code, "OBX");
        assert_eq!(expr.terminal.field, Some(7));
    }

    #[test]
    fn terminal_with_all_levels() {
        let expr = PathExpr::parse("PID-3(2)-1-2").unwrap();
        let t = &expr.terminal;
        assert_eq!(t.code, "PID");
        assert_eq!(t.field, Some(3));
        assert_eq!(t.repetition, Some(2));
        assert_eq!(t.component, Some(1));
        assert_eq!(t.subcomponent, Some(2));
    }

    #[test]
    fn bare_segment_code() {
        let expr = PathExpr::parse("PV1").unwrap();
        assert!(expr.groups.is_empty());
        assert_eq!(expr.terminal.code, "PV1");
        assert!(expr.terminal.field.is_none());
    }

    #[test]
    fn terminal_ordinal() {
        let expr = PathExpr::parse("OBX(3)-5").unwrap();
        assert_eq!(expr.terminal.ordinal, Some(3));
        assert_eq!(expr.terminal.field, Some(5));
    }

    #[test]
    fn invalid_paths_are_syntax_errors() {
        for bad in [
            "",
            "/",
            "random",
            "PID-",
            "PID-0",
            "PID-3-2-1-1",
            "pid-3",
            "PID(",
            "PID(x)",
            "//PID",
            "lower/PID",
            "PID-3(0)",
        ] {
            assert!(
                matches!(PathExpr::parse(bad), Err(PathError::Syntax(_))),
                "expected syntax error for {bad:?}"
            );
        }
    }
}
