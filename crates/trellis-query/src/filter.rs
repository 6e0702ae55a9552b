use serde::{Deserialize, Serialize};

use crate::operator::Operator;

/// A single field/operator/value condition.
///
/// `value` is always the canonical string form of the wire literal; the
/// engine coerces it against the field's declared kind. `ignore_case` is
/// carried through from the wire but string comparison is case-insensitive
/// regardless of its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: Operator,
    pub value: String,
    pub ignore_case: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("or") {
            Self::Or
        } else {
            Self::And
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterNode {
    Condition(Filter),
    Group(FilterGroup),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub logic: LogicalOp,
    pub children: Vec<FilterNode>,
}
