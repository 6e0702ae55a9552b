use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Neq,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
    Gte,
    Gt,
    Lte,
    Lt,
}

impl Operator {
    /// Parse a wire spelling. Accepts the short forms the grid sends by
    /// default plus the verbose aliases older grid versions emit.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eq" | "equal" | "equals" | "isequalto" => Some(Self::Eq),
            "neq" | "ne" | "notequal" | "notequals" | "isnotequalto" => Some(Self::Neq),
            "contains" | "substringof" => Some(Self::Contains),
            "doesnotcontain" | "notsubstringof" => Some(Self::DoesNotContain),
            "startswith" => Some(Self::StartsWith),
            "endswith" => Some(Self::EndsWith),
            "gte" | "greaterthanorequal" | "isgreaterthanorequalto" => Some(Self::Gte),
            "gt" | "greaterthan" | "isgreaterthan" => Some(Self::Gt),
            "lte" | "lessthanorequal" | "islessthanorequalto" => Some(Self::Lte),
            "lt" | "lessthan" | "islessthan" => Some(Self::Lt),
            _ => None,
        }
    }
}
