use serde::{Deserialize, Serialize};

use crate::sort::SortDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFn {
    Count,
    Sum,
    Max,
    Min,
    Average,
}

impl AggregateFn {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "max" => Some(Self::Max),
            "min" => Some(Self::Min),
            "average" | "avg" => Some(Self::Average),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Max => "max",
            Self::Min => "min",
            Self::Average => "average",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub field: String,
    pub function: AggregateFn,
}

impl Aggregate {
    /// Stable envelope key, e.g. `sum__Price`.
    pub fn key(&self) -> String {
        format!("{}__{}", self.function.as_str(), self.field)
    }
}

/// A grouping key. Groups scope aggregate computation; they do not
/// restructure output rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub field: String,
    pub direction: SortDirection,
    #[serde(default)]
    pub aggregates: Vec<Aggregate>,
}
