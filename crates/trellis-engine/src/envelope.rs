use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::Value;

/// The paged result handed back to the grid: the converted rows, the total
/// count of the filtered (pre-paging) set, and any requested aggregates
/// keyed `"{function}__{field}"` (e.g. `sum__Price`). Serializes directly as
/// the response body shape the grid binds to.
#[derive(Debug, Clone, Serialize)]
pub struct ResultEnvelope<V> {
    pub data: Vec<V>,
    pub total: u64,
    pub aggregates: BTreeMap<String, Value>,
}
