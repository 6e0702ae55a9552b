use crate::schema::Schema;
use crate::value::Value;

/// Typed field access for the entity side of the pipeline.
///
/// `value` is called with canonical schema paths only (the engine resolves
/// client spellings first), so implementations match on exact paths and
/// return `Value::Null` for anything unknown.
pub trait Record {
    fn schema() -> &'static Schema;
    fn value(&self, path: &str) -> Value;
}
