mod diagnostics;
mod engine;
mod envelope;
mod error;
mod mapping;
mod predicate;
mod record;
mod schema;
mod source;
mod value;

#[cfg(test)]
mod tests;

pub use diagnostics::{Diagnostics, Warning};
pub use engine::{GridEngine, GridResult};
pub use envelope::ResultEnvelope;
pub use error::EngineError;
pub use mapping::{FieldSource, MappingProfile};
pub use record::Record;
pub use schema::{FieldDef, FieldKind, Schema, SchemaBuilder};
pub use source::DataSource;
#[cfg(feature = "memory")]
pub use source::MemorySource;
pub use value::Value;
