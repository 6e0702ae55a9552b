use serde::{Deserialize, Serialize};

/// Semantic kind of a declared field, used for filter-literal coercion and
/// aggregate support checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Int,
    Float,
    Bool,
    Date,
}

impl FieldKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Dot-separated for nested access (`customer.name`).
    pub path: String,
    pub kind: FieldKind,
}

/// A static, declared map from field path to kind. Built once at startup and
/// consulted at request time; client-supplied field names resolve against it
/// case-insensitively (grids send camelCase for PascalCase entity fields).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder { fields: Vec::new() }
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Resolve a client field name to its canonical declared path and kind.
    pub fn resolve(&self, field: &str) -> Option<(&str, FieldKind)> {
        self.fields
            .iter()
            .find(|f| f.path.eq_ignore_ascii_case(field))
            .map(|f| (f.path.as_str(), f.kind))
    }

    pub fn kind_of(&self, field: &str) -> Option<FieldKind> {
        self.resolve(field).map(|(_, kind)| kind)
    }
}

pub struct SchemaBuilder {
    fields: Vec<FieldDef>,
}

impl SchemaBuilder {
    pub fn field(mut self, path: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef {
            path: path.into(),
            kind,
        });
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_case_insensitive() {
        let schema = Schema::builder()
            .field("FamilyName", FieldKind::String)
            .field("Employer.Name", FieldKind::String)
            .build();
        assert_eq!(
            schema.resolve("familyName"),
            Some(("FamilyName", FieldKind::String))
        );
        assert_eq!(
            schema.resolve("employer.name"),
            Some(("Employer.Name", FieldKind::String))
        );
        assert_eq!(schema.resolve("missing"), None);
    }
}
