use serde::Serialize;

/// A condition the leniency policy dropped from the request: an
/// unresolvable field, an operator or aggregate the field's kind does not
/// support, or an uncoercible literal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub field: String,
    pub detail: String,
}

/// Collects the conditions silently excluded while serving a request.
///
/// Default result behavior is unchanged by diagnostics; each warning is also
/// emitted through `tracing::warn!` as it is recorded, so hosts with a
/// subscriber installed see drops without opting in.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub(crate) fn warn(&mut self, field: &str, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::warn!(field, %detail, "grid condition dropped");
        self.warnings.push(Warning {
            field: field.to_string(),
            detail,
        });
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}
