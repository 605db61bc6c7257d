// Error accumulation for submitted forms

use serde::Serialize;
use std::collections::HashMap;

/// Errors collected while checking one submitted form.
///
/// Each field keeps the first message recorded for it; later failures on the
/// same field are ignored so the message a user sees does not depend on how
/// many rules failed. Non-field errors accumulate in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Validation {
    field_errors: HashMap<String, String>,
    non_field_errors: Vec<String>,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no error of either kind has been recorded.
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    /// Record `message` for `field` unless the field already has an error.
    pub fn add_field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.field_errors
            .entry(field.into())
            .or_insert_with(|| message.into());
    }

    /// Record an error about the submission as a whole.
    pub fn add_non_field_error(&mut self, message: impl Into<String>) {
        self.non_field_errors.push(message.into());
    }

    /// Record `message` for `field` when `ok` is false.
    pub fn check_field(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_field_error(field, message);
        }
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors.get(field).map(String::as_str)
    }

    pub fn field_errors(&self) -> &HashMap<String, String> {
        &self.field_errors
    }

    pub fn non_field_errors(&self) -> &[String] {
        &self.non_field_errors
    }

    pub fn has_field_errors(&self) -> bool {
        !self.field_errors.is_empty()
    }

    pub fn has_non_field_errors(&self) -> bool {
        !self.non_field_errors.is_empty()
    }
}
