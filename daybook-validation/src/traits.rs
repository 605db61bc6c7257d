// Validation traits

use crate::Validation;

/// Capability shared by every form that can be checked.
///
/// A form owns a [`Validation`] and exposes it; the provided methods forward
/// to it so handlers can write `form.check_field(..)` directly.
pub trait Validatable {
    fn validation(&self) -> &Validation;

    fn validation_mut(&mut self) -> &mut Validation;

    fn check_field(&mut self, ok: bool, field: &str, message: &str) {
        self.validation_mut().check_field(ok, field, message);
    }

    fn add_field_error(&mut self, field: &str, message: &str) {
        self.validation_mut().add_field_error(field, message);
    }

    fn add_non_field_error(&mut self, message: &str) {
        self.validation_mut().add_non_field_error(message);
    }

    fn valid(&self) -> bool {
        self.validation().valid()
    }

    fn has_field_errors(&self) -> bool {
        self.validation().has_field_errors()
    }

    fn has_non_field_errors(&self) -> bool {
        self.validation().has_non_field_errors()
    }
}
