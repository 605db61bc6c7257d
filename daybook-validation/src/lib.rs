//! Form validation for Daybook
//!
//! Rules are plain predicates; a [`Validation`] embedded in each form collects
//! the messages of the rules that failed.
//!
//! # Examples
//!
//! ```
//! use daybook_validation::*;
//!
//! #[derive(Default)]
//! struct SignupForm {
//!     email: String,
//!     password: String,
//!     validation: Validation,
//! }
//!
//! impl Validatable for SignupForm {
//!     fn validation(&self) -> &Validation {
//!         &self.validation
//!     }
//!
//!     fn validation_mut(&mut self) -> &mut Validation {
//!         &mut self.validation
//!     }
//! }
//!
//! let mut form = SignupForm {
//!     email: "not-an-email".to_string(),
//!     password: "short".to_string(),
//!     ..Default::default()
//! };
//!
//! let email_ok = matches(&form.email, &EMAIL_RX);
//! form.check_field(email_ok, "email", "This field must be a valid email address");
//! let password_ok = min_chars(&form.password, 8);
//! form.check_field(password_ok, "password", "This field must be at least 8 characters long");
//!
//! assert!(!form.valid());
//! assert_eq!(form.validation().field_errors().len(), 2);
//! ```

pub mod rules;
pub mod traits;
pub mod validation;

pub use rules::*;
pub use traits::Validatable;
pub use validation::Validation;
