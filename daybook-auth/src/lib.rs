//! Session-based authentication for Daybook.
//!
//! - [`Authenticate`] resolves who the request belongs to, once, from the
//!   session marker and an [`IdentityStore`].
//! - [`RequireAuthentication`] gates protected routes behind it.
//! - [`login`] and [`logout`] move a session between the anonymous and
//!   signed-in states, renewing the session token on each transition.
//! - [`PasswordHasher`] hashes and verifies passwords with bcrypt.
//!
//! # Examples
//!
//! ```
//! use daybook_auth::{PasswordHasher, PasswordVerifier};
//!
//! let hasher = PasswordHasher::new(4);
//! let hash = hasher.hash("correct horse").unwrap();
//! assert!(hasher.verify("correct horse", &hash).unwrap());
//! ```

pub mod error;
pub mod middleware;
pub mod password;
pub mod session;
pub mod store;

pub use error::{AuthError, Result};
pub use middleware::{Authenticate, RequireAuthentication};
pub use password::{PasswordHasher, PasswordVerifier};
pub use session::{DEFAULT_LANDING, login, logout, remember_destination, user_id};
pub use store::IdentityStore;
