//! # Daybook CSRF Protection
//!
//! Synchronizer-token CSRF protection bound to the server-side session.
//!
//! The real token is kept in the session. Pages embed a masked copy that
//! changes on every response; forms send it back in the `csrf_token` field
//! (or the `X-CSRF-Token` header) and the middleware unmasks and compares it
//! in constant time.
//!
//! ## Token Handling
//!
//! ```rust
//! use daybook_csrf::CsrfToken;
//!
//! let token = CsrfToken::generate();
//! let rendered = token.masked();
//!
//! assert_ne!(rendered, token.masked());
//! assert!(token.verify(&rendered));
//! assert!(!CsrfToken::generate().verify(&rendered));
//! ```
//!
//! ## Middleware
//!
//! ```rust
//! use daybook_csrf::{CsrfConfig, CsrfMiddleware};
//!
//! let csrf = CsrfMiddleware::new(
//!     CsrfConfig::default().with_exclude_paths(vec!["/webhooks".to_string()]),
//! );
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod token;

pub use config::CsrfConfig;
pub use error::{CsrfError, Result};
pub use middleware::CsrfMiddleware;
pub use token::CsrfToken;
