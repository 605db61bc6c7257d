//! Daybook - a nutrition diary served over HTTP.
//!
//! Users sign up, sign in and record what they ate each day. Every page
//! except sign-up and sign-in requires an authenticated session; every
//! state-changing request must carry the session's CSRF token.
//!
//! The member crates are re-exported so the binary and integration tests
//! need a single dependency.
//!
//! ```no_run
//! use daybook::App;
//! use daybook::daybook_config::AppConfig;
//! use daybook::daybook_core::Application;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), daybook::daybook_core::Error> {
//! let config = AppConfig::default();
//! let entry = App::in_memory(&config).routes();
//! Application::new(entry).listen(&config.server_addr).await
//! # }
//! ```

pub mod forms;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod static_files;
pub mod templates;

pub use routes::App;

// Re-export member crates
pub use daybook_auth;
pub use daybook_config;
pub use daybook_core;
pub use daybook_csrf;
pub use daybook_session;
pub use daybook_validation;
