// Core library for the Daybook web application
// Request and response types, the middleware pipeline, routing and the server loop

pub mod application;
pub mod context;
pub mod error;
pub mod form;
pub mod http;
pub mod logging;
pub mod middleware;
pub mod routing;
pub mod session;
pub mod status;

// Re-export commonly used types
pub use application::*;
pub use context::*;
pub use error::*;
pub use form::*;
pub use http::*;
pub use middleware::*;
pub use routing::{Route, Router};
pub use session::SessionMiddleware;
pub use status::*;

pub use daybook_session;
