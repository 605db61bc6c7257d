//! Configuration for the Daybook server.
//!
//! Settings come from the process environment, optionally seeded from a
//! `.env` file. Variables already present in the environment take precedence
//! over the file.
//!
//! ```no_run
//! use daybook_config::{AppConfig, load_dotenv};
//!
//! # fn main() -> daybook_config::Result<()> {
//! load_dotenv(".env")?;
//! let config = AppConfig::from_env()?;
//! println!("listening on {}", config.server_addr);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod env;
pub mod error;

pub use app::AppConfig;
pub use env::{EnvLoader, load_dotenv};
pub use error::{ConfigError, Result};
