//! Daybook server.
//!
//! Settings come from the environment and an optional `.env` file; see
//! [`daybook_config::AppConfig`] for the variables.

use clap::Parser;
use daybook::App;
use daybook_config::{AppConfig, ConfigError, load_dotenv};
use daybook_core::Application;
use daybook_core::logging::{LogConfig, error, info, warn};
use daybook_session::{MemorySessionStore, SessionError, SessionStore};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Daybook - nutrition diary web server
#[derive(Parser)]
#[command(name = "daybook")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "Nutrition diary web server")]
struct Cli {
    /// Address to listen on, overrides SERVER_ADDR
    #[arg(short, long)]
    addr: Option<String>,

    /// Environment file to read before the process environment
    #[arg(long, env = "ENV_PATH", default_value = ".env")]
    env_file: String,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("session store: {0}")]
    Session(#[from] SessionError),

    #[error(transparent)]
    Server(#[from] daybook_core::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("daybook: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), StartupError> {
    let env_loaded = load_dotenv(&cli.env_file)?;

    let mut config = AppConfig::from_env()?;
    if let Some(addr) = cli.addr {
        config.server_addr = addr;
    }

    let _guard = LogConfig::new()
        .level(config.log_level)
        .format(config.log_format)
        .init()?;

    info!(
        env_file = %cli.env_file,
        env_loaded,
        addr = %config.server_addr,
        cookie_secure = config.cookie_secure,
        "configuration loaded"
    );
    if !config.cookie_secure {
        warn!("session cookies will be sent over plain HTTP");
    }

    let sessions = session_store(&config).await?;
    spawn_session_cleanup(sessions.clone());

    let entry = App::with_session_store(&config, sessions).routes();
    Application::new(entry).listen(&config.server_addr).await?;

    info!("server stopped");
    Ok(())
}

#[cfg(feature = "redis")]
async fn session_store(config: &AppConfig) -> Result<Arc<dyn SessionStore>, StartupError> {
    use daybook_session::{RedisSessionStore, SessionConfig};

    match &config.redis_url {
        Some(url) => {
            let store = RedisSessionStore::new(SessionConfig::redis(url)?).await?;
            info!("sessions stored in Redis");
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemorySessionStore::new())),
    }
}

#[cfg(not(feature = "redis"))]
async fn session_store(config: &AppConfig) -> Result<Arc<dyn SessionStore>, StartupError> {
    if config.redis_url.is_some() {
        warn!("REDIS_URL is set but this build has no Redis support, keeping sessions in memory");
    }
    Ok(Arc::new(MemorySessionStore::new()))
}

fn spawn_session_cleanup(sessions: Arc<dyn SessionStore>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
        loop {
            ticker.tick().await;
            match sessions.cleanup_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "expired sessions removed"),
                Err(err) => error!(error = %err, "session cleanup failed"),
            }
        }
    });
}
