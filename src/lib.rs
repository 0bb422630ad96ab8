pub mod core;
pub mod services;
pub mod token;
pub mod types;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use crate::core::client::{ApiClient, Body};
pub use crate::core::error::{ApiError, ConfigError, Error, ErrorBody};
pub use crate::core::session::{Session, SessionState, SessionStatus};
pub use crate::core::state::AppState;
pub use crate::token::claims::{ClaimSet, decode};
pub use crate::token::role::{ADMIN_ROLE, is_elevated};
pub use crate::token::store::{FileTokenStore, MemoryTokenStore, TOKEN_KEY, TokenStore};
pub use crate::types::request::{CreateProductRequest, ProductDraft};
pub use crate::types::response::{ApiErrorBody, Page, Product, TokenResponse};

use crate::core::cli::{self, Cli};
use crate::core::config::Args;

pub async fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    let config = Args::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_new(&config.log_level).unwrap_or_default())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let store = FileTokenStore::new(&config.storage_dir);
    tracing::debug!("using token slot at {}", store.path().display());

    let state = AppState::new(&config.base_url, &config.user_agent, store).await?;

    let output = cli::execute(&state, cli.command).await?;
    if !output.is_empty() {
        println!("{output}");
    }

    Ok(())
}
