use anyhow::Result;
use email_template_editor::config::Config;
use email_template_editor::store::{Database, MemoryEntityManager};
use email_template_editor::web::{self, AppState, Store};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("email_template_editor=info".parse()?),
        )
        .init();

    info!("Starting email template editor");

    let config = Config::from_env()?;
    let in_memory = std::env::args().skip(1).any(|arg| arg == "--memory");

    let store = if in_memory {
        warn!("Running with the in-memory store, emails are lost on exit");
        Store::Memory(MemoryEntityManager::new())
    } else {
        Store::Postgres(Database::new(config.require_database_url()?).await?)
    };

    info!(
        "Default locale: {}, supported locales: {}",
        config.default_locale, config.supported_locales
    );
    if config.api_key.is_none() {
        warn!("API_KEY not set, the editor is open to any client");
    }

    let port = config.port;
    let app = web::router(AppState::new(config, store));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("✓ Listening on port {}", port);
    axum::serve(listener, app).await?;

    Ok(())
}
