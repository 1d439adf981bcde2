use dotenvy::dotenv;
use grant_ledger::{
    config::{database, settings},
    errors::{Error, Result},
    identity::IdentityClient,
    server::{self, AppState},
};
use std::{env, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = settings::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {e}"))?;

    // 4. Connect and create tables
    let database_url = database::get_database_url();
    if let Some(dir) = database_url
        .strip_prefix("sqlite://")
        .and_then(|rest| Path::new(rest.split('?').next().unwrap_or(rest)).parent())
        .filter(|dir| !dir.as_os_str().is_empty())
    {
        std::fs::create_dir_all(dir)?;
    }
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 5. Identity provider client; the service key is read directly before use
    let service_key = env::var(settings::SERVICE_ROLE_KEY_VAR)
        .inspect_err(|e| error!("{} not found: {e}", settings::SERVICE_ROLE_KEY_VAR))
        .map_err(Error::EnvVar)?;
    let identity = IdentityClient::new(&app_config.identity, service_key)?;

    // 6. Serve the admin functions
    let listener = TcpListener::bind(&app_config.server.bind_address).await?;
    server::serve(
        listener,
        AppState {
            db: Arc::new(db),
            identity: Arc::new(identity),
            redirect_to: app_config.links.redirect_to,
        },
    )
    .await
}
