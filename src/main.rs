use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use halteres::auth::{password, session};
use halteres::config::{Cli, Command, Config};
use halteres::db;
use halteres::db::users::{Roles, UserFields};
use halteres::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(config.db_path())?;
    db::run_migrations(&pool)?;

    if let Some(Command::CreateSuperuser {
        username,
        password: secret,
        email,
    }) = cli.command
    {
        let conn = pool.get()?;
        let fields = UserFields {
            username,
            email,
            ..UserFields::default()
        };
        let roles = Roles {
            is_staff: true,
            is_superuser: true,
        };
        let id = password::create_user(&conn, &fields, &secret, roles)?;
        tracing::info!(user_id = id, username = %fields.username, "superuser created");
        return Ok(());
    }

    {
        let conn = pool.get()?;
        let purged = session::purge_expired(&conn)?;
        if purged > 0 {
            tracing::info!("Purged {} expired sessions", purged);
        }
    }

    // Build app state
    let state = AppState {
        db: pool,
        config: config.clone(),
    };

    let app = halteres::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
