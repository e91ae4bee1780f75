use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use closet::config::{DatabaseSettings, Settings};
use closet::mysql::MySqlStore;
use closet::server;
use closet::sqlite::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("closet=debug".parse()?))
        .init();

    if let Err(err) = dotenv {
        if !err.not_found() {
            warn!("Ignoring unreadable .env file: {}", err);
        }
    }

    info!("Starting closet backend");

    let settings = Settings::from_env().context("invalid configuration")?;

    let app = match &settings.database {
        DatabaseSettings::MySql(mysql) => {
            let store = MySqlStore::connect(mysql)
                .await
                .with_context(|| {
                    format!(
                        "setting up MySQL database '{}' at {}:{}",
                        mysql.database, mysql.host, mysql.port
                    )
                })?;
            server::app(Arc::new(store))
        }
        DatabaseSettings::Sqlite { url } => {
            let store = SqliteStore::open(url)
                .await
                .with_context(|| format!("opening SQLite database {url}"))?;
            server::app(Arc::new(store))
        }
    };

    server::serve(app, settings.port).await
}
