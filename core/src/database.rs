/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::log::LevelFilter;

use super::types::*;

pub fn database_url(cli: &Cli) -> Result<String> {
    if let Some(file) = &cli.database_url_file {
        Ok(std::fs::read_to_string(file)
            .context("Failed to read database url from file")?
            .trim()
            .to_string())
    } else if let Some(url) = &cli.database_url {
        Ok(url.clone())
    } else {
        anyhow::bail!("No database url provided")
    }
}

pub async fn connect_db(cli: &Cli) -> Result<DatabaseConnection> {
    let mut opt = ConnectOptions::new(database_url(cli)?);

    // Only enable SQL logging at debug level
    if cli.log_level == "debug" {
        opt.sqlx_logging(true)
            .sqlx_logging_level(LevelFilter::Debug);
    } else {
        opt.sqlx_logging(false);
    }

    // Every ledger call waits at most this long for a connection
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(1800));

    let db = Database::connect(opt)
        .await
        .context("Failed to connect to database")?;
    Migrator::up(&db, None)
        .await
        .context("Failed to run database migrations")?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_database_url_prefers_file() {
        let path = std::env::temp_dir().join(format!("shipyard-db-url-{}", uuid::Uuid::new_v4()));
        std::fs::write(&path, "postgres://from-file/builds\n").unwrap();

        let cli = Cli::parse_from([
            "shipyard-server",
            "--database-url",
            "postgres://from-flag/builds",
            "--database-url-file",
            path.to_str().unwrap(),
        ]);

        assert_eq!(database_url(&cli).unwrap(), "postgres://from-file/builds");
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_database_url_missing() {
        let cli = Cli::parse_from(["shipyard-server"]);
        assert!(database_url(&cli).is_err());
    }
}
