use std::time::Duration;

use anyhow::Context;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

pub static MIGRATOR: Migrator = sqlx::migrate!();

pub async fn init() -> anyhow::Result<SqlitePool> {
	let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
	let pool = connect(&database_url).await?;

	MIGRATOR.run(&pool).await.context("failed to run migrations")?;

	Ok(pool)
}

/// Opens a pool with foreign keys on, creating the database file if needed.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
	let options = database_url
		.parse::<SqliteConnectOptions>()
		.with_context(|| format!("invalid DATABASE_URL '{database_url}'"))?
		.create_if_missing(true)
		.foreign_keys(true);

	SqlitePoolOptions::new()
		.max_connections(10)
		.min_connections(1)
		.acquire_timeout(Duration::from_secs(10))
		.connect_with(options)
		.await
		.context("failed to connect to database")
}
