use anyhow::Context;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config().database)
        .await
        .context("failed to connect to the database (is DATABASE_URL set?)")?;

    DatabaseManager::migrate(&pool).await.context("migration failed")?;
    pool.close().await;

    output_success(&output_format, "Migrations applied", None)
}
