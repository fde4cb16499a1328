use std::sync::Arc;

use anyhow::Context;
use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::DatabaseManager;
use crate::reviews::{PgReviewRepository, ReviewService};

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Connect to the configured database and wrap it in a review service
pub async fn connect_service() -> anyhow::Result<ReviewService> {
    let pool = DatabaseManager::connect(&config().database)
        .await
        .context("failed to connect to the database (is DATABASE_URL set?)")?;
    Ok(ReviewService::new(Arc::new(PgReviewRepository::new(pool))))
}
