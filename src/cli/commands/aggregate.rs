use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::{connect_service, output_success};
use crate::cli::OutputFormat;
use crate::reviews::DeveloperAggregate;

#[derive(Subcommand)]
pub enum AggregateCommands {
    #[command(about = "Show the stored aggregate of a developer")]
    Show {
        #[arg(help = "Developer id")]
        developer_id: i32,
    },

    #[command(about = "Recompute one developer's aggregate from its reviews")]
    Recompute {
        #[arg(help = "Developer id")]
        developer_id: i32,
    },

    #[command(about = "Recompute every developer and report drifted aggregates")]
    Reconcile,
}

pub async fn handle(cmd: AggregateCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let service = connect_service().await?;

    match cmd {
        AggregateCommands::Show { developer_id } => {
            let aggregate = service.aggregate(developer_id).await?;
            print_aggregate(&output_format, "Stored aggregate", &aggregate)
        }
        AggregateCommands::Recompute { developer_id } => {
            let aggregate = service.recompute(developer_id).await?;
            print_aggregate(&output_format, "Aggregate recomputed", &aggregate)
        }
        AggregateCommands::Reconcile => {
            let report = service.reconcile_all().await?;

            match output_format {
                OutputFormat::Json => output_success(&output_format, "Reconcile finished", Some(json!(report))),
                OutputFormat::Text => {
                    println!(
                        "✓ Checked {} developers, corrected {}",
                        report.checked,
                        report.corrected.len()
                    );
                    if !report.corrected.is_empty() {
                        println!("{:<10} {:>15} {:>15}", "DEVELOPER", "BEFORE", "AFTER");
                        println!("{}", "-".repeat(42));
                        for drift in &report.corrected {
                            println!(
                                "{:<10} {:>9} ({:>3}) {:>9} ({:>3})",
                                drift.before.developer_id,
                                drift.before.rating,
                                drift.before.total_reviews,
                                drift.after.rating,
                                drift.after.total_reviews
                            );
                        }
                    }
                    Ok(())
                }
            }
        }
    }
}

fn print_aggregate(output_format: &OutputFormat, message: &str, aggregate: &DeveloperAggregate) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_success(output_format, message, Some(json!(aggregate))),
        OutputFormat::Text => {
            println!(
                "Developer {}: rating {} over {} reviews",
                aggregate.developer_id, aggregate.rating, aggregate.total_reviews
            );
            Ok(())
        }
    }
}
