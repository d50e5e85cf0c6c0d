use chrono::Utc;

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseManager;
use crate::services::{mailer, reminders};

/// One sweep for an external scheduler; exits non-zero only when the sweep
/// itself fails, not when individual emails do
pub async fn handle(config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database).await?;
    let mailer = mailer::from_config(&config.notifications);

    let report = reminders::sweep(&pool, mailer.as_ref(), &config.notifications, Utc::now()).await?;
    pool.close().await;

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!("✓ Sent {} reminder(s), {} failed", report.notifications_sent, report.failed);
            for result in &report.results {
                println!(
                    "  {:?}  bill {}  reminder {}  {}",
                    result.status, result.bill_id, result.reminder_id, result.recipient
                );
            }
        }
    }
    Ok(())
}
