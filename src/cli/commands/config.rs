use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let redacted = config.redacted();
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&redacted)?),
        OutputFormat::Text => {
            println!("Environment: {:?}", redacted.environment);
            println!("Database:    {}", redacted.database.url);
            println!("Port:        {}", redacted.api.port);
            println!("CORS:        {}", if redacted.security.enable_cors { "enabled" } else { "disabled" });
            println!(
                "Mailer:      {}",
                if redacted.notifications.sendgrid_api_key.is_some() { "sendgrid" } else { "disabled" }
            );
            println!("Cron secret: {}", if redacted.security.cron_secret.is_some() { "set" } else { "not set" });
        }
    }
    Ok(())
}
