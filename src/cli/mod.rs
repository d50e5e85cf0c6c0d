pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "billsmart")]
#[command(about = "BillSmart CLI - server, migrations and reminder sweeps")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API server")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides API_PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Apply pending SQL migrations")]
    Migrate,

    #[command(about = "Run the payment reminder sweep once and print the report")]
    Sweep,

    #[command(about = "Print the effective configuration with secrets redacted")]
    Config,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config: AppConfig = crate::config::config().clone();

    match cli.command {
        Commands::Serve { port } => commands::serve::handle(config, port).await,
        Commands::Migrate => commands::migrate::handle(config, output_format).await,
        Commands::Sweep => commands::sweep::handle(config, output_format).await,
        Commands::Config => commands::config::handle(&config, output_format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::parse_from(["billsmart", "sweep", "--json"]);
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Sweep));
    }

    #[test]
    fn serve_accepts_port_override() {
        let cli = Cli::parse_from(["billsmart", "serve", "--port", "4100"]);
        match cli.command {
            Commands::Serve { port } => assert_eq!(port, Some(4100)),
            _ => panic!("expected serve"),
        }
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Text));
    }
}
