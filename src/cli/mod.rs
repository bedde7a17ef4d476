pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "taskilo")]
#[command(about = "Taskilo CLI - operator tooling for the Taskilo API")]
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
    #[command(about = "JWT tokens for testing and operations")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },

    #[command(about = "Run background jobs once")]
    Jobs {
        #[command(subcommand)]
        cmd: commands::jobs::JobsCommands,
    },

    #[command(about = "Document store maintenance")]
    Db {
        #[command(subcommand)]
        cmd: commands::db::DbCommands,
    },

    #[command(about = "Inspect the effective configuration")]
    Config {
        #[command(subcommand)]
        cmd: commands::config::ConfigCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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

    match cli.command {
        Commands::Token { cmd } => commands::token::handle(cmd, output_format).await,
        Commands::Jobs { cmd } => commands::jobs::handle(cmd, output_format).await,
        Commands::Db { cmd } => commands::db::handle(cmd, output_format).await,
        Commands::Config { cmd } => commands::config::handle(cmd, output_format).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_mint_with_companies() {
        let cli = Cli::try_parse_from([
            "taskilo", "--json", "token", "mint", "--sub", "u1", "--role", "company", "--company", "c1", "--company", "c2",
        ])
        .unwrap();
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Json);
        match cli.command {
            Commands::Token { cmd: commands::token::TokenCommands::Mint { sub, companies, hours, .. } } => {
                assert_eq!(sub, "u1");
                assert_eq!(companies, vec!["c1", "c2"]);
                assert!(hours.is_none());
            }
            _ => panic!("expected token mint"),
        }
    }

    #[test]
    fn text_is_the_default_output() {
        let cli = Cli::try_parse_from(["taskilo", "jobs", "usage"]).unwrap();
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Text);
    }
}
