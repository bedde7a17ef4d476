use clap::Subcommand;

use crate::cli::utils::{load_config, output_value};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Print the effective configuration with secrets masked")]
    Show,
}

pub async fn handle(cmd: ConfigCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let config = load_config()?;
            output_value(output_format, &config.redacted())
        }
    }
}
