use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::models::JobRun;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });
            if let Some(data) = data {
                response["data"] = data;
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Pretty JSON in either format; text mode prints it bare.
pub fn output_value<T: Serialize>(output_format: OutputFormat, value: &T) -> anyhow::Result<()> {
    let value = serde_json::to_value(value)?;
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&json!({ "success": true, "data": value }))?),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(&value)?),
    }
    Ok(())
}

pub fn output_job_run(output_format: OutputFormat, run: &JobRun) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_value(output_format, run),
        OutputFormat::Text => {
            println!(
                "✓ {} finished: {} processed, {} skipped, {} failed",
                run.job, run.processed, run.skipped, run.failed
            );
            for failure in &run.failures {
                println!("  ✗ {}: {}", failure.target, failure.error);
            }
            Ok(())
        }
    }
}

/// Environment configuration, validated before any command touches the store.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let _ = dotenvy::dotenv();
    let config = AppConfig::from_env();
    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}
