use clap::Subcommand;
use serde_json::json;

use crate::auth::{generate_jwt, Claims, Role};
use crate::cli::utils::{load_config, output_success};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Mint a signed JWT with the configured secret")]
    Mint {
        #[arg(long, help = "User id (sub claim)")]
        sub: String,
        #[arg(long, default_value = "user", help = "Role: user, company or admin")]
        role: Role,
        #[arg(long = "company", help = "Company id the user belongs to (repeatable)")]
        companies: Vec<String>,
        #[arg(long, help = "Email claim")]
        email: Option<String>,
        #[arg(long, help = "Lifetime in hours (defaults to JWT_EXPIRY_HOURS)")]
        hours: Option<i64>,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TokenCommands::Mint { sub, role, companies, email, hours } => {
            let config = load_config()?;
            let security = &config.security;
            let hours = hours.unwrap_or(security.jwt_expiry_hours as i64);
            if hours <= 0 {
                anyhow::bail!("--hours must be positive");
            }

            let mut claims = Claims::with_expiry(sub, role, companies, security, hours);
            if let Some(email) = email {
                claims = claims.with_email(email);
            }
            let token = generate_jwt(&claims, security)?;

            match output_format {
                OutputFormat::Text => println!("{}", token),
                OutputFormat::Json => output_success(
                    output_format,
                    "Token minted",
                    Some(json!({
                        "token": token,
                        "sub": claims.sub,
                        "role": claims.role.as_str(),
                        "companies": claims.companies,
                        "expires_at": claims.exp,
                    })),
                )?,
            }
            Ok(())
        }
    }
}
