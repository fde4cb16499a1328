use anyhow::Context;
use clap::Args;
use serde_json::json;

use crate::auth::{generate_jwt, Claims, UserType};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Args)]
pub struct TokenArgs {
    #[arg(long, help = "User id the token is issued for")]
    pub id: i32,

    #[arg(long, default_value = "dev@devhub.local", help = "Email claim")]
    pub email: String,

    #[arg(long = "type", default_value = "Client", help = "User type: Client or Developer")]
    pub user_type: String,

    #[arg(long, help = "Grant admin access")]
    pub admin: bool,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let user_type: UserType = args.user_type.parse().map_err(anyhow::Error::msg)?;
    let claims = Claims::new(args.id, args.email, user_type, args.admin);
    let token = generate_jwt(&claims).context("failed to sign token (is JWT_SECRET set?)")?;

    match output_format {
        OutputFormat::Json => output_success(
            &output_format,
            "Token issued",
            Some(json!({
                "token": token,
                "claims": claims
            })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}
