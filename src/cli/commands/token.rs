use serde_json::{json, Map, Value};

use crate::auth::SessionKeys;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

/// Print a session token signed with the configured secret.
pub fn handle(config: &AppConfig, email: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let keys = SessionKeys::from_config(config)?;

    let mut identity = Map::new();
    identity.insert("email".to_string(), Value::String(email.to_string()));
    let token = keys.issue(identity)?;

    match output_format {
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
        OutputFormat::Json => output_success(
            output_format,
            "Token issued",
            Some(json!({ "token": token, "expires_in_hours": keys.ttl_hours() })),
        ),
    }
}
