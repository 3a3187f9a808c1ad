use anyhow::{bail, Context};
use serde_json::Value;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub async fn handle(config: &AppConfig, url: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let base = url.unwrap_or_else(|| format!("http://localhost:{}", config.server.port));
    let endpoint = format!("{}/health", base.trim_end_matches('/'));

    let response = reqwest::get(&endpoint)
        .await
        .with_context(|| format!("failed to reach {}", endpoint))?;
    let status = response.status();
    let body: Value = response.json().await.context("health response was not JSON")?;

    if !status.is_success() {
        bail!("{} reported {}: {}", endpoint, status, body["message"].as_str().unwrap_or("unhealthy"));
    }

    output_success(output_format, &format!("{} is healthy", base), body.get("data").cloned())
}
