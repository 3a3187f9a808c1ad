use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::PgStore;

pub async fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = PgStore::connect(&config.database).await?;
    store.migrate().await?;
    output_success(output_format, "Migrations applied", None)
}
