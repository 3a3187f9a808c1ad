use clap::Parser;

use fueled_api::config::AppConfig;
use fueled_api::server::{self, ServeArgs};

#[derive(Parser)]
#[command(name = "fueled-api", about = "Fueled meal-sharing API server", version)]
struct Args {
    #[command(flatten)]
    serve: ServeArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, TOKEN_SEC, etc.
    let _ = dotenvy::dotenv();
    server::init_tracing();

    let args = Args::parse();
    let config = AppConfig::from_env()?;

    server::serve(config, args.serve).await
}
