pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

use crate::server::ServeArgs;

#[derive(Parser)]
#[command(name = "fueled")]
#[command(about = "Fueled CLI - run and operate the meal-sharing API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve(ServeArgs),

    #[command(about = "Apply database migrations")]
    Migrate,

    #[command(about = "Mint a session token for local testing")]
    Token {
        #[arg(long, help = "Email to embed in the token")]
        email: String,
    },

    #[command(about = "Check a running server's /health endpoint")]
    Health {
        #[arg(long, help = "Server base URL (defaults to http://localhost:$PORT)")]
        url: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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
    let config = crate::config::AppConfig::from_env()?;

    match cli.command {
        Commands::Serve(args) => crate::server::serve(config, args).await,
        Commands::Migrate => commands::migrate::handle(&config, output_format).await,
        Commands::Token { email } => commands::token::handle(&config, &email, output_format),
        Commands::Health { url } => commands::health::handle(&config, url, output_format).await,
    }
}
