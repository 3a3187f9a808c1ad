pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod join;
pub mod middleware;
pub mod models;
pub mod server;
pub mod state;

pub use app::app;
pub use state::AppState;
