pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod farm;
pub mod remote;
pub mod tui;
pub mod util;

// === CLI entrypoint ===
pub mod cli;

pub use auth::{FarmerSignup, ManagerSignup, SessionManager, SessionStore};
pub use backend::Backend;
pub use error::{ClientError, ClientResult};
pub use farm::FarmData;

/// Entrypoint used by `main.rs` and tests to run the full CLI.
pub async fn run_cli() -> anyhow::Result<()> {
    cli::cli().await
}
