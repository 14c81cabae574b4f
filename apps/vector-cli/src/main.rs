//! Vector CLI - Entry Point
//!
//! Minimal entry point that delegates to the commands module.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    vector_cli::run().await
}
