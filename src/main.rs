//! feectl - transaction fee store CLI tool
//!
//! A developer-friendly command-line interface for inspecting and filling
//! the persistent fee store.

use gasfees::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
