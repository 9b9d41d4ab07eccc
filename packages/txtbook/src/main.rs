//! `txtbook` binary: turns a plain-text novel into an EPUB book or a
//! directory of per-chapter text files.
//!
//! Logging goes through `tracing`; set `RUST_LOG=debug` to see every
//! detected encoding and sealed chapter.

use tracing_subscriber::EnvFilter;
use txtbook::cli;

fn init_tracing() {
    // WARN by default, respecting RUST_LOG
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();

    if let Err(e) = cli::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
