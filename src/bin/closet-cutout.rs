//! Closet Cutout CLI Tool
//!
//! Command-line interface for the closet-cutout library.

#[cfg(feature = "cli")]
use closet_cutout::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
