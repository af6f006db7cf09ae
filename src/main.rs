//! Receta CLI — agent recipe execution engine.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "receta",
    version,
    about = "Agent recipe execution engine — declarative multi-step workflows, resumable sessions, provenance tracing"
)]
struct Cli {
    #[command(subcommand)]
    command: receta::cli::Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = receta::cli::dispatch(cli.command).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
