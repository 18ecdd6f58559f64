//! Triplex CLI - extract knowledge triples from text with a language model.

use clap::Parser;
use triplex_cli::commands;
use triplex_cli::{Cli, Command, Formatter};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run() -> triplex_cli::Result<i32> {
    let cli = Cli::parse();
    let formatter = Formatter::new(!cli.no_color);

    match cli.command {
        Command::Run(args) => commands::execute_run(args, &formatter).await,
        Command::Themes(args) => {
            commands::execute_themes(args, &formatter)?;
            Ok(0)
        }
    }
}
