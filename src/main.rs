//! Tua CLI - scan, parse, and execute a Tua program from a file.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

use tua::{Evaluator, Parser, Scanner};

#[derive(ClapParser)]
#[command(
    name = "tua",
    version,
    about = "The Tua programming language - a statically typed Lua dialect"
)]
struct Cli {
    /// Path to the source file
    file: PathBuf,

    /// Print the parsed tree as JSON instead of running the program
    #[arg(long)]
    dump_ast: bool,

    /// Enable verbose logging (RUST_LOG overrides this)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "tua=debug" } else { "tua=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let source = fs::read_to_string(&cli.file)
        .with_context(|| format!("failed to read {}", cli.file.display()))?;

    let mut scanner = Scanner::new(&source);
    let tokens = scanner.scan_tokens()?;

    let mut parser = Parser::new(tokens);
    let program = parser.parse()?;

    if cli.dump_ast {
        println!("{}", serde_json::to_string_pretty(&program)?);
        return Ok(());
    }

    let mut evaluator = Evaluator::new();
    evaluator.execute(&program)?;

    Ok(())
}
