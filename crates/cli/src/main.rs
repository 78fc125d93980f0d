//! primesum - sum the largest prime divisors of a stream of integers

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod logging;

use commands::{RunArgs, cmd_config, cmd_run};

#[derive(Parser)]
#[command(name = "primesum")]
#[command(about = "Sum the largest prime divisors of whitespace-separated integers")]
#[command(after_help = "\
EXAMPLES:
  echo \"6 17 8\" | primesum                    # prints 22
  primesum --input values.txt --current-thread
  primesum --watchdog-latency-ms 100          # abort if the scheduler stalls
  primesum config > ~/.config/primesum/config.toml")]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,

  #[command(flatten)]
  run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
  /// Print the default configuration file
  Config,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Config) => cmd_config(),
    None => cmd_run(cli.run),
  }
}
