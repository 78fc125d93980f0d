//! Config command

use anyhow::Result;
use primesum_core::Config;

/// Print the default config file
pub fn cmd_config() -> Result<()> {
  print!("{}", Config::generate_template());

  if let Some(path) = Config::user_config_path() {
    eprintln!("# Save as {} to use it by default", path.display());
  }
  Ok(())
}
