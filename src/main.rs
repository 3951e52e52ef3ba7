use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = vault_keychain::cli::Cli::parse();
    cli.run()
}
