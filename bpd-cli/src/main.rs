//! bpd CLI - Command line tool for basin precipitation disaggregation.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "bpd-cli",
    version,
    about = "Basin precipitation disaggregation toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: bpd_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    bpd_cmd::run(cli.command)
}
