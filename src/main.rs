use clap::Parser;
use strategy_factory::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
