use std::process::ExitCode;

use clap::Parser;
use pixelgraph::cli::{self, CliArgs};

fn main() -> ExitCode {
    cli::run(CliArgs::parse())
}
