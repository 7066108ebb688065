use std::io;
use std::process::ExitCode;

use clap::Parser;
use querykit_cli::cli::{execute, init_logging, Cli, Status};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(&cli, &mut io::stdout().lock()) {
        Ok(Status::Clean) => ExitCode::SUCCESS,
        Ok(Status::FieldErrors) => ExitCode::from(2),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
