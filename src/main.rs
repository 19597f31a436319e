use std::process;

use clap::{error::ErrorKind, Parser};
use log::warn;

mod bias;
mod cli;
mod error;
mod linux;
mod report;
#[cfg(test)]
mod test_utils;

use crate::bias::{MAX_BIAS, MIN_BIAS};
use crate::cli::Cli;
use crate::error::BiasError;
use crate::linux::privilege::ProcessCredentials;

fn fail(err: &BiasError) -> ! {
    eprintln!("Error: {}", err);
    if err.is_range_error() {
        eprintln!("Value must be between {} and {}", MIN_BIAS, MAX_BIAS);
    }
    process::exit(err.exit_code());
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                let usage_error = cli::usage_error(&ProcessCredentials);
                if matches!(usage_error, BiasError::BadArgumentCount) {
                    let _ = err.print();
                }
                fail(&usage_error);
            }
        },
    };

    if let Err(err) = stderrlog::new()
        .module(module_path!())
        .quiet(cli.quiet)
        .verbosity(usize::from(cli.verbose) + 1)
        .init()
    {
        eprintln!("failed to initialize the logger: {}", err);
    }

    let report = match cli::set(&cli.cpu_root, &cli.value, ProcessCredentials) {
        Ok(report) => report,
        Err(err) => fail(&err),
    };
    if report.summary.failed > 0 {
        warn!(
            "{} of {} cores rejected the performance bias",
            report.summary.failed, report.summary.attempted
        );
    }

    match report.render(cli.json) {
        Ok(line) => println!("{}", line),
        Err(err) => fail(&err),
    }
}
