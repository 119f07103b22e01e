use cd_guard::cli::{Cli, strip_unknown_flags};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use log::debug;
use std::process;

#[tokio::main]
async fn main() {
    let stripped =
        strip_unknown_flags(std::env::args_os().map(|a| a.to_string_lossy().into_owned()));

    let cli = match Cli::try_parse_from(&stripped.args) {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = e.print();
            process::exit(code);
        }
    };

    // Initialize logging
    cli.init_logging();
    for flag in &stripped.ignored {
        debug!("Ignoring unknown flag {}", flag);
    }

    let Some(command) = cli.command.clone() else {
        let _ = Cli::command().print_help();
        process::exit(0);
    };

    match cd_guard::run_command(&cli, &command).await {
        Ok(status) => process::exit(status),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
