use std::process::ExitCode;

use clap::Parser;
use mcm_cli::{cli::McmArgs, exit_code, init_tracing, render_error, run};

#[tokio::main]
async fn main() -> ExitCode {
    let args = McmArgs::parse();
    init_tracing(args.verbose);
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", render_error(&err));
            ExitCode::from(exit_code(&err))
        }
    }
}
