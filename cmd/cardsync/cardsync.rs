use std::time::Instant;

use cardsync::{cli::CLI, report::emit_error_report};
use clap::Parser;

#[tokio::main]
async fn main() {
    let started_at = Instant::now();
    let CLI { opts, command } = CLI::parse();

    match command.run(&opts).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(error) => {
            emit_error_report(opts.json, started_at, &error);
            std::process::exit(1);
        }
    }
}
