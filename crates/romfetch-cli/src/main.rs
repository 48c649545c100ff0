use clap::Parser;
use romfetch_core::logging;

mod cli;

use crate::cli::{exit, Cli};

fn main() {
    let cli = Cli::parse();

    // Initialize logging as early as possible.
    if let Err(err) = logging::init_logging(cli.verbose, cli.log_file.as_deref()) {
        logging::init_logging_stderr();
        tracing::warn!("falling back to stderr logging: {:#}", err);
    }

    let strict = cli.is_simple_form();
    if let Err(err) = cli.run() {
        eprintln!("romfetch error: {:#}", err);
        std::process::exit(exit::code_for(&err, strict));
    }
}
