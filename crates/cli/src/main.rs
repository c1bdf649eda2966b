//! azkvquery: print a secret from Azure Key Vault, or list the vault's
//! secrets when it does not exist

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use azkv::cli::{self, EXIT_FAILURE, EXIT_OK, exit_code_for, render_error};
use azkv::tracing::{Level, TracingConfig, TracingFormat, init_tracing};
use azkv::{Config, Outcome};

fn main() {
    // Set up error handling first
    // NOTE: Using eprintln! in panic hook is intentional - tracing infrastructure
    // may be corrupted during a panic, so we use the most reliable output method.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    let tracing_config = TracingConfig {
        format: if cli.json {
            TracingFormat::Json
        } else {
            TracingFormat::Compact
        },
        level: Level::from(cli.level),
        ..Default::default()
    };
    if let Err(err) = init_tracing(tracing_config) {
        eprintln!("{err:?}");
    }

    let config = match Config::from_env(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing::debug!(error = %err, "Configuration incomplete, showing usage");
            print!("{}", cli::usage());
            std::process::exit(EXIT_OK);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    };

    let exit_code = match runtime.block_on(azkv::run(&config)) {
        Ok(Outcome::Printed) => EXIT_OK,
        Ok(Outcome::Listed { count }) => {
            tracing::debug!(count, "Secret missing, listed vault contents");
            EXIT_OK
        }
        Err(err) => {
            let code = exit_code_for(&err);
            render_error(err);
            code
        }
    };
    std::process::exit(exit_code);
}
