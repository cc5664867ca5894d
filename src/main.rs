use clap::Parser;
use opc_diag::cli::{self, Cli};
use std::io::Write;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli::run(&cli.command) {
        Ok(output) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(err) = stdout.write_all(output.as_bytes()).and_then(|()| stdout.flush()) {
                eprintln!("error: failed to write output: {err}");
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        },
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(cli::exit_code(&err))
        },
    }
}

/// Log to stderr. `RUST_LOG` takes precedence over the verbosity flag.
fn init_logging(verbose: u8) {
    let default_directive = match verbose {
        0 => "warn",
        1 => "warn,opc_diag=info",
        _ => "warn,opc_diag=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
