use clap::Parser;
use compose_update::cli::update::{self, UpdateArgs};
use compose_update::error::SetupError;
use compose_update::exitcode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = UpdateArgs::parse();
    init_tracing(args.verbose);

    let code = match update::run(&args) {
        Ok(summary) => {
            println!("{summary}");
            summary.exit_code()
        }
        Err(e) => {
            error!("{:#}", e);
            e.downcast_ref::<SetupError>()
                .map(SetupError::exit_code)
                .unwrap_or(exitcode::SOFTWARE)
        }
    };

    std::process::exit(code);
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
