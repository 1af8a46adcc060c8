use chash::config::Config;
use chash::ChashError;
use std::error::Error;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = Config::from_args(std::env::args().skip(1))
        .map_err(ChashError::from)
        .and_then(|config| chash::run(&config));
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "run aborted");
            eprintln!("chash: {}", err);
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {}", cause);
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}
