use std::io;
use std::process::ExitCode;

use cl_smoke::{OpenClBackend, RunConfig, run};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // stdout carries the listing and the result; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let mut out = io::stdout().lock();
    let status = match run(&OpenClBackend, &RunConfig::default(), &mut out) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run aborted");
            ExitCode::from(e.exit_code())
        }
    };

    #[cfg(feature = "metrics")]
    eprint!("{}", cl_smoke::summary());

    status
}
