//! Tracing subscriber setup.
//!
//! Logs go to stderr, or to a file when one is given so they do not mix with
//! the session. `RUST_LOG` wins over `--log-level`.

use std::{fs::File, io, path::Path, sync::Arc};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Build the filter: `RUST_LOG` if set, else `level`.
pub fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if the log file cannot be created.
pub fn init(level: &str, log_file: Option<&Path>) -> io::Result<()> {
    let registry = tracing_subscriber::registry().with(filter(level));
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            registry.with(fmt::layer().with_ansi(false).with_writer(Arc::new(file))).init();
        },
        None => registry.with(fmt::layer().with_writer(io::stderr)).init(),
    }
    Ok(())
}
