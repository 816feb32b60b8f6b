//! bbslink entry point.

use std::io::{IsTerminal, stdout};

use bbslink_app::{App, AppEvent, Runtime};
use bbslink_cli::{Args, ConsoleDriver, logging};
use bbslink_core::{JsonStore, env::SystemEnv};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(&args.log_level, args.log_file.as_deref())?;

    let store = JsonStore::open(&args.data_dir)?;
    tracing::info!(dir = %store.dir().display(), "using data directory");

    let driver = ConsoleDriver::new(args.transport_config(), stdout().is_terminal());
    let app = App::new(SystemEnv::new(), args.app_config());
    let mut runtime = Runtime::new(driver, store, app);

    if args.host.is_some() {
        runtime.dispatch(AppEvent::Connect { host: None, port: None })?;
    }

    runtime.run().await?;
    Ok(())
}
