// Entrypoint for the CLI application.
// - Resolves configuration once; it is read-only afterwards.
// - Keeps `main` small: build the API client and hand it to the UI loop.

use bmclapi_cli::{api::ApiClient, config::{CliArgs, Config}, ui::main_menu};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let config = Config::load(args)?;

    // RUST_LOG takes precedence over the debug argument.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    tracing::info!(base_url = %config.base_url, cookies = %config.cookie_path.display(), "starting");

    let api = ApiClient::new(&config)?.with_progress(true);

    // Start the interactive menu. This call blocks until the user exits.
    main_menu(config, api)?;
    Ok(())
}
