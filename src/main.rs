//! Binary entry point: resolve settings, bring up logging and the store, then
//! drive the Ratatui event loop until the user exits.
use anyhow::Context;
use clap::Parser;
use tracing::info;

use edu_portal::config::{Cli, Settings};
use edu_portal::{logging, open_store, run_app, App, MaterialLibrary};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let settings = Settings::from_cli(Cli::parse()).context("invalid configuration")?;
    logging::init(&settings.log_file)?;
    info!(data_dir = %settings.data_dir.display(), "starting edu-portal");

    let store = open_store(&settings.target);
    store.ensure_schema()?;
    let library = MaterialLibrary::new(settings.data_dir.clone());

    let notice = settings.placeholder_password.then(|| {
        "Update the connection string with a real PostgreSQL password before using the app."
            .to_string()
    });

    let mut app = App::new(store, library, notice);
    let result = run_app(&mut app);
    info!("edu-portal stopped");
    result
}
