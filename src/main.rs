use std::{path::PathBuf, process::ExitCode, sync::Arc};

use bamcheck_server::{database::SqlStore, settings::Settings};
use clap::Parser;
use log::{error, info};

/// Serves lanelet bamcheck files located through the pipeline database.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "hgi-bamcheck-server.conf")]
    config_file: PathBuf,
}

#[rocket::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Building first installs rocket's logger, at the normal level, for
    // everything below
    let rocket = rocket::build();
    info!("starting");

    let settings = Settings::open_or_default(&args.config_file);

    let store = match SqlStore::connect(&settings.db) {
        Ok(s) => s,
        Err(e) => {
            error!("error opening database connection: {e}");
            return ExitCode::FAILURE;
        }
    };

    let addr = settings.bind_address();
    let figment = rocket::Config::figment()
        .merge(("address", addr.ip()))
        .merge(("port", addr.port()))
        .merge(("log_level", "normal"));

    info!("starting http listener on {addr}");
    let result = bamcheck_server::mount(rocket, Arc::new(store))
        .configure(figment)
        .launch()
        .await;

    if let Err(e) = result {
        error!("server failed: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
