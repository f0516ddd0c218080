use std::sync::Arc;

use snaptron::config::{load_config, print_schema};
use snaptron::startup;
use snaptron::utils::logger::init_logging;
use tracing::{error, info};

fn usage() -> ! {
    eprintln!("usage: snaptron [--schema | --check]");
    std::process::exit(2);
}

#[tokio::main]
async fn main() {
    let mode = std::env::args().nth(1);
    match mode.as_deref() {
        None | Some("--check") => {}
        Some("--schema") => {
            if let Err(e) = print_schema() {
                eprintln!("Error printing schema: {}", e);
                std::process::exit(1);
            }
            return;
        }
        Some(_) => usage(),
    }

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Error initializing logging: {}", e);
        std::process::exit(1);
    }

    if mode.is_some() {
        match startup::check(&config).await {
            Ok(samples) => info!("Check passed, collected {} samples", samples),
            Err(e) => {
                error!("Check failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = startup::run(Arc::new(config)).await {
        error!("Exporter stopped: {}", e);
        std::process::exit(1);
    }
}
