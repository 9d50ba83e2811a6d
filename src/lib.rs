pub mod api;
pub mod cli;
pub mod clock;
pub mod config;
pub mod database;
pub mod domain;
pub mod errors;
pub mod maintenance;
pub mod matches;
pub mod pairing;
pub mod rating;
pub mod services;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

use crate::cli::Command;
use crate::clock::SystemClock;
use crate::config::AppConfig;
use crate::database::setup;
use crate::maintenance::AdmissionGate;
use crate::services::maintenance::MaintenanceService;
use crate::services::server::ServerService;

pub fn interpret() -> Command {
    let cli = Cli::parse();
    cli.command
}

pub fn handle_serve(port: u16) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let config = AppConfig::new();
        let service = ServerService::new(port, config);
        service.run().await
    })
}

pub fn handle_setup() -> Result<()> {
    let config = AppConfig::new();
    let pool = database::create_pool(&config.database_path)?;
    setup::ensure_schema(&*database::get_connection(&pool)?)?;
    info!("Schema ready in {}", config.database_path);
    Ok(())
}

pub fn handle_maintain() -> Result<()> {
    let config = AppConfig::new();
    let pool = database::create_pool(&config.database_path)?;
    setup::ensure_schema(&*database::get_connection(&pool)?)?;

    let service = MaintenanceService::new(
        pool,
        AdmissionGate::new(),
        Arc::new(SystemClock),
        config.maintenance,
    );
    let report = service.run()?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_success() {
        anyhow::bail!("{} maintenance steps failed", report.failures.len());
    }
    Ok(())
}
