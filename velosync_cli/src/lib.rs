//! VeloSync CLI library
//!
//! Wiring between the configuration layer and the core pipeline, shared by
//! the binary and the integration tests.

use std::sync::Arc;

use anyhow::{Context, Result};
use velosync_core::{
    ActivityProcessor, FitCsvToolCodec, GarminClient, Transformer, ZwiftClient,
};

pub mod config;
pub mod server;

use config::AppConfig;

/// Build the processor from a validated configuration
pub fn build_processor(config: &AppConfig) -> Result<ActivityProcessor> {
    config.validate()?;

    // validate() guarantees the credentials are present.
    let zwift = ZwiftClient::new(
        config.zwift.username.as_deref().unwrap_or_default(),
        config.zwift.password.as_deref().unwrap_or_default(),
        &config.paths.scratch_dir,
    );
    let garmin = GarminClient::new(
        config.garmin.username.as_deref().unwrap_or_default(),
        config.garmin.password.as_deref().unwrap_or_default(),
        &config.paths.token_file,
    );
    let codec = FitCsvToolCodec::new(&config.paths.fitcsvtool_jar)
        .context("FitCSVTool converter is required for the transform step")?;

    let transformer = Transformer::new(Arc::new(codec), config.device, &config.paths.scratch_dir);

    Ok(ActivityProcessor::new(
        Arc::new(zwift),
        Arc::new(garmin),
        transformer,
    ))
}
