//! Composition root - builds the dispatcher once per process.
//!
//! Config file (or defaults) -> environment overrides -> validation ->
//! predictor -> sinks -> `Dispatcher`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{ServiceConfig, SinkConfig, SinkType};
use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherConfig};
use tracing::{info, warn};

use crate::cli::ServiceArgs;

/// Load the service config and apply CLI/environment overrides
pub fn load_service_config(args: &ServiceArgs) -> Result<ServiceConfig> {
    let mut config = match &args.config {
        Some(path) => load_config_file(path)?,
        None => {
            info!("No configuration file given, using defaults");
            ServiceConfig::default()
        }
    };

    apply_overrides(&mut config, args);
    ConfigLoader::validate(&config).context("Invalid configuration after overrides")?;

    info!(
        model = %config.model.name,
        version = %config.model.resolved_version(),
        test_run = config.dispatcher.test_run,
        sinks = config.sinks.len(),
        "Configuration loaded"
    );
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<ServiceConfig> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }
    ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Environment values win over the file
///
/// A sink named by an override but absent from the config is added.
pub fn apply_overrides(config: &mut ServiceConfig, args: &ServiceArgs) {
    if args.test_run {
        config.dispatcher.test_run = true;
    }
    if let Some(version) = &args.model_version {
        config.model.version = Some(version.clone());
    }
    if let Some(run_id) = &args.run_id {
        config.model.run_id = Some(run_id.clone());
    }
    if let Some(artifact) = &args.model_artifact {
        config.model.artifact = Some(artifact.clone());
    }

    if let Some(stream) = &args.stream_name {
        set_sink_param(config, SinkType::Republish, "stream", stream, args.stream_addr.is_some());
    }
    if let Some(addr) = &args.stream_addr {
        set_sink_param(config, SinkType::Republish, "addr", addr, args.stream_name.is_some());
    }
    if let Some(url) = &args.monitoring_url {
        set_sink_param(config, SinkType::Monitoring, "base_url", url, true);
    }
    if let Some(path) = &args.persistence_path {
        let path = path.to_string_lossy();
        set_sink_param(config, SinkType::Persistence, "base_path", &path, true);
    }
}

fn set_sink_param(
    config: &mut ServiceConfig,
    sink_type: SinkType,
    key: &str,
    value: &str,
    add_if_missing: bool,
) {
    let mut found = false;
    for sink in config.sinks.iter_mut().filter(|s| s.sink_type == sink_type) {
        sink.params.insert(key.to_string(), value.to_string());
        found = true;
    }

    if !found && add_if_missing {
        let name = default_sink_name(sink_type);
        info!(sink = name, "Registering sink from environment");
        config.sinks.push(SinkConfig {
            name: name.to_string(),
            sink_type,
            queue_capacity: 100,
            params: [(key.to_string(), value.to_string())].into_iter().collect(),
        });
    }
}

fn default_sink_name(sink_type: SinkType) -> &'static str {
    match sink_type {
        SinkType::Republish => "republish",
        SinkType::Persistence => "persistence",
        SinkType::Monitoring => "monitoring",
        SinkType::Log => "log",
    }
}

/// Load the predictor and start every sink
pub async fn build_dispatcher(config: &ServiceConfig) -> Result<Dispatcher> {
    let model = model_loader::load_predictor(&config.model).context("Failed to load model")?;

    if config.dispatcher.test_run {
        warn!("Test run: republish and monitoring sinks are skipped");
    }

    let dispatcher_config =
        DispatcherConfig::new(&model.name, &model.version).with_settings(&config.dispatcher);

    DispatcherBuilder::new(dispatcher_config, Arc::clone(&model.predictor))
        .with_sink_configs(config.sinks.clone())
        .build()
        .await
        .context("Failed to start sinks")
}
