use std::path::Path;
use std::time::Duration;

use flowdesc_lib::logging::init_logging;
use flowdesc_lib::{Config, FlowError};
use tracing::debug;

/// Checks if a flag was present in the command-line arguments.
pub fn flag_present(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg == flag || arg.starts_with(&format!("{flag}=")))
}

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/flowdesc/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, FlowError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        FlowError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        FlowError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Start logging from config; `--verbose` forces debug.
pub fn init_logging_from(config: &Config, verbose: bool) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    init_logging(level, config.logging.json);
}

/// CLI probe timeout when `--probe-timeout` was given, else `[network] probe_timeout`.
pub fn resolve_probe_timeout(raw_args: &[String], cli_secs: u64, config: &Config) -> Duration {
    if flag_present(raw_args, "--probe-timeout") {
        Duration::from_secs(cli_secs)
    } else {
        config.network.probe_timeout
    }
}

/// Apply CLI overrides to a loaded config and re-validate.
pub fn apply_overrides(
    mut config: Config,
    compression_ratio: Option<f32>,
    probe_timeout: Option<Duration>,
) -> Result<Config, FlowError> {
    if let Some(ratio) = compression_ratio {
        config.compression.ratio = ratio;
    }
    if let Some(timeout) = probe_timeout {
        config.network.probe_timeout = timeout;
    }
    config
        .validate()
        .map_err(|e| FlowError::Config(format!("Invalid flag value: {e}")))?;
    Ok(config)
}

/// Log effective config (visible with --verbose).
pub fn log_effective_config(config_path: Option<&Path>, config: &Config) {
    debug!("{}", format_effective_config(config, config_path));
}

/// Format effective config as a single-line string.
pub fn format_effective_config(config: &Config, config_source: Option<&Path>) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    format!(
        "Effective config [{source}]: endpoint={}, text_model={}, vision_model={}, max_tokens={}, temperature={:.2}, echo={}, stop={:?}, compression_ratio={:.2}, probe_timeout={}s, request_timeout={}s, max_concurrent={}, preprocess={} (dilate {}, erode {})",
        config.model.endpoint,
        config.model.text_model,
        config.model.vision_model,
        config.generation.max_tokens,
        config.generation.temperature,
        config.generation.echo,
        config.generation.stop,
        config.compression.ratio,
        config.network.probe_timeout.as_secs(),
        config.model.request_timeout.as_secs(),
        config.model.max_concurrent_invocations,
        config.preprocess.enabled,
        config.preprocess.dilate_kernel,
        config.preprocess.erode_kernel,
    )
}
