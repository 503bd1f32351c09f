mod check_url;
mod describe;
mod ocr;
mod vision;

use std::path::Path;

use flowdesc_lib::{Config, FlowError};

use crate::settings::{apply_overrides, init_logging_from, load_config, log_effective_config};

pub use check_url::run_check_url;
pub use describe::run_describe;
pub use ocr::run_ocr;
pub use vision::run_vision;

/// Load config, start logging, then apply CLI overrides.
fn prepare_config(
    config_path: Option<&Path>,
    verbose: bool,
    compression_ratio: Option<f32>,
) -> Result<Config, FlowError> {
    let config = load_config(config_path)?;
    init_logging_from(&config, verbose);
    let config = apply_overrides(config, compression_ratio, None)?;
    log_effective_config(config_path, &config);
    Ok(config)
}
