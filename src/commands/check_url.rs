use std::path::PathBuf;
use std::process::ExitCode;

use flowdesc_lib::output::FLOWDESC_OUTPUT_VERSION;
use flowdesc_lib::{AccessibilityChecker, CheckUrlOutput, FlowError, FlowOutput};

use crate::cli::OutputFormat;
use crate::formatting::{exit_code_for, render_error, write_output};
use crate::settings::{apply_overrides, resolve_probe_timeout};

use super::prepare_config;

/// Run the check-url command. Never touches a model.
pub async fn run_check_url(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    verbose: bool,
    url: String,
    probe_timeout: u64,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match prepare_config(config_path.as_deref(), verbose, None) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    let timeout = resolve_probe_timeout(raw_args, probe_timeout, &config);
    let config = match apply_overrides(config, None, Some(timeout)) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };

    let checker = match AccessibilityChecker::new(config.network.probe_timeout) {
        Ok(c) => c,
        Err(err) => return render_error(err, format, output),
    };
    let accessibility = checker.check(&url).await;

    let body = FlowOutput::CheckUrl(CheckUrlOutput {
        version: FLOWDESC_OUTPUT_VERSION.to_string(),
        url,
        message: accessibility.message(),
        accessibility,
    });

    if let Err(err) = write_output(&body, format, output.clone()) {
        let err = FlowError::Unknown(format!("failed to write output: {err}"));
        return render_error(err, format, output);
    }
    exit_code_for(&body)
}
