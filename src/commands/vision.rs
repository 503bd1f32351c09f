use std::path::PathBuf;
use std::process::ExitCode;

use flowdesc_lib::output::FLOWDESC_OUTPUT_VERSION;
use flowdesc_lib::{
    parse_image_source, FlowDescriber, FlowError, FlowOutput, ImageSource, Resources,
    VisionOutput,
};

use crate::cli::OutputFormat;
use crate::formatting::{exit_code_for, render_error, write_output};
use crate::settings::{apply_overrides, resolve_probe_timeout};

use super::prepare_config;

/// Run the vision command.
#[allow(clippy::too_many_arguments)]
pub async fn run_vision(
    raw_args: &[String],
    config_path: Option<PathBuf>,
    verbose: bool,
    input: String,
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

    let source = match parse_image_source(&input) {
        Ok(source) => source,
        Err(err) => return render_error(err.into(), format, output),
    };

    let describer =
        match Resources::init_without_ocr(&config).and_then(|r| FlowDescriber::new(r, &config)) {
            Ok(d) => d,
            Err(err) => return render_error(err, format, output),
        };
    let outcome = match &source {
        ImageSource::Url(url) => describer.describe_from_url(url).await,
        local => describer.describe_image(local).await,
    };
    describer.shutdown();
    let outcome = match outcome {
        Ok(o) => o,
        Err(err) => return render_error(err, format, output),
    };

    let body = FlowOutput::Vision(VisionOutput {
        version: FLOWDESC_OUTPUT_VERSION.to_string(),
        input,
        message: outcome.user_message(),
        outcome,
    });

    if let Err(err) = write_output(&body, format, output.clone()) {
        let err = FlowError::Unknown(format!("failed to write output: {err}"));
        return render_error(err, format, output);
    }
    exit_code_for(&body)
}
