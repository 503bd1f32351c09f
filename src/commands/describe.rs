use std::path::PathBuf;
use std::process::ExitCode;

use flowdesc_lib::output::{CompressionSummary, FLOWDESC_OUTPUT_VERSION};
use flowdesc_lib::resource::parse_local_image;
use flowdesc_lib::types::EXTRACTION_FAILURE_MESSAGE;
use flowdesc_lib::{
    DescribeOptions, DescribeOutput, FlowDescriber, FlowError, FlowOutput, ImageInput, Resources,
};
use tracing::info;

use crate::cli::OutputFormat;
use crate::formatting::{exit_code_for, render_error, write_output};

use super::prepare_config;

/// Run the describe command.
#[allow(clippy::too_many_arguments)]
pub async fn run_describe(
    config_path: Option<PathBuf>,
    verbose: bool,
    image: PathBuf,
    fast: bool,
    show_stages: bool,
    compression_ratio: Option<f32>,
    artifacts_dir: Option<PathBuf>,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match prepare_config(config_path.as_deref(), verbose, compression_ratio) {
        Ok(cfg) => cfg,
        Err(err) => return render_error(err, format, output),
    };
    if let Err(err) = parse_local_image(&image) {
        return render_error(err.into(), format, output);
    }

    let describer = match Resources::init(&config).and_then(|r| FlowDescriber::new(r, &config)) {
        Ok(d) => d,
        Err(err) => return render_error(err, format, output),
    };

    info!(image = %image.display(), fast, "describing flowgraph");
    let options = DescribeOptions {
        fast_mode: fast,
        compression_ratio: None,
        artifacts_dir,
    };
    let report = describer
        .describe(&ImageInput::Path(image.clone()), &options)
        .await;
    describer.shutdown();
    let report = match report {
        Ok(r) => r,
        Err(err) => return render_error(err, format, output),
    };

    let stages = match (&report.trace, show_stages) {
        (Some(trace), true) => trace.stages.clone(),
        _ => Vec::new(),
    };
    let compression = report.fast.as_ref().map(|f| CompressionSummary {
        original_tokens: f.prompt.original_tokens,
        kept_tokens: f.prompt.kept_tokens,
    });

    let body = FlowOutput::Describe(DescribeOutput {
        version: FLOWDESC_OUTPUT_VERSION.to_string(),
        image: image.display().to_string(),
        fast_mode: fast,
        message: report
            .result
            .is_failure()
            .then(|| EXTRACTION_FAILURE_MESSAGE.to_string()),
        result: report.result,
        detection_count: report.ocr.detections.len(),
        stages,
        compression,
        artifacts: report.ocr.artifacts,
    });

    if let Err(err) = write_output(&body, format, output.clone()) {
        let err = FlowError::Unknown(format!("failed to write output: {err}"));
        return render_error(err, format, output);
    }
    exit_code_for(&body)
}
