use std::path::PathBuf;
use std::process::ExitCode;

use flowdesc_lib::output::FLOWDESC_OUTPUT_VERSION;
use flowdesc_lib::resource::parse_local_image;
use flowdesc_lib::{FlowDescriber, FlowError, FlowOutput, ImageInput, OcrOutput, Resources};

use crate::cli::OutputFormat;
use crate::formatting::{exit_code_for, render_error, write_output};

use super::prepare_config;

/// Run the ocr command: detection and gate only, no model call.
pub async fn run_ocr(
    config_path: Option<PathBuf>,
    verbose: bool,
    image: PathBuf,
    artifacts_dir: Option<PathBuf>,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> ExitCode {
    let config = match prepare_config(config_path.as_deref(), verbose, None) {
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
    let report = describer
        .detect_text(&ImageInput::Path(image.clone()), artifacts_dir.as_deref())
        .await;
    describer.shutdown();
    let report = match report {
        Ok(r) => r,
        Err(err) => return render_error(err, format, output),
    };

    let body = FlowOutput::Ocr(OcrOutput {
        version: FLOWDESC_OUTPUT_VERSION.to_string(),
        image: image.display().to_string(),
        detections: report.detections,
        joined_text: report.joined_text,
        passed: report.passed,
        artifacts: report.artifacts,
    });

    if let Err(err) = write_output(&body, format, output.clone()) {
        let err = FlowError::Unknown(format!("failed to write output: {err}"));
        return render_error(err, format, output);
    }
    exit_code_for(&body)
}
