use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use flowdesc_lib::output::FLOWDESC_OUTPUT_VERSION;
use flowdesc_lib::{ErrorOutput, FlowError, FlowOutput, PipelineResult, VisionOutcome};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &FlowOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: FlowError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    tracing::debug!(error = ?err, "command failed");
    let error_payload = err.to_payload();
    let payload = FlowOutput::Error(ErrorOutput {
        version: FLOWDESC_OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    // Exit code 2 is fatal; caller-level failures (blurry image, bad URL) use 1.
    ExitCode::from(2)
}

/// Write JSON output to file or stdout.
fn write_json_output(body: &FlowOutput, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write pretty output to file or stdout.
fn write_pretty_output(body: &FlowOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none() && stdout_is_tty;

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &FlowOutput, colorize: bool) -> String {
    let mut buf = String::new();
    match body {
        FlowOutput::Describe(out) => {
            let mode = if out.fast_mode { "fast" } else { "refined" };
            match &out.result {
                PipelineResult::Description(text) => {
                    let header = color("[DESCRIBED]", "32", colorize);
                    writeln!(buf, "{} {} ({} mode)", header, out.image, mode).ok();
                    if let Some(c) = &out.compression {
                        writeln!(
                            buf,
                            "Prompt compressed: {} -> {} tokens",
                            c.original_tokens, c.kept_tokens
                        )
                        .ok();
                    }
                    for stage in &out.stages {
                        writeln!(buf, "--- {} ---", stage.stage).ok();
                        writeln!(buf, "{}", stage.output.trim()).ok();
                    }
                    if !out.stages.is_empty() {
                        writeln!(buf, "--- description ---").ok();
                    }
                    writeln!(buf, "{}", text.trim()).ok();
                }
                PipelineResult::ExtractionFailure => {
                    let header = color("[UNREADABLE]", "33", colorize);
                    writeln!(buf, "{} {}", header, out.image).ok();
                    if let Some(message) = &out.message {
                        writeln!(buf, "{message}").ok();
                    }
                }
            }
            write_artifacts(&mut buf, out.artifacts.as_ref());
        }
        FlowOutput::Vision(out) => {
            let (label, code) = match out.outcome {
                VisionOutcome::Description { .. } => ("[VISION]", "36"),
                VisionOutcome::Inaccessible { .. } => ("[INACCESSIBLE]", "31"),
            };
            writeln!(buf, "{} {}", color(label, code, colorize), out.input).ok();
            writeln!(buf, "{}", out.message.trim()).ok();
        }
        FlowOutput::CheckUrl(out) => {
            let (label, code) = if out.accessibility.is_accessible {
                ("OK", "32")
            } else {
                ("FAIL", "31")
            };
            writeln!(buf, "{} {}", color(label, code, colorize), out.url).ok();
            writeln!(buf, "{}", out.message).ok();
        }
        FlowOutput::Ocr(out) => {
            let (label, code) = if out.passed {
                ("PASS", "32")
            } else {
                ("FAIL", "31")
            };
            writeln!(
                buf,
                "{} {} ({} detections)",
                color(label, code, colorize),
                out.image,
                out.detections.len()
            )
            .ok();
            if out.detections.is_absent() {
                writeln!(buf, "Engine reported no detections").ok();
            }
            for d in out.detections.as_slice().unwrap_or(&[]) {
                writeln!(buf, "- {:5.2} {}", d.confidence, d.text).ok();
            }
            if out.passed {
                writeln!(buf, "Joined: {}", out.joined_text).ok();
            }
            write_artifacts(&mut buf, out.artifacts.as_ref());
        }
        FlowOutput::Error(out) => {
            let header = color("[ERROR]", "31", colorize);
            let message = out
                .message
                .as_deref()
                .unwrap_or_else(|| out.error.message.as_str());
            writeln!(buf, "{} {}", header, message).ok();
            if let Some(remediation) = &out.error.remediation {
                writeln!(buf, "Hint: {}", remediation).ok();
            }
        }
    }
    buf
}

fn write_artifacts(buf: &mut String, artifacts: Option<&flowdesc_lib::artifacts::ArtifactPaths>) {
    if let Some(art) = artifacts {
        writeln!(buf, "Artifacts:").ok();
        for (label, path) in [
            ("real", &art.real),
            ("preprocessed", &art.preprocessed),
            ("annotated", &art.annotated),
        ] {
            writeln!(buf, "- {:14} {}", label, path.display()).ok();
        }
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// 0 on success, 1 when the caller should retry with different input.
pub fn exit_code_for(body: &FlowOutput) -> ExitCode {
    let soft_failure = match body {
        FlowOutput::Describe(out) => out.result.is_failure(),
        FlowOutput::Vision(out) => matches!(out.outcome, VisionOutcome::Inaccessible { .. }),
        FlowOutput::CheckUrl(out) => !out.accessibility.is_accessible,
        FlowOutput::Ocr(out) => !out.passed,
        FlowOutput::Error(_) => return ExitCode::from(2),
    };
    if soft_failure {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdesc_lib::output::{CheckUrlOutput, CompressionSummary, DescribeOutput, OcrOutput};
    use flowdesc_lib::types::EXTRACTION_FAILURE_MESSAGE;
    use flowdesc_lib::{AccessReason, AccessibilityResult, Detections, StageName, StageOutput};

    fn describe(result: PipelineResult) -> FlowOutput {
        FlowOutput::Describe(DescribeOutput {
            version: FLOWDESC_OUTPUT_VERSION.to_string(),
            image: "flow.png".into(),
            fast_mode: false,
            message: result
                .is_failure()
                .then(|| EXTRACTION_FAILURE_MESSAGE.to_string()),
            result,
            detection_count: 1,
            stages: vec![],
            compression: None,
            artifacts: None,
        })
    }

    #[test]
    fn exit_codes_map_outcomes() {
        assert_eq!(
            exit_code_for(&describe(PipelineResult::described("ok"))),
            ExitCode::SUCCESS
        );
        assert_eq!(
            exit_code_for(&describe(PipelineResult::ExtractionFailure)),
            ExitCode::from(1)
        );

        let check = FlowOutput::CheckUrl(CheckUrlOutput {
            version: FLOWDESC_OUTPUT_VERSION.to_string(),
            url: "http://x".into(),
            accessibility: AccessibilityResult::from_reason(AccessReason::Forbidden),
            message: String::new(),
        });
        assert_eq!(exit_code_for(&check), ExitCode::from(1));

        let ocr = FlowOutput::Ocr(OcrOutput {
            version: FLOWDESC_OUTPUT_VERSION.to_string(),
            image: "a.png".into(),
            detections: Detections::Absent,
            joined_text: String::new(),
            passed: false,
            artifacts: None,
        });
        assert_eq!(exit_code_for(&ocr), ExitCode::from(1));
    }

    #[test]
    fn render_error_always_returns_fatal_exit_code() {
        let code = render_error(
            FlowError::Config("boom".to_string()),
            OutputFormat::Json,
            None,
        );
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn format_pretty_shows_stages_and_compression() {
        let output = FlowOutput::Describe(DescribeOutput {
            version: FLOWDESC_OUTPUT_VERSION.to_string(),
            image: "flow.png".into(),
            fast_mode: true,
            result: PipelineResult::described("1. Receive order\n2. Ship"),
            message: None,
            detection_count: 4,
            stages: vec![StageOutput {
                stage: StageName::Clean,
                prompt_chars: 10,
                output: "receive order ship".into(),
            }],
            compression: Some(CompressionSummary {
                original_tokens: 90,
                kept_tokens: 9,
            }),
            artifacts: None,
        });

        let pretty = format_pretty(&output, false);
        assert!(pretty.contains("[DESCRIBED] flow.png (fast mode)"));
        assert!(pretty.contains("90 -> 9 tokens"));
        assert!(pretty.contains("--- clean ---"));
        assert!(pretty.contains("2. Ship"));
    }

    #[test]
    fn format_pretty_shows_blurry_message() {
        let pretty = format_pretty(&describe(PipelineResult::ExtractionFailure), false);
        assert!(pretty.contains("[UNREADABLE] flow.png"));
        assert!(pretty.contains("too blurry"));
    }

    #[test]
    fn format_pretty_handles_errors() {
        let output = FlowOutput::Error(ErrorOutput {
            version: FLOWDESC_OUTPUT_VERSION.to_string(),
            message: Some("bad input".to_string()),
            error: flowdesc_lib::error::ErrorPayload {
                category: flowdesc_lib::error::ErrorCategory::Config,
                message: "bad input".to_string(),
                remediation: Some("check flags".to_string()),
            },
        });

        let pretty = format_pretty(&output, false);
        assert!(pretty.contains("[ERROR] bad input"));
        assert!(pretty.contains("Hint: check flags"));
    }
}
