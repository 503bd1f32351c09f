mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use flowdesc_lib::config::PreprocessConfig;
use flowdesc_lib::generation::{GenerationConfig, ImageRef, ModelError};
use flowdesc_lib::image_loader::encode_png;
use flowdesc_lib::{
    Config, DescribeOptions, Detection, Detections, FlowDescriber, FlowError, ImageInput,
    OcrAdapter, OcrEngine, OcrError, PipelineResult, Region, TextGenerator, VisionGenerator,
    VisionOutcome, VisionRequest,
};
use image::DynamicImage;

struct FixedOcr(Option<Vec<&'static str>>);

impl OcrEngine for FixedOcr {
    fn name(&self) -> &str {
        "fixed"
    }

    fn detect(&mut self, _image: &DynamicImage) -> Result<Detections, OcrError> {
        Ok(match &self.0 {
            None => Detections::Absent,
            Some(words) => Detections::Found(
                words
                    .iter()
                    .enumerate()
                    .map(|(i, w)| {
                        Detection::new(Region::from_rect(i as f32 * 10.0, 0.0, 8.0, 4.0), *w, 0.9)
                    })
                    .collect(),
            ),
        })
    }
}

/// Replies from a queue and records every prompt.
#[derive(Default)]
struct Scripted {
    replies: Mutex<Vec<&'static str>>,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn replying(replies: &[&'static str]) -> Arc<Self> {
        let mut queue = replies.to_vec();
        queue.reverse();
        Arc::new(Self {
            replies: Mutex::new(queue),
            prompts: Mutex::default(),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, prompt: &str, _config: &GenerationConfig) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or("fallback reply")
            .to_string())
    }
}

#[derive(Default)]
struct NoVision;

#[async_trait]
impl VisionGenerator for NoVision {
    fn name(&self) -> &str {
        "none"
    }

    async fn describe_image(&self, _request: &VisionRequest) -> Result<String, ModelError> {
        Err(ModelError::Engine("vision not expected".into()))
    }
}

/// Records every vision request and answers with a fixed reply.
struct CapturedVision {
    reply: &'static str,
    requests: Mutex<Vec<VisionRequest>>,
}

#[async_trait]
impl VisionGenerator for CapturedVision {
    fn name(&self) -> &str {
        "captured"
    }

    async fn describe_image(&self, request: &VisionRequest) -> Result<String, ModelError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.reply.to_string())
    }
}

fn describer(words: Option<Vec<&'static str>>, text: Arc<Scripted>) -> FlowDescriber {
    describer_with_vision(words, text, Arc::new(NoVision))
}

fn describer_with_vision(
    words: Option<Vec<&'static str>>,
    text: Arc<Scripted>,
    vision: Arc<dyn VisionGenerator>,
) -> FlowDescriber {
    let ocr = OcrAdapter::new(
        Box::new(FixedOcr(words)),
        PreprocessConfig {
            enabled: false,
            ..PreprocessConfig::default()
        },
        0.0,
    );
    FlowDescriber::with_components(ocr, text, vision, &Config::default())
        .expect("build describer")
}

fn image() -> ImageInput {
    ImageInput::Bytes(encode_png(&DynamicImage::new_rgb8(16, 16)).expect("encode"))
}

#[tokio::test]
async fn absent_detections_fail_without_model_calls() {
    let text = Scripted::replying(&[]);
    let d = describer(None, text.clone());

    for fast in [false, true] {
        let result = d.extract_and_describe(&image(), fast).await.unwrap();
        assert_eq!(result, PipelineResult::ExtractionFailure);
    }
    assert!(text.prompts().is_empty());
}

#[tokio::test]
async fn whitespace_only_text_is_an_extraction_failure() {
    let text = Scripted::replying(&[]);
    let d = describer(Some(vec!["  ", "\t"]), text.clone());

    let result = d.extract_and_describe(&image(), false).await.unwrap();
    assert!(result.is_failure());
    assert!(text.prompts().is_empty());
}

#[tokio::test]
async fn refinement_runs_three_chained_stages() {
    let text = Scripted::replying(&["cleaned text", "it is a flow", "1. Start\n2. Stop"]);
    let d = describer(Some(vec!["flow", "start", "stop"]), text.clone());

    let result = d.extract_and_describe(&image(), false).await.unwrap();
    assert_eq!(result.description(), Some("1. Start\n2. Stop"));

    let prompts = text.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains("flow start stop"));
    assert!(prompts[1].contains("cleaned text"));
    assert!(prompts[2].contains("it is a flow"));
}

#[tokio::test]
async fn fast_mode_makes_one_compressed_call() {
    let text = Scripted::replying(&["Start, then end."]);
    let d = describer(Some(vec!["start", "end"]), text.clone());

    let report = d
        .describe(
            &image(),
            &DescribeOptions {
                fast_mode: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(report.result.description(), Some("Start, then end."));
    assert!(report.trace.is_none());

    let prompts = text.prompts();
    assert_eq!(prompts.len(), 1);
    let fast = report.fast.expect("fast output");
    assert_eq!(prompts[0], fast.prompt.text);
    assert!(fast.prompt.kept_tokens < fast.prompt.original_tokens);
    assert!(prompts[0].contains("<|im_start|>"));
}

#[tokio::test]
async fn fast_mode_ratio_override_keeps_full_prompt() {
    let text = Scripted::replying(&["done"]);
    let d = describer(Some(vec!["start", "end"]), text.clone());

    let report = d
        .describe(
            &image(),
            &DescribeOptions {
                fast_mode: true,
                compression_ratio: Some(1.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let fast = report.fast.unwrap();
    assert_eq!(fast.prompt.kept_tokens, fast.prompt.original_tokens);
    assert!(text.prompts()[0].contains("start end"));
}

#[tokio::test]
async fn empty_stage_output_aborts_the_chain() {
    let text = Scripted::replying(&["cleaned", "   "]);
    let d = describer(Some(vec!["flow"]), text.clone());

    let err = d.extract_and_describe(&image(), false).await.unwrap_err();
    assert!(matches!(err, FlowError::ModelInvocation(ref m) if m.contains("understand")));
    assert_eq!(text.prompts().len(), 2);
}

#[tokio::test]
async fn shutdown_rejects_further_invocations() {
    let text = Scripted::replying(&["a", "b", "c"]);
    let d = describer(Some(vec!["flow"]), text.clone());

    d.shutdown();
    assert!(d.is_shut_down());
    let err = d.extract_and_describe(&image(), false).await.unwrap_err();
    assert!(err.to_string().contains("shut down"), "got: {err}");
    assert!(text.prompts().is_empty());
}

#[tokio::test]
async fn detect_text_never_calls_a_model() {
    let text = Scripted::replying(&[]);
    let d = describer(Some(vec!["hello", "world"]), text.clone());
    let dir = tempfile::tempdir().unwrap();

    let report = d.detect_text(&image(), Some(dir.path())).await.unwrap();
    assert!(report.passed);
    assert_eq!(report.joined_text, "hello world");
    let artifacts = report.artifacts.expect("artifacts written");
    assert!(artifacts.annotated.exists());
    assert!(text.prompts().is_empty());
}

#[tokio::test]
async fn accessible_url_gets_one_vision_request_with_the_url() {
    let (base, _) = common::serve_once("200 OK", "png");
    let url = format!("{base}/flow.png");
    let vision = Arc::new(CapturedVision {
        reply: "  1. Receive order\n2. Ship  ",
        requests: Mutex::default(),
    });
    let text = Scripted::replying(&[]);
    let d = describer_with_vision(None, text.clone(), vision.clone());

    let outcome = d.describe_from_url(&url).await.unwrap();
    assert_eq!(
        outcome,
        VisionOutcome::Description {
            text: "  1. Receive order\n2. Ship  ".to_string()
        }
    );

    let requests = vision.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].image, ImageRef::Url(url.clone()));
    assert_eq!(
        requests[0].instruction,
        "Describe what this flowgraph is about step by step:"
    );
    assert!(text.prompts().is_empty());
}

#[tokio::test]
async fn missing_url_skips_the_vision_model() {
    let (base, _) = common::serve_once("404 Not Found", "");
    let vision = Arc::new(CapturedVision {
        reply: "unused",
        requests: Mutex::default(),
    });
    let d = describer_with_vision(None, Scripted::replying(&[]), vision.clone());

    let outcome = d
        .describe_from_url(&format!("{base}/missing.png"))
        .await
        .unwrap();
    match outcome {
        VisionOutcome::Inaccessible { accessibility } => {
            assert_eq!(accessibility.message(), "Image not found (404).")
        }
        other => panic!("expected inaccessible outcome, got {other:?}"),
    }
    assert!(vision.requests.lock().unwrap().is_empty());
}
