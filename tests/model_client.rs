mod common;

use std::time::Duration;

use common::{serve_once, serve_silently};
use flowdesc_lib::config::ModelConfig;
use flowdesc_lib::generation::ImageRef;
use flowdesc_lib::{
    GenerationConfig, ModelError, OpenAiCompatClient, TextGenerator, VisionGenerator,
    VisionRequest,
};

fn client(endpoint: &str, timeout: Duration) -> OpenAiCompatClient {
    OpenAiCompatClient::new(&ModelConfig {
        endpoint: format!("{endpoint}/v1/"),
        api_key: Some("test-key".to_string()),
        request_timeout: timeout,
        ..ModelConfig::default()
    })
    .expect("build client")
}

fn vision_request() -> VisionRequest {
    VisionRequest {
        system_prompt: "You describe images.".to_string(),
        instruction: "Describe this flowgraph".to_string(),
        image: ImageRef::Url("https://example.com/flow.png".to_string()),
        temperature: 0.5,
        max_tokens: Some(128),
    }
}

#[tokio::test]
async fn completion_posts_prompt_and_returns_first_choice() {
    let (base, request) = serve_once(
        "200 OK",
        r#"{"choices":[{"text":"cleaned labels","index":0},{"text":"second","index":1}]}"#,
    );
    let text = client(&base, Duration::from_secs(5))
        .invoke("raw ocr text", &GenerationConfig::default())
        .await
        .expect("completion");
    assert_eq!(text, "cleaned labels");

    let request = request.recv().expect("request captured");
    assert!(request.starts_with("POST /v1/completions HTTP/1.1"), "got: {request}");
    assert!(request.to_ascii_lowercase().contains("authorization: bearer test-key"));
    assert!(request.contains("\"prompt\":\"raw ocr text\""));
    assert!(request.contains("<|im_end|>"));
}

#[tokio::test]
async fn chat_reply_is_returned_verbatim() {
    let (base, request) = serve_once(
        "200 OK",
        r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"1. Start\n2. Stop"}}]}"#,
    );
    let text = client(&base, Duration::from_secs(5))
        .describe_image(&vision_request())
        .await
        .expect("chat completion");
    assert_eq!(text, "1. Start\n2. Stop");

    let request = request.recv().expect("request captured");
    assert!(request.starts_with("POST /v1/chat/completions HTTP/1.1"), "got: {request}");
    assert!(request.contains("https://example.com/flow.png"));
    assert!(request.contains("\"max_tokens\":128"));
}

#[tokio::test]
async fn server_error_maps_to_api_error_with_status() {
    let (base, _) = serve_once("500 Internal Server Error", r#"{"error":"model crashed"}"#);
    let err = client(&base, Duration::from_secs(5))
        .invoke("prompt", &GenerationConfig::default())
        .await
        .unwrap_err();

    match err {
        ModelError::Api { status, message } => {
            assert_eq!(status, 500);
            assert!(message.contains("model crashed"));
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_choices_is_an_empty_response() {
    let (base, _) = serve_once("200 OK", r#"{"choices":[]}"#);
    let err = client(&base, Duration::from_secs(5))
        .invoke("prompt", &GenerationConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::EmptyResponse), "got {err:?}");

    let (base, _) = serve_once("200 OK", r#"{"choices":[{"message":{"content":null}}]}"#);
    let err = client(&base, Duration::from_secs(5))
        .describe_image(&vision_request())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::EmptyResponse), "got {err:?}");
}

#[tokio::test]
async fn slow_server_maps_to_timeout() {
    let base = serve_silently(Duration::from_secs(3));
    let timeout = Duration::from_millis(300);
    let err = client(&base, timeout)
        .invoke("prompt", &GenerationConfig::default())
        .await
        .unwrap_err();

    match err {
        ModelError::Timeout(after) => assert_eq!(after, timeout),
        other => panic!("expected timeout, got {other:?}"),
    }
}
