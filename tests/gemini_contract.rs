//! HTTP contract tests for the Gemini client against a local mock server.

use likeness_lib::encoder::EncodedImage;
use likeness_lib::error::{GenerateError, ServiceError};
use likeness_lib::gemini::{ContentRequest, GeminiClient, GenerativeService, Modality, Part};
use likeness_lib::generate::generate_images;
use likeness_lib::settings::ModelSettings;
use likeness_lib::slots::{CharacterSlot, ContextSlot};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn image_response(data: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"parts": [
                {"text": "Here is your image."},
                {"inlineData": {"mimeType": "image/png", "data": data}}
            ]}
        }]
    })
}

fn character() -> CharacterSlot {
    CharacterSlot {
        id: 1,
        label: "Character 1".into(),
        file: None,
        encoded: Some(EncodedImage {
            data: "Y2hhcg==".into(),
            mime_type: "image/jpeg".into(),
        }),
        selected: true,
    }
}

#[tokio::test]
async fn sends_key_header_and_wire_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(header("X-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "hello"}]}],
            "systemInstruction": {"parts": [{"text": "be brief"}]},
            "generationConfig": {"temperature": 0.5}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "hi there"}]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(server.uri(), "test-key");
    let req = ContentRequest::new("gemini-2.5-flash", vec![Part::text("hello")])
        .with_system_instruction("be brief")
        .with_temperature(0.5);
    let resp = client.generate_content(req).await.unwrap();
    assert_eq!(resp.text.as_deref(), Some("hi there"));
    assert!(resp.images.is_empty());
}

#[tokio::test]
async fn error_status_carries_api_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
        })))
        .mount(&server)
        .await;

    let client = GeminiClient::new(format!("{}/", server.uri()), "bad");
    let err = client
        .generate_content(ContentRequest::new("m", vec![Part::text("x")]))
        .await
        .unwrap_err();
    match err {
        ServiceError::Http { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = GeminiClient::new(server.uri(), "k");
    let err = client
        .generate_content(ContentRequest::new("m", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Decode(_)));
}

#[tokio::test]
async fn generation_run_hits_image_model_twice() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash-image-preview:generateContent"))
        .and(body_partial_json(json!({
            "contents": [{"parts": [
                {"inlineData": {"mimeType": "image/jpeg", "data": "Y2hhcg=="}}
            ]}],
            "generationConfig": {"responseModalities": ["IMAGE", "TEXT"]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("iVBORw0KGgo=")))
        .expect(2)
        .mount(&server)
        .await;

    let client = GeminiClient::new(server.uri(), "k");
    let images = generate_images(
        &client,
        &[character()],
        &ContextSlot::default(),
        "a knight on a horse",
        &ModelSettings::default(),
    )
    .await
    .unwrap();

    assert_eq!(images.len(), 2);
    assert_ne!(images[0].id, images[1].id);
    assert_eq!(images[0].encoded_data, "iVBORw0KGgo=");
    assert_eq!(images[0].mime_type, "image/png");
}

#[tokio::test]
async fn server_error_fails_whole_run() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = GeminiClient::new(server.uri(), "k");
    let err = generate_images(
        &client,
        &[character()],
        &ContextSlot::default(),
        "p",
        &ModelSettings::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GenerateError::Failed(_)));
}

#[test]
fn modalities_serialize_uppercase() {
    assert_eq!(
        serde_json::to_value([Modality::Image, Modality::Text]).unwrap(),
        json!(["IMAGE", "TEXT"])
    );
}
