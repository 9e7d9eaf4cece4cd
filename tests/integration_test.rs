use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

// Use atomic counter to give each test a unique port
static PORT_COUNTER: AtomicU16 = AtomicU16::new(5600);

struct TestServer {
    child: Child,
    port: u16,
}

impl TestServer {
    async fn start() -> Self {
        let port = PORT_COUNTER.fetch_add(1, Ordering::SeqCst);

        let child = Command::new(env!("CARGO_BIN_EXE_ocr-braille-server"))
            .args(["--host", "127.0.0.1", "--port", &port.to_string()])
            .spawn()
            .expect("Failed to start server");

        let server = Self { child, port };
        server.wait_until_ready().await;
        server
    }

    async fn wait_until_ready(&self) {
        let client = reqwest::Client::new();
        let url = format!("{}/health", self.base_url());
        for _ in 0..100 {
            if client.get(&url).send().await.is_ok() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        panic!("Server did not become ready on port {}", self.port);
    }

    fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

async fn transcribe(server: &TestServer, text: Option<&str>, language: Option<&str>) -> String {
    let client = reqwest::Client::new();

    let mut form = Form::new();
    if let Some(text) = text {
        form = form.text("text", text.to_string());
    }
    if let Some(language) = language {
        form = form.text("language", language.to_string());
    }

    let response = client
        .post(format!("{}/transcribe_braille", server.base_url()))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    response.text().await.expect("Failed to read response body")
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response: Value = client
        .get(format!("{}/health", server.base_url()))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(response["status"], "ok");
    assert!(!response["version"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_info_endpoint() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let response: Value = client
        .get(format!("{}/info", server.base_url()))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");

    assert_eq!(response["default_language"], "eng");
    assert_eq!(response["render_dpi"], 300);

    let scripts: Vec<&str> = response["braille_scripts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert!(scripts.contains(&"latin"));
    assert!(scripts.contains(&"arabic"));
}

#[tokio::test]
async fn test_transcribe_braille_french_text_uses_latin_table() {
    let server = TestServer::start().await;

    // "fra" is not a registered code; anything but "ara" selects the Latin table
    let body = transcribe(&server, Some("bonjour"), Some("fra")).await;
    assert_eq!(body, "⠃⠕⠝⠚⠕⠥⠗");
}

#[tokio::test]
async fn test_transcribe_braille_lowercases_input() {
    let server = TestServer::start().await;

    let body = transcribe(&server, Some("Hello!"), Some("eng")).await;
    assert_eq!(body, "⠓⠑⠇⠇⠕⠖");
}

#[tokio::test]
async fn test_transcribe_braille_arabic() {
    let server = TestServer::start().await;

    // lam followed by alef takes the ligature glyph
    let body = transcribe(&server, Some("سلام"), Some("ara")).await;
    assert_eq!(body, "⠎⠯⠍");
}

#[tokio::test]
async fn test_transcribe_braille_defaults() {
    let server = TestServer::start().await;

    // Missing text defaults to empty, missing language defaults to eng
    let body = transcribe(&server, None, None).await;
    assert_eq!(body, "");

    let body = transcribe(&server, Some("hi"), None).await;
    assert_eq!(body, "⠓⠊");
}

#[tokio::test]
async fn test_transcribe_braille_passes_unmapped_characters_through() {
    let server = TestServer::start().await;

    let body = transcribe(&server, Some("a#b"), Some("eng")).await;
    assert_eq!(body, "⠁#⠃");
}

#[tokio::test]
async fn test_ocr_missing_image_field_is_a_client_error() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let form = Form::new().text("language[]", "eng");

    let response = client
        .post(format!("{}/ocr", server.base_url()))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "MISSING_FILE");
    assert!(body["error"].as_str().unwrap().contains("image"));
}

#[tokio::test]
async fn test_ocr_pdf_missing_pdf_field_is_a_client_error() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let form = Form::new().text("language[]", "eng");

    let response = client
        .post(format!("{}/ocr_pdf", server.base_url()))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "MISSING_FILE");
    assert!(body["error"].as_str().unwrap().contains("pdf"));
}

#[tokio::test]
async fn test_ocr_rejects_malformed_language_codes() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    let part = Part::bytes(b"not really an image".to_vec())
        .file_name("scan.png")
        .mime_str("image/png")
        .unwrap();
    let form = Form::new()
        .part("image", part)
        .text("language[]", "eng; rm -rf /");

    let response = client
        .post(format!("{}/ocr", server.base_url()))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], "INVALID_LANGUAGE");
}

#[tokio::test]
async fn test_ocr_with_no_languages_returns_empty_object() {
    let server = TestServer::start().await;
    let client = reqwest::Client::new();

    // The engine is never invoked when no languages are requested
    let part = Part::bytes(b"not really an image".to_vec())
        .file_name("scan.png")
        .mime_str("image/png")
        .unwrap();
    let form = Form::new().part("image", part);

    let response = client
        .post(format!("{}/ocr", server.base_url()))
        .multipart(form)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body, serde_json::json!({}));
}
