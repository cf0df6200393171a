//! Tests for the OpenAI driver against a local canned HTTP server.

use fabula_core::{GenerateRequest, Message};
use fabula_interface::CompletionDriver;
use fabula_models::OpenAIDriver;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one HTTP response and return the raw request that was received.
async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let lower = l.to_ascii_lowercase();
                        lower
                            .strip_prefix("content-length:")
                            .map(|v| v.trim().parse::<usize>().unwrap())
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        let response = format!(
            "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&buf).to_string()
    });

    (format!("http://{}/v1", addr), handle)
}

fn request() -> GenerateRequest {
    GenerateRequest {
        messages: vec![
            Message::system("You are a creative writing assistant."),
            Message::user("Write one line about fog."),
        ],
        temperature: Some(0.7),
        max_tokens: Some(1000),
        model: None,
    }
}

#[tokio::test]
async fn test_generate_parses_chat_response() {
    let (base_url, server) = serve_once(
        "HTTP/1.1 200 OK",
        r#"{"choices":[{"message":{"role":"assistant","content":"The fog ate the shore."},"finish_reason":"stop"}],"usage":{"prompt_tokens":20,"completion_tokens":6}}"#,
    )
    .await;

    let driver = OpenAIDriver::with_endpoint("test-key".to_string(), "gpt-3.5-turbo", &base_url, 5)
        .unwrap();
    let response = driver.generate(&request()).await.unwrap();

    assert_eq!(response.text, "The fog ate the shore.");
    assert_eq!(response.usage.unwrap().prompt_tokens, 20);

    let raw = server.await.unwrap();
    assert!(raw.starts_with("POST /v1/chat/completions"));
    assert!(raw.contains("Bearer test-key"));
    assert!(raw.contains("\"model\":\"gpt-3.5-turbo\""));
    assert!(raw.contains("creative writing assistant"));
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let (base_url, _server) =
        serve_once("HTTP/1.1 503 Service Unavailable", r#"{"error":"overloaded"}"#).await;

    let driver = OpenAIDriver::with_endpoint("k".to_string(), "gpt-3.5-turbo", &base_url, 5)
        .unwrap();
    let err = driver.generate(&request()).await.unwrap_err();

    let models = err.models().expect("backend error");
    assert!(models.kind.is_retryable());
}

#[tokio::test]
async fn test_unauthorized_is_not_retryable() {
    let (base_url, _server) =
        serve_once("HTTP/1.1 401 Unauthorized", r#"{"error":"bad key"}"#).await;

    let driver = OpenAIDriver::with_endpoint("k".to_string(), "gpt-3.5-turbo", &base_url, 5)
        .unwrap();
    let err = driver.generate(&request()).await.unwrap_err();

    assert!(!err.models().unwrap().kind.is_retryable());
}

#[test]
fn test_driver_reports_provider_and_model() {
    let driver =
        OpenAIDriver::with_endpoint("k".to_string(), "gpt-4o-mini", "http://localhost/v1", 5)
            .unwrap();
    assert_eq!(driver.provider_name(), "openai");
    assert_eq!(driver.model_name(), "gpt-4o-mini");
    assert_eq!(driver.endpoint(), "http://localhost/v1/chat/completions");
}

#[cfg(feature = "api")]
#[tokio::test]
async fn test_live_openai_completion() {
    let _ = dotenvy::dotenv();
    let driver = OpenAIDriver::from_env(fabula_models::DEFAULT_MODEL, 60).unwrap();
    let response = driver.generate(&request()).await.unwrap();
    assert!(!response.is_blank());
}
