//! 大模型客户端（OpenAI 兼容的 `/chat/completions` 接口）

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::ExternalError;
use crate::config::LlmConfig;
use crate::utils::retry::{RetryConfig, log_retry, retry_with_backoff_observed, with_timeout};

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn is_configured(&self) -> bool;

    /// 返回模型的文本输出
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ExternalError>;
}

/// 调用模型并把输出解析为 `T`
///
/// 解析失败属于结构性错误，返回 [`ExternalError::MalformedResponse`]，不会重试。
pub async fn generate_json<T: DeserializeOwned>(
    client: &dyn LlmClient,
    system: &str,
    prompt: &str,
) -> Result<T, ExternalError> {
    let text = client.complete(system, prompt).await?;
    parse_json_response(&text)
}

/// 从模型输出中取出 JSON 主体
///
/// 依次尝试：```json 代码块、首个 `{`/`[` 到最后一个 `}`/`]` 的片段、原文。
pub fn extract_json_block(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    let open = trimmed.find(['{', '[']);
    let close = trimmed.rfind(['}', ']']);
    match (open, close) {
        (Some(o), Some(c)) if c > o => &trimmed[o..=c],
        _ => trimmed,
    }
}

pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T, ExternalError> {
    let body = extract_json_block(text);
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(120).collect();
        ExternalError::MalformedResponse(format!("{e} (output starts with: {preview:?})"))
    })
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct HttpLlmClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
    retry: RetryConfig,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig, retry: RetryConfig) -> Result<Self, ExternalError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExternalError::Config(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            retry,
        })
    }

    async fn send_once(&self, system: &str, prompt: &str) -> Result<String, ExternalError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();
            return Err(ExternalError::from_status(
                status.as_u16(),
                truncate(&text, 300),
                retry_after,
            ));
        }

        // 读取中断记为传输错误，解析失败记为结构性错误
        let raw = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ExternalError::Timeout(None)
            } else {
                ExternalError::Transport(e.to_string())
            }
        })?;
        let parsed: ChatResponse = serde_json::from_slice(&raw)
            .map_err(|e| ExternalError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ExternalError::MalformedResponse("completion has no content".into()))
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    fn is_configured(&self) -> bool {
        true
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ExternalError> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "Sending completion request");
        retry_with_backoff_observed(
            &self.retry,
            || with_timeout(self.timeout, self.send_once(system, prompt)),
            log_retry("llm.complete"),
        )
        .await
    }
}

/// 未配置 API key 时使用，所有调用立即失败且不重试
pub struct DisabledLlmClient;

#[async_trait]
impl LlmClient for DisabledLlmClient {
    fn is_configured(&self) -> bool {
        false
    }

    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ExternalError> {
        Err(ExternalError::Config("llm.api_key is not set".into()))
    }
}

pub fn create_llm_client(
    config: &LlmConfig,
    retry: &RetryConfig,
) -> Result<Arc<dyn LlmClient>, ExternalError> {
    if !config.is_configured() {
        tracing::warn!("LLM API key not configured, AI generation is disabled");
        return Ok(Arc::new(DisabledLlmClient));
    }
    Ok(Arc::new(HttpLlmClient::new(config, retry.clone())?))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::retry::Retryable;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Outline {
        title: String,
    }

    struct CannedLlm(&'static str);

    #[async_trait]
    impl LlmClient for CannedLlm {
        fn is_configured(&self) -> bool {
            true
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ExternalError> {
            Ok(self.0.to_string())
        }
    }

    // 接受一次连接，读完请求后写入给定的原始响应并断开
    fn serve_once(raw: &'static [u8]) -> std::net::SocketAddr {
        use std::io::{BufRead, BufReader, Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();
            let mut stream = reader.into_inner();
            stream.write_all(raw).unwrap();
            stream.flush().unwrap();
        });
        addr
    }

    fn client_for(addr: std::net::SocketAddr) -> HttpLlmClient {
        let config = LlmConfig {
            base_url: format!("http://{addr}"),
            api_key: "test-key".to_string(),
            ..LlmConfig::default()
        };
        HttpLlmClient::new(&config, RetryConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_truncated_body_is_retryable_transport_error() {
        let addr = serve_once(
            b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 200\r\nconnection: close\r\n\r\n{\"choices\":[",
        );
        let err = client_for(addr).send_once("system", "prompt").await.unwrap_err();
        assert!(matches!(err, ExternalError::Transport(_)), "{err:?}");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_undecodable_body_is_malformed() {
        let addr = serve_once(
            b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 8\r\nconnection: close\r\n\r\nnot json",
        );
        let err = client_for(addr).send_once("system", "prompt").await.unwrap_err();
        assert!(matches!(err, ExternalError::MalformedResponse(_)), "{err:?}");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_extract_from_fenced_block() {
        let text = "Here you go:\n```json\n{\"title\": \"Rust\"}\n```\nEnjoy!";
        assert_eq!(extract_json_block(text), "{\"title\": \"Rust\"}");
    }

    #[test]
    fn test_extract_from_surrounding_prose() {
        let text = "Sure! {\"title\": \"Go\"} Hope that helps.";
        assert_eq!(extract_json_block(text), "{\"title\": \"Go\"}");
    }

    #[test]
    fn test_extract_plain_json() {
        assert_eq!(extract_json_block("  [1, 2]  "), "[1, 2]");
    }

    #[test]
    fn test_parse_failure_is_malformed_and_not_retryable() {
        let err = parse_json_response::<Outline>("no json here").unwrap_err();
        assert!(matches!(err, ExternalError::MalformedResponse(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_generate_json_parses_fenced_output() {
        let llm = CannedLlm("```json\n{\"title\":\"Databases\"}\n```");
        let outline: Outline = generate_json(&llm, "sys", "prompt").await.unwrap();
        assert_eq!(outline.title, "Databases");
    }

    #[tokio::test]
    async fn test_disabled_client_fails_fast() {
        let err = DisabledLlmClient.complete("s", "p").await.unwrap_err();
        assert!(matches!(err, ExternalError::Config(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_factory_without_key_returns_disabled_client() {
        let client = create_llm_client(&LlmConfig::default(), &RetryConfig::llm()).unwrap();
        assert!(!client.is_configured());
    }
}
