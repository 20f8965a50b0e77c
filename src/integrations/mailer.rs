//! 邮件发送

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::ExternalError;
use crate::config::EmailConfig;
use crate::utils::retry::{RetryConfig, log_retry, retry_with_backoff_observed, with_timeout};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn send(&self, message: &EmailMessage) -> Result<(), ExternalError>;
}

#[derive(Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// 通过 HTTP 接口（`POST {base_url}/emails`）发送
pub struct HttpMailer {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
    timeout: Duration,
    retry: RetryConfig,
}

impl HttpMailer {
    pub fn new(config: &EmailConfig, retry: RetryConfig) -> Result<Self, ExternalError> {
        if config.api_key.trim().is_empty() {
            return Err(ExternalError::Config(
                "email.provider is 'http' but email.api_key is empty".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ExternalError::Config(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/emails", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            retry,
        })
    }

    async fn send_once(&self, message: &EmailMessage) -> Result<(), ExternalError> {
        let body = SendEmailBody {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(ExternalError::from_status(status.as_u16(), text, None))
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    fn provider(&self) -> &'static str {
        "http"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), ExternalError> {
        retry_with_backoff_observed(
            &self.retry,
            || with_timeout(self.timeout, self.send_once(message)),
            log_retry("email.send"),
        )
        .await
    }
}

/// 仅写日志，开发环境或未配置邮件服务时使用
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn provider(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), ExternalError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Email not sent (log provider): {}",
            message.text
        );
        Ok(())
    }
}

pub fn create_mailer(
    config: &EmailConfig,
    retry: &RetryConfig,
) -> Result<Arc<dyn Mailer>, ExternalError> {
    match config.provider.as_str() {
        "http" => Ok(Arc::new(HttpMailer::new(config, retry.clone())?)),
        "log" => Ok(Arc::new(LogMailer)),
        other => Err(ExternalError::Config(format!(
            "unknown email provider '{other}', expected 'http' or 'log'"
        ))),
    }
}

/// 后台发送，不阻塞当前请求；失败只记录日志
pub fn spawn_send(mailer: Arc<dyn Mailer>, message: EmailMessage) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&message).await {
            error!(
                to = %message.to,
                subject = %message.subject,
                provider = mailer.provider(),
                "Failed to deliver email: {e}"
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_provider() {
        let config = EmailConfig::default();
        let mailer = create_mailer(&config, &RetryConfig::email()).unwrap();
        assert_eq!(mailer.provider(), "log");

        let http = EmailConfig {
            provider: "http".into(),
            api_key: "re_test".into(),
            ..EmailConfig::default()
        };
        let mailer = create_mailer(&http, &RetryConfig::email()).unwrap();
        assert_eq!(mailer.provider(), "http");
    }

    #[test]
    fn test_http_provider_requires_key() {
        let config = EmailConfig {
            provider: "http".into(),
            ..EmailConfig::default()
        };
        assert!(matches!(
            create_mailer(&config, &RetryConfig::email()),
            Err(ExternalError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = EmailConfig {
            provider: "carrier-pigeon".into(),
            ..EmailConfig::default()
        };
        assert!(create_mailer(&config, &RetryConfig::email()).is_err());
    }

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let message = EmailMessage {
            to: "a@example.com".into(),
            subject: "Hi".into(),
            html: "<p>Hi</p>".into(),
            text: "Hi".into(),
        };
        assert!(LogMailer.send(&message).await.is_ok());
    }
}
