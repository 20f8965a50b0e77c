//! 第三方服务集成
//!
//! 大模型与邮件服务都通过轻量 HTTP 客户端接入，单次调用先套超时再交给
//! [`retry_with_backoff_observed`](crate::utils::retry::retry_with_backoff_observed)。

pub mod error;
pub mod llm;
pub mod mailer;
pub mod prompts;

pub use error::ExternalError;
pub use llm::{DisabledLlmClient, HttpLlmClient, LlmClient, create_llm_client, generate_json};
pub use mailer::{EmailMessage, HttpMailer, LogMailer, Mailer, create_mailer, spawn_send};
