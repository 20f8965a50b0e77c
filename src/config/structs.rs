use serde::{Deserialize, Serialize};

use crate::utils::retry::RetryConfig;

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub cors: CorsConfig,
    #[serde(default)]
    pub argon2: Argon2Config,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub credits: CreditsConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub retry: RetrySettings,
}

/// 应用设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub system_name: String,
    pub environment: String,
    pub log_level: String,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub unix_socket_path: String,
    pub workers: usize,
    pub max_workers: usize,
    pub timeouts: TimeoutConfig,
    pub limits: LimitConfig,
}

/// 超时配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub client_request: u64,
    pub client_disconnect: u64,
    pub keep_alive: u64,
}

/// 限制配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConfig {
    pub max_payload_size: usize,
}

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    #[serde(skip_serializing, default)] // 不序列化到JSON响应中
    pub secret: String,
    pub access_token_expiry: i64,
    pub refresh_token_expiry: i64,
    pub refresh_token_remember_me_expiry: i64,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,    // 数据库连接 URL（从 scheme 自动推断类型）
    pub pool_size: u32, // 连接池大小
    pub timeout: u64,   // 连接超时 (秒)
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(rename = "type")]
    pub cache_type: String,
    pub default_ttl: u64,
    /// 管理后台统计缓存时长 (秒)
    #[serde(default = "default_stats_ttl")]
    pub stats_ttl: u64,
    pub redis: RedisConfig,
    pub memory: MemoryConfig,
}

/// Redis 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub key_prefix: String,
    pub pool_size: u64,
}

/// 内存缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub max_capacity: u64,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub max_age: usize,
}

fn default_stats_ttl() -> u64 {
    60
}

/// Argon2 密码哈希参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Argon2Config {
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_cost: 19456,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

/// 大模型服务配置（OpenAI 兼容接口）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model: String,
    /// 单次请求超时 (秒)
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

impl LlmConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// 邮件服务配置
///
/// `provider` 为 `http` 时通过 HTTP 接口发送，为 `log` 时仅写日志。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub provider: String,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub from: String,
    pub timeout_secs: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: "log".to_string(),
            base_url: "https://api.resend.com".to_string(),
            api_key: String::new(),
            from: "LearnHub <noreply@learnhub.local>".to_string(),
            timeout_secs: 15,
        }
    }
}

/// 积分规则
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditsConfig {
    /// 新用户赠送
    pub initial_grant: i64,
    /// 生成一门课程的花费
    pub course_cost: i64,
    /// 额外生成一份资料的花费
    pub material_cost: i64,
    /// 低于该余额时发送提醒邮件
    pub low_balance_threshold: i64,
}

impl Default for CreditsConfig {
    fn default() -> Self {
        Self {
            initial_grant: 100,
            course_cost: 20,
            material_cost: 5,
            low_balance_threshold: 20,
        }
    }
}

/// 课程生成参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub default_chapters: i32,
    pub max_chapters: i32,
    /// 课程就绪后是否立即为每章生成笔记
    pub notes_on_create: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_chapters: 5,
            max_chapters: 12,
            notes_on_create: true,
        }
    }
}

/// 各类外部调用的重试参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub llm: RetryConfig,
    pub email: RetryConfig,
    pub database: RetryConfig,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            llm: RetryConfig::llm(),
            email: RetryConfig::email(),
            database: RetryConfig::database(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    #[test]
    fn test_bundled_config_parses() {
        let config = Config::builder()
            .add_source(File::from_str(
                include_str!("../../config.toml"),
                FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let app: AppConfig = config.try_deserialize().unwrap();
        assert_eq!(app.retry.llm, RetryConfig::llm());
        assert!(app.credits.course_cost > 0);
        assert!(!app.llm.is_configured());
    }

    #[test]
    fn test_optional_sections_fall_back_to_defaults() {
        let retry: RetrySettings = serde_json::from_str("{}").unwrap();
        assert_eq!(retry.database, RetryConfig::database());

        let llm: LlmConfig = serde_json::from_str(r#"{"model":"local"}"#).unwrap();
        assert_eq!(llm.model, "local");
        assert_eq!(llm.timeout_secs, 60);
    }
}
