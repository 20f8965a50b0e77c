//! 外部调用的指数退避重试
//!
//! 用于包装可能瞬时失败的远程调用（LLM 生成、邮件发送、冷启动时的数据库连接）。
//!
//! - 第一次调用成功时直接返回，不等待也不打日志
//! - 失败且错误可重试时，按 `min(base * 2^(attempt-1), max)` 计算等待时间后重试
//! - 重试次数耗尽或错误不可重试时，原样返回最后一次的错误（不做包装）
//!
//! 超时包装 [`with_timeout`] 与重试相互独立，需要时先包装单次调用再交给重试。

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// 错误是否值得重试
///
/// 瞬时错误（限流、服务暂不可用、超时、连接失败）返回 true；
/// 结构性错误（响应格式错误、校验失败）返回 false，重试无法修复。
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// 重试配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// 最大重试次数（不含首次调用）
    pub max_retries: u32,
    /// 基础等待时间（毫秒）
    pub base_delay_ms: u64,
    /// 单次等待上限（毫秒）
    pub max_delay_ms: u64,
    /// 是否添加随机抖动
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::llm()
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            jitter: false,
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// LLM 调用：3 次重试，1s 起步，最多等 10s
    pub fn llm() -> Self {
        Self::new(3, 1_000, 10_000).with_jitter(true)
    }

    /// 邮件发送：2 次重试，500ms 起步，最多等 5s
    pub fn email() -> Self {
        Self::new(2, 500, 5_000)
    }

    /// 冷启动数据库连接：5 次重试，200ms 起步，最多等 3s
    pub fn database() -> Self {
        Self::new(5, 200, 3_000)
    }

    /// 第 `attempt` 次失败后的等待时间（attempt 从 1 开始），不含抖动
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_millis(backoff_delay_ms(
            attempt,
            self.base_delay_ms,
            self.max_delay_ms,
        ))
    }

    fn next_delay(&self, attempt: u32) -> Duration {
        let delay_ms = backoff_delay_ms(attempt, self.base_delay_ms, self.max_delay_ms);
        if self.jitter {
            let random = rand::rng().random_range(0.0..1.0);
            Duration::from_millis(apply_jitter(delay_ms, self.max_delay_ms, random))
        } else {
            Duration::from_millis(delay_ms)
        }
    }
}

/// 计算退避时间：`min(base * 2^(attempt-1), max)`
///
/// `attempt` 从 1 开始；0 按 1 处理。移位与乘法均饱和，不会溢出。
pub fn backoff_delay_ms(attempt: u32, base_delay_ms: u64, max_delay_ms: u64) -> u64 {
    let exponent = attempt.saturating_sub(1).min(63);
    let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
    base_delay_ms.saturating_mul(factor).min(max_delay_ms)
}

/// 在基础等待时间上增加至多 25% 的抖动，结果仍不超过上限
///
/// `random` 取值 `[0.0, 1.0)`。
pub fn apply_jitter(delay_ms: u64, max_delay_ms: u64, random: f64) -> u64 {
    let extra = (delay_ms as f64 * 0.25 * random.clamp(0.0, 1.0)).round() as u64;
    delay_ms.saturating_add(extra).min(max_delay_ms)
}

/// 一次重试前的观测信息
#[derive(Debug)]
pub struct RetryAttempt<'a, E> {
    /// 刚失败的是第几次尝试（从 1 开始）
    pub attempt: u32,
    pub max_retries: u32,
    /// 即将等待的时间
    pub delay: Duration,
    pub error: &'a E,
}

/// 带指数退避的重试，不需要观测回调时使用
pub async fn retry_with_backoff<T, E, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
{
    retry_with_backoff_observed(config, operation, |_| {}).await
}

/// 带指数退避的重试，每次等待前调用 `on_retry`
pub async fn retry_with_backoff_observed<T, E, F, Fut, N>(
    config: &RetryConfig,
    mut operation: F,
    mut on_retry: N,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
    N: FnMut(&RetryAttempt<'_, E>),
{
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if attempt > config.max_retries || !error.is_retryable() {
            return Err(error);
        }

        let delay = config.next_delay(attempt);
        on_retry(&RetryAttempt {
            attempt,
            max_retries: config.max_retries,
            delay,
            error: &error,
        });

        tokio::time::sleep(delay).await;
    }
}

/// 以 `warn` 级别记录重试，供各集成客户端作为回调使用
pub fn log_retry<E: std::fmt::Display>(operation: &str) -> impl FnMut(&RetryAttempt<'_, E>) + '_ {
    move |retry| {
        warn!(
            operation,
            attempt = retry.attempt,
            max_retries = retry.max_retries,
            delay_ms = retry.delay.as_millis() as u64,
            "External call failed, retrying: {}",
            retry.error
        );
    }
}

/// 超时错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation timed out after {0:?}")]
pub struct TimeoutElapsed(pub Duration);

/// 为单次调用设置超时，超时后返回由 [`TimeoutElapsed`] 转换而来的错误
pub async fn with_timeout<T, E, Fut>(duration: Duration, future: Fut) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: From<TimeoutElapsed>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(E::from(TimeoutElapsed(duration))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum FakeError {
        Unavailable(u32),
        Malformed,
        TimedOut(Duration),
    }

    impl Retryable for FakeError {
        fn is_retryable(&self) -> bool {
            !matches!(self, FakeError::Malformed)
        }
    }

    impl From<TimeoutElapsed> for FakeError {
        fn from(err: TimeoutElapsed) -> Self {
            FakeError::TimedOut(err.0)
        }
    }

    fn config(max_retries: u32) -> RetryConfig {
        RetryConfig::new(max_retries, 100, 1_000)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_call_success_has_no_retry() {
        let calls = Cell::new(0u32);
        let mut retries = 0u32;

        let result: Result<&str, FakeError> = retry_with_backoff_observed(
            &config(3),
            || {
                calls.set(calls.get() + 1);
                async { Ok("done") }
            },
            |_| retries += 1,
        )
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.get(), 1);
        assert_eq!(retries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_k_times_then_succeeds() {
        for k in 0..=3u32 {
            let calls = Cell::new(0u32);
            let mut delays = Vec::new();

            let result = retry_with_backoff_observed(
                &config(3),
                || {
                    let n = calls.get() + 1;
                    calls.set(n);
                    async move {
                        if n <= k {
                            Err(FakeError::Unavailable(n))
                        } else {
                            Ok(n)
                        }
                    }
                },
                |retry| delays.push(retry.delay),
            )
            .await;

            assert_eq!(result, Ok(k + 1));
            assert_eq!(delays.len() as u32, k);
            for pair in delays.windows(2) {
                assert!(pair[1] > pair[0] || pair[1] == Duration::from_millis(1_000));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_calls_max_plus_one_and_returns_last_error() {
        let calls = Cell::new(0u32);
        let mut attempts = Vec::new();

        let result: Result<(), FakeError> = retry_with_backoff_observed(
            &config(4),
            || {
                let n = calls.get() + 1;
                calls.set(n);
                async move { Err(FakeError::Unavailable(n)) }
            },
            |retry| attempts.push((retry.attempt, retry.max_retries)),
        )
        .await;

        assert_eq!(calls.get(), 5);
        assert_eq!(result, Err(FakeError::Unavailable(5)));
        assert_eq!(attempts, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_calls_once() {
        let calls = Cell::new(0u32);
        let result: Result<(), FakeError> = retry_with_backoff(&config(0), || {
            calls.set(calls.get() + 1);
            async { Err(FakeError::Unavailable(1)) }
        })
        .await;

        assert_eq!(calls.get(), 1);
        assert_eq!(result, Err(FakeError::Unavailable(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_structural_error_is_not_retried() {
        let calls = Cell::new(0u32);
        let mut retries = 0u32;

        let result: Result<(), FakeError> = retry_with_backoff_observed(
            &config(5),
            || {
                calls.set(calls.get() + 1);
                async { Err(FakeError::Malformed) }
            },
            |_| retries += 1,
        )
        .await;

        assert_eq!(result, Err(FakeError::Malformed));
        assert_eq!(calls.get(), 1);
        assert_eq!(retries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_the_reported_delay() {
        let start = tokio::time::Instant::now();
        let calls = Cell::new(0u32);

        let _: Result<(), FakeError> = retry_with_backoff(&config(2), || {
            calls.set(calls.get() + 1);
            async { Err(FakeError::Unavailable(0)) }
        })
        .await;

        // 100ms + 200ms
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(310));
    }

    #[test]
    fn test_backoff_delay_sequence() {
        assert_eq!(backoff_delay_ms(1, 100, 10_000), 100);
        assert_eq!(backoff_delay_ms(2, 100, 10_000), 200);
        assert_eq!(backoff_delay_ms(3, 100, 10_000), 400);
        assert_eq!(backoff_delay_ms(4, 100, 10_000), 800);
        assert_eq!(backoff_delay_ms(0, 100, 10_000), 100);
    }

    #[test]
    fn test_backoff_delay_never_exceeds_max() {
        for attempt in 0..200 {
            assert!(backoff_delay_ms(attempt, 1_000, 60_000) <= 60_000);
            assert!(backoff_delay_ms(attempt, u64::MAX, 5_000) <= 5_000);
        }
        assert_eq!(backoff_delay_ms(u32::MAX, 1_000, 60_000), 60_000);
    }

    #[test]
    fn test_jitter_stays_within_cap() {
        assert_eq!(apply_jitter(1_000, 10_000, 0.0), 1_000);
        assert_eq!(apply_jitter(1_000, 10_000, 1.0), 1_250);
        assert_eq!(apply_jitter(9_000, 10_000, 1.0), 10_000);

        let cfg = RetryConfig::new(10, 1_000, 4_000).with_jitter(true);
        for attempt in 1..=10 {
            assert!(cfg.next_delay(attempt) <= Duration::from_millis(4_000));
        }
    }

    #[test]
    fn test_presets() {
        let llm = RetryConfig::llm();
        assert_eq!(llm.max_retries, 3);
        assert!(llm.jitter);
        assert_eq!(RetryConfig::email().max_delay_ms, 5_000);
        assert_eq!(
            RetryConfig::database().delay_for_attempt(2),
            Duration::from_millis(400)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_distinct_error() {
        let result: Result<(), FakeError> = with_timeout(Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert_eq!(result, Err(FakeError::TimedOut(Duration::from_secs(1))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_composes_with_retry() {
        let calls = Cell::new(0u32);

        let result: Result<u32, FakeError> = retry_with_backoff(&config(2), || {
            let n = calls.get() + 1;
            calls.set(n);
            with_timeout(Duration::from_millis(50), async move {
                if n == 1 {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Ok(n)
            })
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.get(), 2);
    }
}
