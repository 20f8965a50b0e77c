//! 对象缓存
//!
//! 后端以插件形式注册（见 [`declare_object_cache_plugin!`]），启动时按配置的
//! `cache.type` 选择。值统一以 JSON 字符串保存，类型化读写由 [`get_json`] 与
//! [`insert_json`] 完成。

pub mod object_cache;
pub mod register;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

/// 缓存读取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheResult<T> {
    Found(T),
    NotFound,
    /// 后端出错，无法确定键是否存在
    ExistsButNoValue,
}

#[async_trait]
pub trait ObjectCache: Send + Sync {
    async fn get_raw(&self, key: &str) -> CacheResult<String>;

    /// `ttl` 为 0 时使用 `cache.default_ttl`
    async fn insert_raw(&self, key: String, value: String, ttl: u64);

    async fn remove(&self, key: &str);

    async fn invalidate_all(&self);
}

/// 读取并反序列化；内容损坏时移除该键
pub async fn get_json<T: DeserializeOwned>(cache: &dyn ObjectCache, key: &str) -> Option<T> {
    match cache.get_raw(key).await {
        CacheResult::Found(raw) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!("Dropping undecodable cache entry '{}': {}", key, e);
                cache.remove(key).await;
                None
            }
        },
        CacheResult::NotFound | CacheResult::ExistsButNoValue => None,
    }
}

pub async fn insert_json<T: Serialize>(cache: &dyn ObjectCache, key: &str, value: &T, ttl: u64) {
    match serde_json::to_string(value) {
        Ok(raw) => cache.insert_raw(key.to_string(), raw, ttl).await,
        Err(e) => tracing::warn!("Failed to serialize cache entry '{}': {}", key, e),
    }
}

/// 注册对象缓存插件
///
/// 类型需提供 `fn new() -> Result<Self, String>`，在进程启动时通过 `ctor` 注册。
#[macro_export]
macro_rules! declare_object_cache_plugin {
    ($name:expr, $ty:ty) => {
        #[ctor::ctor]
        unsafe fn __register_object_cache_plugin() {
            $crate::cache::register::register_object_cache_plugin(
                $name,
                std::sync::Arc::new(|| -> $crate::cache::register::BoxedObjectCacheFuture {
                    Box::pin(async {
                        let cache = <$ty>::new()
                            .map_err($crate::errors::LearnHubError::cache_connection)?;
                        Ok::<Box<dyn $crate::cache::ObjectCache>, $crate::errors::LearnHubError>(
                            Box::new(cache),
                        )
                    })
                }),
            );
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapCache(Mutex<HashMap<String, String>>);

    #[async_trait]
    impl ObjectCache for MapCache {
        async fn get_raw(&self, key: &str) -> CacheResult<String> {
            match self.0.lock().unwrap().get(key) {
                Some(v) => CacheResult::Found(v.clone()),
                None => CacheResult::NotFound,
            }
        }

        async fn insert_raw(&self, key: String, value: String, _ttl: u64) {
            self.0.lock().unwrap().insert(key, value);
        }

        async fn remove(&self, key: &str) {
            self.0.lock().unwrap().remove(key);
        }

        async fn invalidate_all(&self) {
            self.0.lock().unwrap().clear();
        }
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let cache = MapCache::default();
        insert_json(&cache, "stats", &vec![1, 2, 3], 10).await;
        let back: Option<Vec<i32>> = get_json(&cache, "stats").await;
        assert_eq!(back, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_removed() {
        let cache = MapCache::default();
        cache
            .insert_raw("stats".into(), "not json".into(), 0)
            .await;
        let back: Option<Vec<i32>> = get_json(&cache, "stats").await;
        assert!(back.is_none());
        assert_eq!(cache.get_raw("stats").await, CacheResult::NotFound);
    }
}
