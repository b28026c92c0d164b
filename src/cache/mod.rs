use async_trait::async_trait;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

use crate::config::CacheConfig;
use crate::llm::client::types::{ModelReply, TokenUsage};
use crate::llm::client::{ModelError, ModelInvoker, ModelRequest};

pub mod monitor;
pub use monitor::CacheMonitor;

const CACHE_CATEGORY: &str = "model_replies";

/// 缓存管理器
pub struct CacheManager {
    config: CacheConfig,
    monitor: CacheMonitor,
}

/// 缓存条目
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: u64,
    /// prompt的MD5哈希值，用于缓存键的生成和验证
    pub prompt_hash: String,
    /// token使用情况（可选，用于节省量统计）
    pub token_usage: Option<TokenUsage>,
    /// 使用的模型名称（可选）
    pub model_name: Option<String>,
}

impl CacheManager {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            monitor: CacheMonitor::new(),
        }
    }

    pub fn monitor(&self) -> &CacheMonitor {
        &self.monitor
    }

    /// 生成prompt的MD5哈希
    pub fn hash_prompt(&self, prompt: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(prompt.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// 获取缓存文件路径
    fn get_cache_path(&self, category: &str, hash: &str) -> PathBuf {
        self.config
            .cache_dir
            .join(category)
            .join(format!("{}.json", hash))
    }

    /// 检查缓存是否过期
    fn is_expired(&self, timestamp: u64) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let expire_seconds = self.config.expire_hours * 3600;
        now.saturating_sub(timestamp) > expire_seconds
    }

    /// 获取缓存
    pub async fn get<T>(&self, category: &str, prompt: &str) -> Option<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        if !self.config.enabled {
            return None;
        }

        let hash = self.hash_prompt(prompt);
        let cache_path = self.get_cache_path(category, &hash);

        if !cache_path.exists() {
            self.monitor.record_cache_miss(category);
            return None;
        }

        match fs::read_to_string(&cache_path).await {
            Ok(content) => match serde_json::from_str::<CacheEntry<T>>(&content) {
                Ok(entry) => {
                    if self.is_expired(entry.timestamp) {
                        // 删除过期缓存
                        let _ = fs::remove_file(&cache_path).await;
                        self.monitor.record_cache_miss(category);
                        return None;
                    }

                    if let Some(token_usage) = &entry.token_usage {
                        self.monitor.record_cache_hit(
                            category,
                            token_usage,
                            entry.model_name.as_deref().unwrap_or(""),
                        );
                    }
                    Some(entry.data)
                }
                Err(e) => {
                    self.monitor
                        .record_cache_error(category, &format!("反序列化失败: {}", e));
                    None
                }
            },
            Err(e) => {
                self.monitor
                    .record_cache_error(category, &format!("读取文件失败: {}", e));
                None
            }
        }
    }

    /// 写入缓存（尽力而为，失败只记录不传播）
    pub async fn put<T>(
        &self,
        category: &str,
        prompt: &str,
        data: &T,
        token_usage: Option<TokenUsage>,
        model_name: Option<String>,
    ) where
        T: Serialize,
    {
        if !self.config.enabled {
            return;
        }

        let hash = self.hash_prompt(prompt);
        let cache_path = self.get_cache_path(category, &hash);
        if let Some(parent) = cache_path.parent()
            && let Err(e) = fs::create_dir_all(parent).await
        {
            self.monitor
                .record_cache_error(category, &format!("创建缓存目录失败: {}", e));
            return;
        }

        let entry = CacheEntry {
            data,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            prompt_hash: hash,
            token_usage,
            model_name,
        };

        match serde_json::to_string(&entry) {
            Ok(json) => {
                if let Err(e) = fs::write(&cache_path, json).await {
                    self.monitor
                        .record_cache_error(category, &format!("写入文件失败: {}", e));
                } else {
                    self.monitor.record_cache_write(category);
                }
            }
            Err(e) => {
                self.monitor
                    .record_cache_error(category, &format!("序列化失败: {}", e));
            }
        }
    }
}

/// 带缓存的模型调用器 - 对编排层透明
///
/// 命中时返回缓存响应并将usage与费用清零（tokens计入节省量统计而非会话账本）。
pub struct CachedInvoker {
    inner: Arc<dyn ModelInvoker>,
    cache: Arc<CacheManager>,
}

impl CachedInvoker {
    pub fn new(inner: Arc<dyn ModelInvoker>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }

    fn cache_key(request: &ModelRequest) -> String {
        format!(
            "{}\n---\n{}\n---\n{}",
            request.system_prompt,
            request.user_prompt,
            request
                .response_schema
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_default()
        )
    }
}

#[async_trait]
impl ModelInvoker for CachedInvoker {
    async fn invoke(&self, request: ModelRequest) -> Result<ModelReply, ModelError> {
        let key = Self::cache_key(&request);

        if let Some(mut reply) = self.cache.get::<ModelReply>(CACHE_CATEGORY, &key).await {
            reply.usage = TokenUsage::default();
            reply.cost = 0.0;
            return Ok(reply);
        }

        let reply = self.inner.invoke(request).await?;
        self.cache
            .put(
                CACHE_CATEGORY,
                &key,
                &reply,
                Some(reply.usage.clone()),
                None,
            )
            .await;
        Ok(reply)
    }
}
