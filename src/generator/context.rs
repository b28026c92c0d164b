use std::sync::Arc;

use anyhow::Result;

use crate::{
    cache::{CacheManager, CachedInvoker},
    config::Config,
    llm::client::{LLMClient, ModelInvoker},
    store::SessionStore,
};

/// 生成器上下文 - 贯穿分析与写作两个阶段的共享依赖
#[derive(Clone)]
pub struct GeneratorContext {
    /// 模型调用器（带缓存），编排层只依赖trait
    pub invoker: Arc<dyn ModelInvoker>,
    /// 配置
    pub config: Config,
    /// 缓存管理器
    pub cache: Arc<CacheManager>,
    /// 会话状态容器
    pub store: SessionStore,
}

impl GeneratorContext {
    /// 创建新的生成器上下文（HTTP客户端 + 缓存）
    pub fn new(config: Config) -> Result<Self> {
        let client = LLMClient::new(config.clone())?;
        let cache = Arc::new(CacheManager::new(config.cache.clone()));
        let invoker: Arc<dyn ModelInvoker> =
            Arc::new(CachedInvoker::new(Arc::new(client), cache.clone()));

        Ok(Self {
            invoker,
            config,
            cache,
            store: SessionStore::new(),
        })
    }

    /// 注入自定义调用器的构造（测试用）
    pub fn with_invoker(config: Config, invoker: Arc<dyn ModelInvoker>) -> Self {
        let cache = Arc::new(CacheManager::new(config.cache.clone()));
        Self {
            invoker,
            config,
            cache,
            store: SessionStore::new(),
        }
    }
}
