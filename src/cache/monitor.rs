use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::llm::client::types::TokenUsage;

/// 缓存效果监控器 - 命中节省的tokens与成本计入这里，而不是会话账本
#[derive(Clone, Default)]
pub struct CacheMonitor {
    metrics: Arc<CacheMetrics>,
}

#[derive(Default)]
struct CacheMetrics {
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    cache_writes: AtomicUsize,
    cache_errors: AtomicUsize,
    tokens_saved: AtomicUsize,
    /// 毫美元存储，避免浮点原子
    milli_dollars_saved: AtomicU64,
}

impl CacheMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录缓存命中
    pub fn record_cache_hit(&self, category: &str, token_usage: &TokenUsage, model_name: &str) {
        self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .tokens_saved
            .fetch_add(token_usage.total(), Ordering::Relaxed);

        let cost_saved = token_usage.estimate_cost(model_name);
        self.metrics
            .milli_dollars_saved
            .fetch_add((cost_saved * 1000.0) as u64, Ordering::Relaxed);

        println!(
            "   💰 缓存命中 [{}] - 节省tokens: {}, 估算节省成本: ${:.4}",
            category,
            token_usage.total(),
            cost_saved
        );
    }

    /// 记录缓存未命中
    pub fn record_cache_miss(&self, category: &str) {
        self.metrics.cache_misses.fetch_add(1, Ordering::Relaxed);
        println!("   ⌛ 缓存未命中 [{}] - 需要进行AI推理", category);
    }

    /// 记录缓存写入
    pub fn record_cache_write(&self, category: &str) {
        self.metrics.cache_writes.fetch_add(1, Ordering::Relaxed);
        println!("   💾 缓存写入 [{}] - 结果已缓存", category);
    }

    /// 记录缓存错误
    pub fn record_cache_error(&self, category: &str, error: &str) {
        self.metrics.cache_errors.fetch_add(1, Ordering::Relaxed);
        eprintln!("   ❌ 缓存错误 [{}]: {}", category, error);
    }

    /// 生成一行式摘要
    pub fn summary(&self) -> String {
        let hits = self.metrics.cache_hits.load(Ordering::Relaxed);
        let misses = self.metrics.cache_misses.load(Ordering::Relaxed);
        let tokens_saved = self.metrics.tokens_saved.load(Ordering::Relaxed);
        let cost_saved = self.metrics.milli_dollars_saved.load(Ordering::Relaxed) as f64 / 1000.0;

        format!(
            "缓存命中 {} / 未命中 {}，节省tokens {}，估算节省成本 ${:.4}",
            hits, misses, tokens_saved, cost_saved
        )
    }
}
