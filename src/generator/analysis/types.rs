use std::time::Duration;

use crate::llm::client::{ModelError, TokenUsage};

/// 单个提取器的产出 - 数据连同本次任务的token消耗、费用与耗时
#[derive(Debug, Clone)]
pub struct ExtractorReport<T> {
    pub data: T,
    pub usage: TokenUsage,
    pub cost: f64,
    pub duration: Duration,
}

impl<T: Default> ExtractorReport<T> {
    /// 降级产出：空数据、零消耗。提取器失败时管线以此继续
    pub fn degraded() -> Self {
        Self {
            data: T::default(),
            usage: TokenUsage::default(),
            cost: 0.0,
            duration: Duration::ZERO,
        }
    }
}

impl<T> ExtractorReport<T> {
    pub fn new(data: T, usage: TokenUsage, cost: f64, duration: Duration) -> Self {
        Self {
            data,
            usage,
            cost,
            duration,
        }
    }
}

/// 提取器的致命失败 - 错误连同中断前已计费的消耗
///
/// 中途失败前已成功的模型调用照样计费，协调器在传播错误前先入账。
#[derive(Debug)]
pub struct ExtractorFailure {
    pub error: ModelError,
    pub usage: TokenUsage,
    pub cost: f64,
}

impl ExtractorFailure {
    pub fn billed(error: ModelError, usage: TokenUsage, cost: f64) -> Self {
        Self { error, usage, cost }
    }
}

impl From<ModelError> for ExtractorFailure {
    fn from(error: ModelError) -> Self {
        Self {
            error,
            usage: TokenUsage::default(),
            cost: 0.0,
        }
    }
}
