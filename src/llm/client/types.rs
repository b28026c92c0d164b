use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Token使用情况
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }

    /// 基于模型名称估算调用成本（美元）
    pub fn estimate_cost(&self, model_name: &str) -> f64 {
        let (input_rate, output_rate) = pricing_per_kilo_tokens(model_name);
        (self.input_tokens as f64 / 1000.0) * input_rate
            + (self.output_tokens as f64 / 1000.0) * output_rate
    }
}

/// 每千tokens的单价（输入、输出），按模型名称匹配
fn pricing_per_kilo_tokens(model_name: &str) -> (f64, f64) {
    let name = model_name.to_lowercase();
    if name.contains("235b") || name.contains("powerful") {
        (0.002, 0.008)
    } else if name.contains("80b") || name.contains("efficient") {
        (0.0005, 0.002)
    } else {
        (0.001, 0.004)
    }
}

/// 模型调用请求
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// 系统提示词
    pub system_prompt: String,

    /// 用户提示词
    pub user_prompt: String,

    /// 期望的结构化响应JSON Schema（可选）
    pub response_schema: Option<Value>,

    /// 多模态图片URL（可选，用于视觉风格分析）
    pub images: Vec<String>,

    /// 超时覆盖（毫秒），缺省使用配置值
    pub timeout_ms: Option<u64>,

    /// 外部取消信号（可选）。取消会中止本次在途调用
    pub cancel: Option<CancellationToken>,
}

impl ModelRequest {
    pub fn text(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            response_schema: None,
            images: Vec::new(),
            timeout_ms: None,
            cancel: None,
        }
    }

    pub fn structured(
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
        response_schema: Value,
    ) -> Self {
        Self {
            response_schema: Some(response_schema),
            ..Self::text(system_prompt, user_prompt)
        }
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
}

/// 归一化后的模型响应 - JSON与SSE两种传输形态都收敛到这个形状
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelReply {
    /// 文本内容
    pub text: String,

    /// 结构化对象（当请求携带response_schema时可能存在）
    pub object: Option<Value>,

    /// token使用情况，缺失时为零值，绝不因缺失而报错
    pub usage: TokenUsage,

    /// 本次调用费用（美元），由客户端按实际服务的模型定价计入
    #[serde(default)]
    pub cost: f64,
}
