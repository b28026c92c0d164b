//! 模型调用客户端 - 提供统一的模型服务接口

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::{
    config::Config,
    llm::client::utils::{estimate_token_usage, evaluate_befitting_model},
};

pub mod error;
pub mod response;
mod transport;
pub mod types;
pub mod utils;

pub use error::ModelError;
pub use types::{ModelReply, ModelRequest, TokenUsage};

use transport::HttpTransport;

/// 模型调用抽象 - 编排层依赖该trait而非具体HTTP客户端
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    /// 发送一次生成请求，返回归一化后的响应
    async fn invoke(&self, request: ModelRequest) -> Result<ModelReply, ModelError>;
}

/// 单次传输抽象 - 重试逻辑依赖该trait而非具体HTTP层
#[async_trait]
pub(crate) trait Transport: Send + Sync {
    async fn dispatch(&self, model: &str, request: &ModelRequest)
    -> Result<ModelReply, ModelError>;
}

/// 模型客户端 - 重试、模型升级与传输归一化
#[derive(Clone)]
pub struct LLMClient {
    config: Config,
    transport: Arc<dyn Transport>,
}

impl LLMClient {
    /// 创建新的模型客户端
    pub fn new(config: Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config.llm)?);
        Ok(Self { config, transport })
    }

    #[cfg(test)]
    pub(crate) fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// 检查模型连接和功能是否正常
    pub async fn check_connection(&self) -> Result<()> {
        println!("🔄 正在检查模型连接...");
        let request = ModelRequest::text("System: You are a helpful assistant.", "Hello");
        match self.invoke(request).await {
            Ok(_) => {
                println!("✅ 模型连接正常");
                Ok(())
            }
            Err(e) => {
                eprintln!("❌ 模型连接失败: {}", e);
                Err(e.into())
            }
        }
    }

    /// 瞬时性失败的重试逻辑，间隔按尝试次数线性递增
    async fn dispatch_with_retry(
        &self,
        model: &str,
        request: &ModelRequest,
    ) -> Result<ModelReply, ModelError> {
        let llm_config = &self.config.llm;
        let max_retries = llm_config.retry_attempts;
        let mut attempt: u32 = 0;

        loop {
            match self.transport.dispatch(model, request).await {
                Ok(reply) => return Ok(reply),
                Err(err) => {
                    // 非瞬时性失败（4xx、格式错误、取消）立即传播
                    if !err.is_transient() {
                        return Err(err);
                    }
                    attempt += 1;
                    eprintln!(
                        "❌ 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                        attempt, max_retries, err
                    );
                    if attempt >= max_retries {
                        return Err(err);
                    }
                    let delay = llm_config.retry_delay_ms * attempt as u64;
                    tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                }
            }
        }
    }
}

#[async_trait]
impl ModelInvoker for LLMClient {
    async fn invoke(&self, request: ModelRequest) -> Result<ModelReply, ModelError> {
        let (befitting_model, fallover_model) = evaluate_befitting_model(
            &self.config.llm,
            &request.system_prompt,
            &request.user_prompt,
        );

        let outcome = match self.dispatch_with_retry(&befitting_model, &request).await {
            Ok(reply) => Ok((befitting_model, reply)),
            Err(err) if err.is_transient() => match fallover_model {
                Some(model) => {
                    eprintln!(
                        "❌ 调用模型服务出错，尝试 {} 次均失败，尝试使用备选模型{}...{}",
                        self.config.llm.retry_attempts, model, err
                    );
                    let reply = self.dispatch_with_retry(&model, &request).await?;
                    Ok((model, reply))
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        };

        // 后端未上报usage时按文本长度估算，仅服务于费用展示；
        // 费用按实际服务本次请求的模型定价入账
        outcome.map(|(served_model, mut reply)| {
            if reply.usage.total() == 0 {
                let prompt = format!("{}{}", request.system_prompt, request.user_prompt);
                reply.usage = estimate_token_usage(&prompt, &reply.text);
            }
            reply.cost = reply.usage.estimate_cost(&served_model);
            reply
        })
    }
}

/// 结构化提取 - 携带指定类型的JSON Schema调用模型并解析结果
pub async fn extract_structured<T>(
    invoker: &dyn ModelInvoker,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<(T, TokenUsage, f64), ModelError>
where
    T: JsonSchema + DeserializeOwned,
{
    let schema = serde_json::to_value(schemars::schema_for!(T))
        .map_err(|e| ModelError::Malformed(format!("响应Schema生成失败: {}", e)))?;

    let request = ModelRequest::structured(system_prompt, user_prompt, schema);
    let reply = invoker.invoke(request).await?;
    let usage = reply.usage.clone();
    let cost = reply.cost;
    let value = parse_structured(&reply)?;
    Ok((value, usage, cost))
}

/// 单轮文本生成
pub async fn prompt_text(
    invoker: &dyn ModelInvoker,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<(String, TokenUsage, f64), ModelError> {
    let request = ModelRequest::text(system_prompt, user_prompt);
    let reply = invoker.invoke(request).await?;
    Ok((reply.text, reply.usage, reply.cost))
}

/// 从归一化响应中解析结构化对象；优先structured object，其次解析文本JSON
fn parse_structured<T: DeserializeOwned>(reply: &ModelReply) -> Result<T, ModelError> {
    if let Some(object) = &reply.object {
        return serde_json::from_value(object.clone())
            .map_err(|e| ModelError::Malformed(format!("结构化对象解析失败: {}", e)));
    }

    let text = strip_code_fence(&reply.text);
    serde_json::from_str(text)
        .map_err(|e| ModelError::Malformed(format!("响应文本JSON解析失败: {}", e)))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```json").or_else(|| trimmed.strip_prefix("```"))
        && let Some(inner) = rest.strip_suffix("```")
    {
        return inner.trim();
    }
    trimmed
}

// Include tests
#[cfg(test)]
mod tests;
