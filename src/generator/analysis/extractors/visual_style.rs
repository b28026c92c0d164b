//! 视觉风格提取器 - 逐图描述后汇总为全局风格描述

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::config::GenerationConfig;
use crate::generator::analysis::types::{ExtractorFailure, ExtractorReport};
use crate::i18n::TargetLanguage;
use crate::llm::client::{ModelError, ModelInvoker, ModelRequest, TokenUsage, prompt_text};

/// 参与视觉分析的配图上限
const IMAGE_LIMIT: usize = 5;

/// 描述抓取到的配图并汇总成统一的视觉风格描述
///
/// 单张图片的失败只丢弃该图；没有任何成功描述时产出空风格。
pub async fn execute(
    invoker: &dyn ModelInvoker,
    generation: &GenerationConfig,
    language: &TargetLanguage,
    cancel: &CancellationToken,
) -> Result<ExtractorReport<String>, ExtractorFailure> {
    let started = Instant::now();
    if generation.scraped_images.is_empty() || cancel.is_cancelled() {
        return Ok(ExtractorReport::degraded());
    }
    println!(
        "🎨 正在分析配图视觉风格（{} 张）...",
        generation.scraped_images.len().min(IMAGE_LIMIT)
    );

    let mut usage = TokenUsage::default();
    let mut cost = 0.0;
    let mut descriptions = Vec::new();

    for image_url in generation.scraped_images.iter().take(IMAGE_LIMIT) {
        if cancel.is_cancelled() {
            break;
        }
        let request = ModelRequest::text(
            "你是视觉设计师。用两三句话描述这张配图的风格、配色与构图。",
            format!("图片地址：{}", image_url),
        )
        .with_images(vec![image_url.clone()]);

        match invoker.invoke(request).await {
            Ok(reply) => {
                usage.input_tokens += reply.usage.input_tokens;
                usage.output_tokens += reply.usage.output_tokens;
                cost += reply.cost;
                if !reply.text.trim().is_empty() {
                    descriptions.push(reply.text);
                }
            }
            Err(err) => {
                eprintln!("⚠️ 配图描述失败，跳过 {}: {}", image_url, err);
            }
        }
    }

    if descriptions.is_empty() {
        return Ok(ExtractorReport::new(
            String::new(),
            usage,
            cost,
            started.elapsed(),
        ));
    }

    let summary_system = format!(
        "你是艺术指导。把多张配图的描述汇总成一段统一的视觉风格描述，\
         供后续配图生成参考。{}",
        language.prompt_instruction()
    );
    let summary_user = descriptions.join("\n---\n");
    let style = match prompt_text(invoker, &summary_system, &summary_user).await {
        Ok((text, call_usage, call_cost)) => {
            usage.input_tokens += call_usage.input_tokens;
            usage.output_tokens += call_usage.output_tokens;
            cost += call_cost;
            text
        }
        Err(err) if err.is_transient() || matches!(err, ModelError::Network(_)) => {
            // 逐图描述已经计费，随失败一并上报入账
            return Err(ExtractorFailure::billed(err, usage, cost));
        }
        Err(err) => {
            eprintln!("⚠️ 视觉风格汇总失败，使用首条描述: {}", err);
            descriptions.remove(0)
        }
    };

    println!("✅ 视觉风格分析完成");
    Ok(ExtractorReport::new(style, usage, cost, started.elapsed()))
}
