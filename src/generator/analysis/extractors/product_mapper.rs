//! 产品映射提取器 - 原始产品文本结构化为简报，再推导痛点-特性映射

use std::time::Instant;

use schemars::JsonSchema;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::GenerationConfig;
use crate::generator::analysis::types::{ExtractorFailure, ExtractorReport};
use crate::i18n::TargetLanguage;
use crate::llm::client::{ModelError, ModelInvoker, TokenUsage, extract_structured};
use crate::types::analysis::{ProblemProductMapping, ProductBrief};

#[derive(Debug, Deserialize, JsonSchema)]
struct MappingPayload {
    #[serde(default)]
    mappings: Vec<ProblemProductMapping>,
}

/// 产品映射产出：简报 + 痛点映射。无产品文本时两者皆空
#[derive(Debug, Default)]
pub struct ProductExtraction {
    pub brief: Option<ProductBrief>,
    pub mappings: Vec<ProblemProductMapping>,
}

/// 从原始产品文本提取结构化简报与痛点映射
///
/// 简报解析失败时回退到兜底简报继续，绝不中断分析阶段；
/// 产品名称为空时跳过映射推导。
pub async fn execute(
    invoker: &dyn ModelInvoker,
    generation: &GenerationConfig,
    language: &TargetLanguage,
    cancel: &CancellationToken,
) -> Result<ExtractorReport<ProductExtraction>, ExtractorFailure> {
    let started = Instant::now();
    let Some(raw_text) = generation.product_raw_text.as_deref() else {
        return Ok(ExtractorReport::degraded());
    };
    if raw_text.trim().is_empty() || cancel.is_cancelled() {
        return Ok(ExtractorReport::degraded());
    }
    println!("📦 正在提取产品简报与痛点映射...");

    let mut usage = TokenUsage::default();
    let mut cost = 0.0;

    let brief_system = "你是产品营销专家。把原始产品介绍整理成结构化简报。";
    let brief_user = format!("产品原始介绍：\n{}", raw_text);
    let brief = match extract_structured::<ProductBrief>(invoker, brief_system, &brief_user).await {
        Ok((brief, call_usage, call_cost)) => {
            usage.input_tokens += call_usage.input_tokens;
            usage.output_tokens += call_usage.output_tokens;
            cost += call_cost;
            brief
        }
        Err(err) if err.is_transient() || matches!(err, ModelError::Network(_)) => {
            return Err(err.into());
        }
        Err(err) => {
            eprintln!("⚠️ 产品简报解析失败，使用兜底简报继续: {}", err);
            ProductBrief::fallback()
        }
    };

    let mut mappings = Vec::new();
    if !brief.product_name.trim().is_empty() && !cancel.is_cancelled() {
        let mapping_system = format!(
            "你是转化文案专家。基于产品简报推导5到8条用户痛点到产品特性的映射，\
             每条附用于匹配章节标题的关键词标签。{}",
            language.prompt_instruction()
        );
        let mapping_user = format!(
            "文章标题：{}\n目标读者：{}\n品牌：{}\n产品：{}\nUSP：{}\n目标痛点：{}",
            generation.title,
            generation.target_audience,
            brief.brand_name,
            brief.product_name,
            brief.usp,
            brief.target_pain_points,
        );
        match extract_structured::<MappingPayload>(invoker, &mapping_system, &mapping_user).await {
            Ok((payload, call_usage, call_cost)) => {
                usage.input_tokens += call_usage.input_tokens;
                usage.output_tokens += call_usage.output_tokens;
                cost += call_cost;
                mappings = payload.mappings;
            }
            Err(err) if err.is_transient() || matches!(err, ModelError::Network(_)) => {
                // 简报调用已经计费，随失败一并上报入账
                return Err(ExtractorFailure::billed(err, usage, cost));
            }
            Err(err) => {
                eprintln!("⚠️ 痛点映射推导失败，跳过: {}", err);
            }
        }
    }

    println!("✅ 产品提取完成，共 {} 条映射", mappings.len());
    Ok(ExtractorReport::new(
        ProductExtraction {
            brief: Some(brief),
            mappings,
        },
        usage,
        cost,
        started.elapsed(),
    ))
}
