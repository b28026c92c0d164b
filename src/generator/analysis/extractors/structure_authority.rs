//! 结构与权威性提取器 - 对同一份参考资料并行执行两个结构化提取

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::config::GenerationConfig;
use crate::generator::analysis::types::{ExtractorFailure, ExtractorReport};
use crate::i18n::TargetLanguage;
use crate::llm::client::{ModelError, ModelInvoker, TokenUsage, extract_structured};
use crate::types::analysis::{AuthorityAnalysis, ReferenceAnalysis};

/// 参考资料分析 + 权威词分析，二者并行，结果合并上报
pub async fn execute(
    invoker: &dyn ModelInvoker,
    generation: &GenerationConfig,
    language: &TargetLanguage,
    cancel: &CancellationToken,
) -> Result<ExtractorReport<(ReferenceAnalysis, AuthorityAnalysis)>, ExtractorFailure> {
    let started = Instant::now();
    if cancel.is_cancelled() {
        return Ok(ExtractorReport::degraded());
    }
    println!("📖 正在分析参考资料结构与权威性...");

    let (structure, authority) = tokio::join!(
        extract_reference(invoker, generation, language),
        extract_authority(invoker, generation, language),
    );

    // 一侧失败时另一侧已成功的调用照样计费
    let ((reference_analysis, reference_usage, reference_cost),
        (authority_analysis, authority_usage, authority_cost)) = match (structure, authority)
    {
        (Ok(structure), Ok(authority)) => (structure, authority),
        (Err(err), Ok((_, usage, cost))) | (Ok((_, usage, cost)), Err(err)) => {
            return Err(ExtractorFailure::billed(err, usage, cost));
        }
        (Err(err), Err(_)) => return Err(err.into()),
    };

    let usage = TokenUsage::new(
        reference_usage.input_tokens + authority_usage.input_tokens,
        reference_usage.output_tokens + authority_usage.output_tokens,
    );

    println!(
        "✅ 结构分析完成：{} 个章节计划，{} 个关键信息点",
        reference_analysis.structure.len(),
        reference_analysis.key_information_points.len()
    );
    Ok(ExtractorReport::new(
        (reference_analysis, authority_analysis),
        usage,
        reference_cost + authority_cost,
        started.elapsed(),
    ))
}

async fn extract_reference(
    invoker: &dyn ModelInvoker,
    generation: &GenerationConfig,
    language: &TargetLanguage,
) -> Result<(ReferenceAnalysis, TokenUsage, f64), ModelError> {
    let system_prompt = format!(
        "你是资深长文编辑。从参考资料中提炼写作蓝图：章节结构、写作计划、\
         关键信息点与竞品词替换规则。{}",
        language.prompt_instruction()
    );
    let user_prompt = format!(
        "文章标题：{}\n目标读者：{}\n站点类型：{}\n\n参考资料：\n{}\n\n\
         要求：\n\
         1. structure给出章节大纲，每章附叙事计划与关键事实；\n\
         2. key_information_points列出值得在成文中保留的原子事实；\n\
         3. competitor_replacements列出需要替换的竞品词及替换方式。",
        generation.title,
        generation.target_audience,
        generation.website_type.as_deref().unwrap_or("general"),
        generation.reference_content,
    );
    extract_structured::<ReferenceAnalysis>(invoker, &system_prompt, &user_prompt).await
}

async fn extract_authority(
    invoker: &dyn ModelInvoker,
    generation: &GenerationConfig,
    language: &TargetLanguage,
) -> Result<(AuthorityAnalysis, TokenUsage, f64), ModelError> {
    let system_prompt = format!(
        "你是领域专家。围绕文章主题挑选能提升可信度的权威术语与术语组合。{}",
        language.prompt_instruction()
    );
    let user_prompt = format!(
        "文章标题：{}\n用户预提供的权威词：{}\n\n参考资料：\n{}",
        generation.title,
        if generation.authority_terms.is_empty() {
            "（无）".to_string()
        } else {
            generation.authority_terms.join(", ")
        },
        generation.reference_content,
    );
    extract_structured::<AuthorityAnalysis>(invoker, &system_prompt, &user_prompt).await
}
