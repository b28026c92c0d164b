//! 分析协调器 - 并发扇出四个提取器并合并为分析快照
//!
//! 单个提取器的非致命失败降级为空产出；网络层与模型不可用类失败
//! 会传播并使本次运行进入错误状态。

pub mod extractors;
pub mod types;

use tokio_util::sync::CancellationToken;

use crate::generator::context::GeneratorContext;
use crate::llm::client::ModelError;
use crate::types::analysis::{AnalysisSnapshot, DEFAULT_OUTLINE, SectionPlan};
use types::{ExtractorFailure, ExtractorReport};

/// 执行完整分析阶段并把快照发布到状态容器
///
/// 取消发生时不发布快照，静默返回，由stop语义负责收尾状态。
pub async fn execute(
    context: &GeneratorContext,
    cancel: &CancellationToken,
) -> Result<(), ModelError> {
    let generation = &context.config.generation;
    let language = &context.config.target_language;
    println!("🚀 分析阶段开始：四个提取器并发执行");

    let (keywords, structure, product, visual) = tokio::join!(
        extractors::keyword_planner::execute(
            context.invoker.as_ref(),
            generation,
            language,
            cancel
        ),
        extractors::structure_authority::execute(
            context.invoker.as_ref(),
            generation,
            language,
            cancel
        ),
        extractors::product_mapper::execute(context.invoker.as_ref(), generation, language, cancel),
        extractors::visual_style::execute(context.invoker.as_ref(), generation, language, cancel),
    );

    let keywords = settle("keyword_planner", keywords);
    let structure = settle("structure_authority", structure);
    let product = settle("product_mapper", product);
    let visual = settle("visual_style", visual);

    // 成功与失败的提取器消耗都要入账，先记账再传播致命错误
    let (keyword_tokens, keyword_cost) = billing(&keywords);
    let (structure_tokens, structure_cost) = billing(&structure);
    let (product_tokens, product_cost) = billing(&product);
    let (visual_tokens, visual_cost) = billing(&visual);
    let total_usage_tokens = keyword_tokens + structure_tokens + product_tokens + visual_tokens;
    let total_cost = keyword_cost + structure_cost + product_cost + visual_cost;
    context.store.add_cost(total_cost, total_usage_tokens).await;

    let keywords = keywords.map_err(|failure| failure.error)?;
    let structure = structure.map_err(|failure| failure.error)?;
    let product = product.map_err(|failure| failure.error)?;
    let visual = visual.map_err(|failure| failure.error)?;

    // 取消后不再推进状态，费用已入账的部分保留
    if cancel.is_cancelled() {
        println!("🛑 分析阶段被取消，跳过快照发布");
        return Ok(());
    }

    let (reference_analysis, authority_analysis) = structure.data;
    let outline = resolve_outline(
        generation.custom_outline.as_deref(),
        &reference_analysis.structure,
    );

    let snapshot = AnalysisSnapshot {
        keyword_plans: keywords.data,
        reference_analysis,
        authority_analysis,
        product_mapping: product.data.mappings,
        active_product_brief: product.data.brief,
        visual_style: visual.data,
    };

    if let Err(err) = context.store.publish_analysis(snapshot, outline).await {
        eprintln!("⚠️ 分析快照发布失败: {}", err);
    }
    println!(
        "✅ 分析阶段完成，共消耗 {} tokens（${:.4}）",
        total_usage_tokens, total_cost
    );
    Ok(())
}

/// 非致命失败降级为空产出，网络/不可用类失败传播
fn settle<T: Default>(
    name: &str,
    result: Result<ExtractorReport<T>, ExtractorFailure>,
) -> Result<ExtractorReport<T>, ExtractorFailure> {
    match result {
        Ok(report) => Ok(report),
        Err(failure)
            if failure.error.is_transient()
                || matches!(failure.error, ModelError::Network(_)) =>
        {
            Err(failure)
        }
        Err(failure) => {
            eprintln!("⚠️ 提取器 {} 降级为空产出: {}", name, failure.error);
            Ok(ExtractorReport::degraded())
        }
    }
}

/// 提取器结果的计费口径：失败也结算中断前的消耗
fn billing<T>(result: &Result<ExtractorReport<T>, ExtractorFailure>) -> (usize, f64) {
    match result {
        Ok(report) => (report.usage.total(), report.cost),
        Err(failure) => (failure.usage.total(), failure.cost),
    }
}

/// 大纲解析优先级：用户自定义 > AI推导结构 > 默认5章兜底
pub fn resolve_outline(custom: Option<&str>, ai_structure: &[SectionPlan]) -> Vec<SectionPlan> {
    if let Some(custom) = custom {
        let titles: Vec<SectionPlan> = custom
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(SectionPlan::titled)
            .collect();
        if !titles.is_empty() {
            return titles;
        }
    }

    if !ai_structure.is_empty() {
        return ai_structure.to_vec();
    }

    DEFAULT_OUTLINE.iter().copied().map(SectionPlan::titled).collect()
}

// Include tests
#[cfg(test)]
mod tests;
