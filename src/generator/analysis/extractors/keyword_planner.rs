//! 关键词规划提取器 - 本地候选筛选 + 逐词规则生成

use std::time::Instant;

use schemars::JsonSchema;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::GenerationConfig;
use crate::generator::analysis::types::{ExtractorFailure, ExtractorReport};
use crate::i18n::TargetLanguage;
use crate::llm::client::{ModelError, ModelInvoker, TokenUsage, extract_structured};
use crate::types::analysis::KeywordActionPlan;
use crate::utils::keywords::extract_candidates;

/// 最多规划的关键词数
const CANDIDATE_LIMIT: usize = 8;

/// 每个关键词最多保留的使用规则条数
const RULES_PER_KEYWORD: usize = 3;

#[derive(Debug, Deserialize, JsonSchema)]
struct KeywordPlanPayload {
    /// 该关键词在成文中的使用规则
    #[serde(default)]
    rules: Vec<String>,
}

/// 为参考资料中的高频关键词生成行动计划
///
/// 候选在本地提取，证据句不足的候选被直接丢弃；单个关键词的模型失败
/// 只丢弃该词而不中断整个提取器。
pub async fn execute(
    invoker: &dyn ModelInvoker,
    generation: &GenerationConfig,
    language: &TargetLanguage,
    cancel: &CancellationToken,
) -> Result<ExtractorReport<Vec<KeywordActionPlan>>, ExtractorFailure> {
    let started = Instant::now();
    println!("🔍 正在提取关键词行动计划...");

    let candidates = extract_candidates(&generation.reference_content, CANDIDATE_LIMIT);
    let mut plans = Vec::new();
    let mut usage = TokenUsage::default();
    let mut cost = 0.0;

    for candidate in candidates {
        if cancel.is_cancelled() {
            break;
        }
        if candidate.evidence.is_empty() {
            continue;
        }

        let system_prompt = format!(
            "你是资深内容策略师。为给定关键词制定在长文中的使用规则。{}",
            language.prompt_instruction()
        );
        let user_prompt = format!(
            "文章标题：{}\n目标读者：{}\n关键词：{}（出现{}次）\n证据句：\n{}\n\n\
             请给出最多{}条具体的使用规则（语境、密度、搭配）。",
            generation.title,
            generation.target_audience,
            candidate.word,
            candidate.frequency,
            candidate.evidence.join("\n"),
            RULES_PER_KEYWORD,
        );

        match extract_structured::<KeywordPlanPayload>(invoker, &system_prompt, &user_prompt).await
        {
            Ok((payload, call_usage, call_cost)) => {
                usage.input_tokens += call_usage.input_tokens;
                usage.output_tokens += call_usage.output_tokens;
                cost += call_cost;
                if payload.rules.is_empty() {
                    continue;
                }
                let mut rules = payload.rules;
                rules.truncate(RULES_PER_KEYWORD);
                plans.push(KeywordActionPlan {
                    word: candidate.word,
                    rules,
                });
            }
            Err(err) if err.is_transient() || matches!(err, ModelError::Network(_)) => {
                // 之前成功的调用已经计费，随失败一并上报入账
                return Err(ExtractorFailure::billed(err, usage, cost));
            }
            Err(err) => {
                eprintln!("⚠️ 关键词 '{}' 规划失败，跳过: {}", candidate.word, err);
            }
        }
    }

    println!("✅ 关键词规划完成，共 {} 个计划", plans.len());
    Ok(ExtractorReport::new(plans, usage, cost, started.elapsed()))
}
