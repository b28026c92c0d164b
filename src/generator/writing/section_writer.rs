//! 章节写作器 - 基于分析快照生成单个章节的结构化产出

use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::Deserialize;

use crate::config::GenerationConfig;
use crate::generator::analysis::types::ExtractorReport;
use crate::i18n::TargetLanguage;
use crate::llm::client::{ModelInvoker, TokenUsage, extract_structured};
use crate::types::analysis::{AnalysisSnapshot, ProblemProductMapping, SectionPlan};

/// 模型的结构化章节响应
#[derive(Debug, Deserialize, JsonSchema)]
struct SectionPayload {
    /// 章节Markdown正文
    content: String,
    /// 本章节实际落实的关键信息点（必须是全集的子集）
    #[serde(default)]
    used_points: Vec<String>,
    /// 产品/品牌素材植入次数
    #[serde(default)]
    injected_count: usize,
}

/// 一个章节的写作产出
#[derive(Debug, Clone)]
pub struct SectionDraft {
    pub content: String,
    pub used_points: Vec<String>,
    pub injected_count: usize,
}

/// 章节模型失败时的行内错误标记
pub fn error_marker(title: &str) -> String {
    format!("> **Error generating section: {}**", title)
}

/// 生成一个章节
///
/// 模型失败不会中断整篇文章：失败章节以行内错误标记落槽，零消耗上报。
/// 自报的used_points被过滤到关键信息点全集内，幻觉点不入覆盖集。
pub async fn generate_section(
    invoker: &dyn ModelInvoker,
    generation: &GenerationConfig,
    analysis: &AnalysisSnapshot,
    outline: &[SectionPlan],
    index: usize,
    covered_so_far: &BTreeSet<String>,
    injected_so_far: usize,
    language: &TargetLanguage,
) -> ExtractorReport<SectionDraft> {
    let started = std::time::Instant::now();
    let plan = &outline[index];

    let system_prompt = build_system_prompt(generation, analysis, language);
    let user_prompt = build_user_prompt(
        generation,
        analysis,
        outline,
        index,
        covered_so_far,
        injected_so_far,
    );

    match extract_structured::<SectionPayload>(invoker, &system_prompt, &user_prompt).await {
        Ok((payload, usage, cost)) => {
            let all_points: BTreeSet<&str> = analysis
                .reference_analysis
                .key_information_points
                .iter()
                .map(String::as_str)
                .collect();
            let used_points: Vec<String> = payload
                .used_points
                .into_iter()
                .filter(|point| all_points.contains(point.as_str()))
                .collect();

            ExtractorReport::new(
                SectionDraft {
                    content: payload.content,
                    used_points,
                    injected_count: payload.injected_count,
                },
                usage,
                cost,
                started.elapsed(),
            )
        }
        Err(err) => {
            eprintln!("❌ 章节 '{}' 生成失败: {}", plan.title, err);
            ExtractorReport::new(
                SectionDraft {
                    content: error_marker(&plan.title),
                    used_points: Vec::new(),
                    injected_count: 0,
                },
                TokenUsage::default(),
                0.0,
                started.elapsed(),
            )
        }
    }
}

fn build_system_prompt(
    generation: &GenerationConfig,
    analysis: &AnalysisSnapshot,
    language: &TargetLanguage,
) -> String {
    let mut prompt = format!(
        "你是资深长文写手，正在撰写文章《{}》的一个章节。{}\n目标读者：{}",
        generation.title,
        language.prompt_instruction(),
        generation.target_audience,
    );

    if !analysis.authority_analysis.relevant_terms.is_empty() {
        prompt.push_str(&format!(
            "\n权威术语（自然融入）：{}",
            analysis.authority_analysis.relevant_terms.join(", ")
        ));
    }
    if !analysis.reference_analysis.general_plan.is_empty() {
        prompt.push_str(&format!(
            "\n全文写作计划：\n{}",
            analysis.reference_analysis.general_plan.join("\n")
        ));
    }
    if !analysis.reference_analysis.competitor_replacements.is_empty() {
        prompt.push_str(&format!(
            "\n竞品词替换规则：\n{}",
            analysis.reference_analysis.competitor_replacements.join("\n")
        ));
    }
    prompt
}

fn build_user_prompt(
    generation: &GenerationConfig,
    analysis: &AnalysisSnapshot,
    outline: &[SectionPlan],
    index: usize,
    covered_so_far: &BTreeSet<String>,
    injected_so_far: usize,
) -> String {
    let plan = &outline[index];
    let titles: Vec<String> = outline
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if i == index {
                format!("{}. {} ← 当前章节", i + 1, p.title)
            } else {
                format!("{}. {}", i + 1, p.title)
            }
        })
        .collect();

    let mut prompt = format!(
        "全文大纲：\n{}\n\n当前章节：{}\n叙事计划：\n{}",
        titles.join("\n"),
        plan.title,
        if plan.narrative_plan.is_empty() {
            "（自由发挥）".to_string()
        } else {
            plan.narrative_plan.join("\n")
        },
    );

    if !plan.key_facts.is_empty() {
        prompt.push_str(&format!("\n本章关键事实：\n{}", plan.key_facts.join("\n")));
    }
    if !plan.subheadings.is_empty() {
        prompt.push_str(&format!("\n建议子标题：{}", plan.subheadings.join(" / ")));
    }

    let all_points = &analysis.reference_analysis.key_information_points;
    if !all_points.is_empty() {
        prompt.push_str(&format!(
            "\n\n关键信息点全集：\n{}\n已被其他章节覆盖（避免重复展开）：\n{}",
            all_points.join("\n"),
            if covered_so_far.is_empty() {
                "（无）".to_string()
            } else {
                covered_so_far
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n")
            },
        ));
    }

    if !analysis.keyword_plans.is_empty() {
        let lines: Vec<String> = analysis
            .keyword_plans
            .iter()
            .map(|p| format!("{}: {}", p.word, p.rules.join("；")))
            .collect();
        prompt.push_str(&format!("\n\n关键词使用规则：\n{}", lines.join("\n")));
    }

    if let Some(mapping) = matching_product_mapping(&analysis.product_mapping, &plan.title) {
        let brief_line = analysis
            .active_product_brief
            .as_ref()
            .map(|b| format!("{}（{}）", b.product_name, b.brand_name))
            .unwrap_or_default();
        prompt.push_str(&format!(
            "\n\n产品植入（本章匹配到痛点）：\n痛点：{}\n对应特性：{}\n产品：{}\n\
             全文已植入{}次，植入需自然、克制。",
            mapping.pain_point, mapping.feature, brief_line, injected_so_far,
        ));
    }

    if !analysis.visual_style.is_empty() {
        prompt.push_str(&format!("\n\n全文视觉风格参考：{}", analysis.visual_style));
    }

    prompt.push_str(
        "\n\n输出要求：content为本章节Markdown正文；used_points只列出本章真正落实、\
         且属于关键信息点全集的条目；injected_count为本章产品/品牌植入次数。",
    );

    if generation.turbo_mode {
        prompt.push_str("\n注意：其他章节正在并行撰写，不要引用尚未写出的内容。");
    }
    prompt
}

/// 按关键词标签把痛点映射匹配到章节标题
fn matching_product_mapping<'a>(
    mappings: &'a [ProblemProductMapping],
    title: &str,
) -> Option<&'a ProblemProductMapping> {
    let lower = title.to_lowercase();
    mappings.iter().find(|mapping| {
        mapping
            .keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && lower.contains(&keyword.to_lowercase()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(keywords: &[&str]) -> ProblemProductMapping {
        ProblemProductMapping {
            pain_point: "慢".to_string(),
            feature: "快".to_string(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_matching_product_mapping_by_keyword() {
        let mappings = vec![mapping(&["性能"]), mapping(&["安全"])];
        let matched = matching_product_mapping(&mappings, "性能优化实践");
        assert!(matched.is_some());
        assert_eq!(matched.unwrap().keywords[0], "性能");
    }

    #[test]
    fn test_matching_product_mapping_case_insensitive() {
        let mappings = vec![mapping(&["Rust"])];
        assert!(matching_product_mapping(&mappings, "why rust wins").is_some());
    }

    #[test]
    fn test_matching_product_mapping_none() {
        let mappings = vec![mapping(&["安全"])];
        assert!(matching_product_mapping(&mappings, "Introduction").is_none());
    }

    #[test]
    fn test_error_marker_format() {
        assert_eq!(
            error_marker("Benefits"),
            "> **Error generating section: Benefits**"
        );
    }
}
