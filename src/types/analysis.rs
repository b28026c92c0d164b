//! 分析阶段的数据实体 - 提取器产出与合并后的分析快照

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 单个关键词的行动计划
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KeywordActionPlan {
    /// 关键词本体
    pub word: String,
    /// 使用规则，最多3条
    pub rules: Vec<String>,
}

/// 大纲中的一个章节计划。顺序即成文顺序，并发完成不得改变它
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SectionPlan {
    /// 章节标题
    pub title: String,
    /// 叙事计划要点（可选）
    #[serde(default)]
    pub narrative_plan: Vec<String>,
    /// 本章节应落实的关键事实（可选）
    #[serde(default)]
    pub key_facts: Vec<String>,
    /// 产品卖点备注（可选）
    #[serde(default)]
    pub usp_notes: Option<String>,
    /// 子标题建议（可选）
    #[serde(default)]
    pub subheadings: Vec<String>,
}

impl SectionPlan {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// 参考资料的结构化分析结果
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ReferenceAnalysis {
    /// AI推导出的章节大纲
    #[serde(default)]
    pub structure: Vec<SectionPlan>,
    /// 全文通用写作计划
    #[serde(default)]
    pub general_plan: Vec<String>,
    /// 转化导向写作计划
    #[serde(default)]
    pub conversion_plan: Vec<String>,
    /// 关键信息点 - 值得在成文中保留的原子事实
    #[serde(default)]
    pub key_information_points: Vec<String>,
    /// 竞品词替换规则
    #[serde(default)]
    pub competitor_replacements: Vec<String>,
}

/// 权威性分析结果
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AuthorityAnalysis {
    /// 与主题相关的权威词
    #[serde(default)]
    pub relevant_terms: Vec<String>,
    /// 权威词组合
    #[serde(default)]
    pub combinations: Vec<String>,
}

/// 结构化的产品简报
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ProductBrief {
    pub brand_name: String,
    pub product_name: String,
    #[serde(default)]
    pub usp: String,
    #[serde(default)]
    pub cta_link: String,
    #[serde(default)]
    pub target_pain_points: String,
}

impl ProductBrief {
    /// 解析失败时的安全兜底简报，管线据此继续而不是中断
    pub fn fallback() -> Self {
        Self {
            brand_name: "Our Brand".to_string(),
            product_name: "Our Service".to_string(),
            usp: String::new(),
            cta_link: String::new(),
            target_pain_points: String::new(),
        }
    }
}

/// 痛点到产品特性的映射
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProblemProductMapping {
    /// 用户痛点
    pub pain_point: String,
    /// 对应的产品特性
    pub feature: String,
    /// 用于匹配章节标题的关键词标签
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// 合并后的分析快照 - 写作阶段开始前只读，用户可在开写前编辑覆盖
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub keyword_plans: Vec<KeywordActionPlan>,
    pub reference_analysis: ReferenceAnalysis,
    pub authority_analysis: AuthorityAnalysis,
    pub product_mapping: Vec<ProblemProductMapping>,
    pub active_product_brief: Option<ProductBrief>,
    pub visual_style: String,
}

/// 大纲兜底时使用的5个默认章节
pub const DEFAULT_OUTLINE: [&str; 5] = [
    "Introduction",
    "Core Concepts",
    "Benefits",
    "Applications",
    "Conclusion",
];
