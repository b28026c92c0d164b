//! 写作阶段的数据实体 - 章节结果、状态机与费用账本

use serde::{Deserialize, Serialize};

/// 生成状态机
///
/// `Idle → Analyzing → AnalysisReady → Streaming → Completed`，
/// `Error`可从`Analyzing`或`Streaming`进入，Stop会提前强制进入`Completed`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GenerationStatus {
    #[default]
    Idle,
    Analyzing,
    AnalysisReady,
    Streaming,
    Completed,
    Error,
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationStatus::Idle => write!(f, "idle"),
            GenerationStatus::Analyzing => write!(f, "analyzing"),
            GenerationStatus::AnalysisReady => write!(f, "analysis_ready"),
            GenerationStatus::Streaming => write!(f, "streaming"),
            GenerationStatus::Completed => write!(f, "completed"),
            GenerationStatus::Error => write!(f, "error"),
        }
    }
}

/// 单个章节的生成结果
///
/// `id`是稳定的「序号+标题」复合键，而不是完成顺序 - 并行完成顺序不等于成文顺序。
/// 章节槽位在开写时创建、完成时原地更新、从不删除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionResult {
    pub id: String,
    pub title: String,
    /// 章节正文，在途时可能为空
    #[serde(default)]
    pub content: String,
    /// 模型自报本章节用到的关键信息点
    #[serde(default)]
    pub used_points: Vec<String>,
    /// 本章节植入产品/品牌素材的次数
    #[serde(default)]
    pub injected_count: usize,
}

impl SectionResult {
    /// 创建空的在途槽位
    pub fn pending(index: usize, title: &str) -> Self {
        Self {
            id: section_id(index, title),
            title: title.to_string(),
            content: String::new(),
            used_points: Vec::new(),
            injected_count: 0,
        }
    }
}

/// 稳定章节id：大纲序号+标题复合键
pub fn section_id(index: usize, title: &str) -> String {
    format!("{:02}-{}", index, title)
}

/// 会话费用账本 - 运行期间单调递增，仅在新运行确认重置时清零
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostLedger {
    /// 累计成本（美元）
    pub cost: f64,
    /// 累计tokens
    pub tokens: usize,
}

impl CostLedger {
    /// 单调累加 - 只允许合并增量，绝不回退
    pub fn add(&mut self, cost: f64, tokens: usize) {
        self.cost += cost;
        self.tokens += tokens;
    }
}
