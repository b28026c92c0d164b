//! 会话状态容器 - 生成运行期间唯一的可观察状态来源
//!
//! 字段与领域实体一一对应，所有并发更新都是单调合并：
//! 费用只累加、覆盖点只做集合并集，乱序完成无法破坏总量。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::types::analysis::{AnalysisSnapshot, SectionPlan};
use crate::types::article::{CostLedger, GenerationStatus, SectionResult, section_id};

/// UI可见内容重建的最小间隔
pub const RENDER_THROTTLE: Duration = Duration::from_millis(100);

/// 状态容器错误
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    /// 已有上一次运行的分析/正文，丢弃需要显式确认
    #[error("已存在上一次运行的分析或正文，重新生成需要显式确认")]
    DiscardRequiresConfirmation,

    /// 非法状态转移
    #[error("非法状态转移: {from} -> {to}")]
    InvalidTransition {
        from: GenerationStatus,
        to: GenerationStatus,
    },

    /// 无法解析出任何大纲
    #[error("无法确定章节大纲")]
    EmptyOutline,
}

/// 会话状态快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub run_id: Option<Uuid>,
    pub status: GenerationStatus,
    pub error_message: Option<String>,
    pub analysis: Option<AnalysisSnapshot>,
    /// 不可变大纲 - 成文顺序唯一由它决定
    pub outline: Vec<SectionPlan>,
    /// 章节槽位，内部无序，渲染时按大纲顺序查找
    pub sections: HashMap<String, SectionResult>,
    /// 已覆盖关键信息点 - 运行内只增不减
    pub covered_points: BTreeSet<String>,
    /// 产品素材植入总次数
    pub injected_total: usize,
    pub ledger: CostLedger,
    /// UI可见的组装后正文
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            run_id: None,
            status: GenerationStatus::Idle,
            error_message: None,
            analysis: None,
            outline: Vec::new(),
            sections: HashMap::new(),
            covered_points: BTreeSet::new(),
            injected_total: 0,
            ledger: CostLedger::default(),
            content: String::new(),
            updated_at: Utc::now(),
        }
    }
}

/// 会话状态容器
#[derive(Clone, Default)]
pub struct SessionStore {
    state: Arc<RwLock<SessionState>>,
    last_render: Arc<Mutex<Option<Instant>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取当前状态快照
    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn status(&self) -> GenerationStatus {
        self.state.read().await.status
    }

    /// 开始新的运行：清空所有按次状态并进入`Analyzing`
    ///
    /// 若存在上一次运行的分析或正文而未经确认，拒绝执行（用户侧守卫）。
    pub async fn begin_run(&self, confirmed: bool) -> Result<Uuid, StoreError> {
        let mut state = self.state.write().await;

        let has_previous = state.analysis.is_some() || !state.content.is_empty();
        if has_previous && !confirmed {
            return Err(StoreError::DiscardRequiresConfirmation);
        }

        let run_id = Uuid::new_v4();
        *state = SessionState {
            run_id: Some(run_id),
            status: GenerationStatus::Analyzing,
            ..SessionState::default()
        };
        Ok(run_id)
    }

    /// 分析完成，进入可审阅的`AnalysisReady`阶段
    pub async fn publish_analysis(
        &self,
        analysis: AnalysisSnapshot,
        outline: Vec<SectionPlan>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.status != GenerationStatus::Analyzing {
            return Err(StoreError::InvalidTransition {
                from: state.status,
                to: GenerationStatus::AnalysisReady,
            });
        }
        state.analysis = Some(analysis);
        state.outline = outline;
        state.status = GenerationStatus::AnalysisReady;
        state.updated_at = Utc::now();
        Ok(())
    }

    /// 开写前由用户编辑覆盖分析快照（仅`AnalysisReady`阶段允许）
    pub async fn override_analysis(&self, analysis: AnalysisSnapshot) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.status != GenerationStatus::AnalysisReady {
            return Err(StoreError::InvalidTransition {
                from: state.status,
                to: GenerationStatus::AnalysisReady,
            });
        }
        state.analysis = Some(analysis);
        state.updated_at = Utc::now();
        Ok(())
    }

    /// 检查关键分析件是否缺失，返回缺失件名称供开写前告警
    pub async fn missing_analysis_pieces(&self) -> Vec<&'static str> {
        let state = self.state.read().await;
        let mut missing = Vec::new();
        match &state.analysis {
            Some(analysis) => {
                if analysis.reference_analysis.structure.is_empty() {
                    missing.push("structure");
                }
                if analysis.authority_analysis.relevant_terms.is_empty()
                    && analysis.authority_analysis.combinations.is_empty()
                {
                    missing.push("authority");
                }
                if analysis.keyword_plans.is_empty() {
                    missing.push("keyword_plans");
                }
            }
            None => missing.push("analysis"),
        }
        missing
    }

    /// 进入写作阶段：为每个大纲章节创建空槽位
    pub async fn start_writing(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.status != GenerationStatus::AnalysisReady {
            return Err(StoreError::InvalidTransition {
                from: state.status,
                to: GenerationStatus::Streaming,
            });
        }
        if state.outline.is_empty() {
            return Err(StoreError::EmptyOutline);
        }

        let slots: HashMap<String, SectionResult> = state
            .outline
            .iter()
            .enumerate()
            .map(|(index, plan)| {
                let slot = SectionResult::pending(index, &plan.title);
                (slot.id.clone(), slot)
            })
            .collect();
        state.sections = slots;
        state.status = GenerationStatus::Streaming;
        state.updated_at = Utc::now();
        Ok(())
    }

    /// 合入一个章节结果：槽位原地更新，覆盖点做并集，费用只累加
    pub async fn record_section(&self, result: SectionResult, new_points: Vec<String>) {
        let mut state = self.state.write().await;
        state.injected_total += result.injected_count;
        state.sections.insert(result.id.clone(), result);
        state.covered_points.extend(new_points);
        state.updated_at = Utc::now();
    }

    /// 单调并入已覆盖关键信息点
    pub async fn merge_covered(&self, points: impl IntoIterator<Item = String>) {
        let mut state = self.state.write().await;
        state.covered_points.extend(points);
        state.updated_at = Utc::now();
    }

    /// 累加费用账本
    pub async fn add_cost(&self, cost: f64, tokens: usize) {
        let mut state = self.state.write().await;
        state.ledger.add(cost, tokens);
        state.updated_at = Utc::now();
    }

    /// 取已覆盖关键信息点快照
    pub async fn covered_points(&self) -> BTreeSet<String> {
        self.state.read().await.covered_points.clone()
    }

    /// 重建UI可见正文，100ms节流，避免快速到达的并行结果触发O(n²)重渲染
    ///
    /// 返回是否真正执行了重建。
    pub async fn rebuild_content(&self, force: bool) -> bool {
        if !force {
            let mut last = self.last_render.lock().await;
            if let Some(at) = *last
                && at.elapsed() < RENDER_THROTTLE
            {
                return false;
            }
            *last = Some(Instant::now());
        }

        let mut state = self.state.write().await;
        state.content = assemble_draft(&state.outline, &state.sections, state.status);
        state.updated_at = Utc::now();
        true
    }

    /// 完成收尾：最后一次重建，跳过空槽位与占位内容
    pub async fn complete(&self) {
        let mut state = self.state.write().await;
        state.content = assemble_final(&state.outline, &state.sections);
        state.status = GenerationStatus::Completed;
        state.updated_at = Utc::now();
    }

    /// Stop语义：立即置为`Completed`（而非`Idle`），已有正文与占位保持原样
    pub async fn force_complete(&self) {
        let mut state = self.state.write().await;
        if state.status != GenerationStatus::Idle {
            state.status = GenerationStatus::Completed;
            state.updated_at = Utc::now();
        }
    }

    /// 致命错误：记录用户可见消息并停机
    pub async fn set_error(&self, message: impl Into<String>) {
        let mut state = self.state.write().await;
        state.status = GenerationStatus::Error;
        state.error_message = Some(message.into());
        state.updated_at = Utc::now();
    }

    /// 持久化会话快照（尽力而为）
    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        let state = self.snapshot().await;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&state)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// 加载会话快照；损坏或缺失时回退到空默认值，绝不让启动崩溃
    pub async fn load(path: &Path) -> Self {
        let state = match tokio::fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str::<SessionState>(&content).unwrap_or_default(),
            Err(_) => SessionState::default(),
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            last_render: Arc::new(Mutex::new(None)),
        }
    }
}

/// 运行中的正文组装：按大纲顺序查找槽位，空槽位显示在写占位
fn assemble_draft(
    outline: &[SectionPlan],
    sections: &HashMap<String, SectionResult>,
    status: GenerationStatus,
) -> String {
    let mut parts = Vec::with_capacity(outline.len());
    for (index, plan) in outline.iter().enumerate() {
        let id = section_id(index, &plan.title);
        match sections.get(&id) {
            Some(slot) if !slot.content.is_empty() => parts.push(slot.content.clone()),
            _ if status == GenerationStatus::Streaming => {
                parts.push(format!("> Writing... {}", plan.title));
            }
            _ => {}
        }
    }
    parts.join("\n\n")
}

/// 完成时的正文组装：跳过空槽位，不留占位
fn assemble_final(outline: &[SectionPlan], sections: &HashMap<String, SectionResult>) -> String {
    let mut parts = Vec::with_capacity(outline.len());
    for (index, plan) in outline.iter().enumerate() {
        let id = section_id(index, &plan.title);
        if let Some(slot) = sections.get(&id)
            && !slot.content.is_empty()
        {
            parts.push(slot.content.clone());
        }
    }
    parts.join("\n\n")
}
