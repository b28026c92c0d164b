//! 内容得分 - 对当前状态的纯函数选择器，不产生任何模型调用

use crate::store::SessionState;
use crate::types::article::GenerationStatus;

/// 内容得分与文案标签
#[derive(Debug, Clone, PartialEq)]
pub struct ContentScore {
    /// 0到100的整数分
    pub score: u8,
    pub label: &'static str,
}

/// 根据会话状态计算内容得分
///
/// 两个分量各占50分：关键词出现率与关键信息点覆盖率。
/// 没有关键词计划时，覆盖分量翻倍补足量程；正文为空或未开始时恒为0。
pub fn content_score(state: &SessionState) -> ContentScore {
    if state.status == GenerationStatus::Idle || state.content.trim().is_empty() {
        return ContentScore {
            score: 0,
            label: "Start Writing",
        };
    }

    let (keyword_plans, key_points) = match &state.analysis {
        Some(analysis) => (
            &analysis.keyword_plans[..],
            &analysis.reference_analysis.key_information_points[..],
        ),
        None => (&[] as &[_], &[] as &[_]),
    };

    let keyword_component = if keyword_plans.is_empty() {
        0.0
    } else {
        let lower = state.content.to_lowercase();
        let present = keyword_plans
            .iter()
            .filter(|plan| lower.contains(&plan.word.to_lowercase()))
            .count();
        present as f64 / keyword_plans.len() as f64 * 50.0
    };

    let coverage_component = if key_points.is_empty() {
        50.0
    } else {
        let covered = key_points
            .iter()
            .filter(|point| state.covered_points.contains(*point))
            .count();
        covered as f64 / key_points.len() as f64 * 50.0
    };

    let mut raw = keyword_component + coverage_component;
    if keyword_plans.is_empty() {
        raw = coverage_component * 2.0;
    }

    let score = raw.round().clamp(0.0, 100.0) as u8;
    ContentScore {
        score,
        label: label_for(score),
    }
}

fn label_for(score: u8) -> &'static str {
    if score >= 80 {
        "Excellent"
    } else if score >= 50 {
        "Good"
    } else {
        "Needs Work"
    }
}
