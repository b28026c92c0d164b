//! 写作编排器 - 顺序与Turbo两种推进模式
//!
//! 成文顺序唯一由大纲决定，并行完成顺序只影响到达时间；
//! Stop只阻止新的派发，在途章节照常落槽，占位保持原样。

pub mod section_writer;

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::generator::analysis::types::ExtractorReport;
use crate::generator::context::GeneratorContext;
use crate::types::analysis::{AnalysisSnapshot, SectionPlan};
use crate::types::article::{SectionResult, section_id};
use section_writer::{SectionDraft, generate_section};

/// 完成前的收尾延迟，让最后一次节流渲染先被观察到
const FINALIZE_DELAY: Duration = Duration::from_millis(300);

/// 执行完整写作阶段
///
/// 自然完成时做最终重建并进入`Completed`；取消时不再收尾，
/// 状态已由stop语义强制完成。
pub async fn execute(
    context: &GeneratorContext,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    context.store.start_writing().await?;
    context.store.rebuild_content(true).await;

    let state = context.store.snapshot().await;
    let analysis = state.analysis.clone().unwrap_or_default();
    let outline = state.outline.clone();

    if context.config.generation.turbo_mode {
        println!(
            "⚡ Turbo模式：{} 个章节并行撰写（并发上限 {}）",
            outline.len(),
            context.config.generation.max_parallels.max(1)
        );
        run_turbo(context, &analysis, &outline, cancel).await;
    } else {
        println!("✍️ 顺序模式：{} 个章节逐章撰写", outline.len());
        run_sequential(context, &analysis, &outline, cancel).await;
    }

    if cancel.is_cancelled() {
        return Ok(());
    }

    tokio::time::sleep(FINALIZE_DELAY).await;
    context.store.complete().await;
    println!("🎉 写作阶段完成");
    Ok(())
}

/// 顺序模式：逐章推进，已覆盖信息点与植入次数真实地串联传递
async fn run_sequential(
    context: &GeneratorContext,
    analysis: &AnalysisSnapshot,
    outline: &[SectionPlan],
    cancel: &CancellationToken,
) {
    for (index, plan) in outline.iter().enumerate() {
        if cancel.is_cancelled() {
            return;
        }
        let covered = context.store.covered_points().await;
        let injected = context.store.snapshot().await.injected_total;
        println!("✍️ 正在撰写章节 {}/{}: {}", index + 1, outline.len(), plan.title);

        let report = generate_section(
            context.invoker.as_ref(),
            &context.config.generation,
            analysis,
            outline,
            index,
            &covered,
            injected,
            &context.config.target_language,
        )
        .await;
        record(context, index, &plan.title, report, cancel).await;
    }
}

/// Turbo模式：信号量限流的并发扇出
///
/// 所有章节共享写作开始时的覆盖快照（章节间因果性换吞吐），
/// 取消只拦截尚未派发的章节，在途的照常落槽。
async fn run_turbo(
    context: &GeneratorContext,
    analysis: &AnalysisSnapshot,
    outline: &[SectionPlan],
    cancel: &CancellationToken,
) {
    let covered_snapshot = context.store.covered_points().await;
    let injected_snapshot = context.store.snapshot().await.injected_total;
    let limit = context.config.generation.max_parallels.max(1);
    let semaphore = Arc::new(Semaphore::new(limit));

    let mut tasks = FuturesUnordered::new();
    for (index, plan) in outline.iter().enumerate() {
        let semaphore = semaphore.clone();
        let covered = &covered_snapshot;
        tasks.push(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            if cancel.is_cancelled() {
                return None;
            }
            println!("⚡ 开始撰写章节: {}", plan.title);
            let report = generate_section(
                context.invoker.as_ref(),
                &context.config.generation,
                analysis,
                outline,
                index,
                covered,
                injected_snapshot,
                &context.config.target_language,
            )
            .await;
            Some((index, report))
        });
    }

    while let Some(finished) = tasks.next().await {
        if let Some((index, report)) = finished {
            record(context, index, &outline[index].title, report, cancel).await;
        }
    }
}

/// 合入一个章节产出：去重覆盖点、入账费用、节流重建
///
/// 取消后到达的在途结果照常落槽入账，但不再触碰已定格的正文。
async fn record(
    context: &GeneratorContext,
    index: usize,
    title: &str,
    report: ExtractorReport<SectionDraft>,
    cancel: &CancellationToken,
) {
    let covered = context.store.covered_points().await;
    let new_points: Vec<String> = report
        .data
        .used_points
        .iter()
        .filter(|point| !covered.contains(*point))
        .cloned()
        .collect();

    let result = SectionResult {
        id: section_id(index, title),
        title: title.to_string(),
        content: report.data.content,
        used_points: report.data.used_points,
        injected_count: report.data.injected_count,
    };
    context.store.record_section(result, new_points).await;
    context
        .store
        .add_cost(report.cost, report.usage.total())
        .await;

    if !cancel.is_cancelled() {
        context.store.rebuild_content(false).await;
    }
}
