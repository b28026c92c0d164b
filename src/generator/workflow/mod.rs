//! 工作流封装 - 串起分析与写作两个阶段，并输出运行报告

use std::time::Instant;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::generator::analysis;
use crate::generator::context::GeneratorContext;
use crate::generator::score::content_score;
use crate::generator::writing;
use crate::llm::client::LLMClient;
use crate::store::SessionStore;
use crate::types::article::GenerationStatus;

/// 阶段计时器 - 离开作用域时打印耗时，仅在详细模式下输出
pub struct TimingScope {
    label: &'static str,
    started: Instant,
    verbose: bool,
}

impl TimingScope {
    pub fn new(label: &'static str, verbose: bool) -> Self {
        Self {
            label,
            started: Instant::now(),
            verbose,
        }
    }

    fn report(&self) -> Option<String> {
        self.verbose.then(|| {
            format!(
                "⏱️ {} 耗时 {:.2}s",
                self.label,
                self.started.elapsed().as_secs_f64()
            )
        })
    }
}

impl Drop for TimingScope {
    fn drop(&mut self) {
        if let Some(line) = self.report() {
            println!("{}", line);
        }
    }
}

/// 运行控制句柄 - Stop只拦截新的派发，在途调用照常完成
#[derive(Clone)]
pub struct GenerationHandle {
    cancel: CancellationToken,
    store: SessionStore,
}

impl GenerationHandle {
    pub fn new(store: SessionStore) -> Self {
        Self {
            cancel: CancellationToken::new(),
            store,
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 停止本次运行：置取消旗标并立即强制进入`Completed`
    pub async fn stop(&self) {
        println!("🛑 收到停止请求");
        self.cancel.cancel();
        self.store.force_complete().await;
    }
}

/// 启动完整的文章生成流程（CLI入口）
///
/// 恢复上一次会话后再开跑：存在历史分析/正文而未经`--yes`确认时，
/// `begin_run`的守卫会拒绝覆盖。
pub async fn launch(config: crate::config::Config) -> Result<()> {
    println!("🚀 Quill 启动，标题: {}", config.generation.title);
    println!("🌐 目标语言: {}", config.target_language.display_name());

    let client = LLMClient::new(config.clone())?;
    client.check_connection().await?;

    let session_path = config.internal_path.join("session.json");
    let mut context = GeneratorContext::new(config)?;
    context.store = SessionStore::load(&session_path).await;

    let handle = GenerationHandle::new(context.store.clone());
    run(&context, &handle.token()).await?;

    if let Err(err) = context.store.save(&session_path).await {
        eprintln!("⚠️ 会话保存失败: {}", err);
    }

    let state = context.store.snapshot().await;
    if state.status == GenerationStatus::Completed && !state.content.is_empty() {
        tokio::fs::write(&context.config.output_path, &state.content).await?;
        println!("📄 文章已写入 {:?}", context.config.output_path);
    }
    Ok(())
}

/// 执行分析与写作两个阶段并打印运行报告
///
/// 致命失败进入`Error`状态并向上传播；分析件缺失时告警，
/// 未经自动确认则停在`AnalysisReady`等待用户处置。
pub async fn run(context: &GeneratorContext, cancel: &CancellationToken) -> Result<()> {
    let verbose = context.config.verbose;
    let _total = TimingScope::new("全流程", verbose);

    context.store.begin_run(context.config.auto_confirm).await?;

    {
        let _phase = TimingScope::new("分析阶段", verbose);
        if let Err(err) = analysis::execute(context, cancel).await {
            context.store.set_error(err.to_string()).await;
            return Err(err.into());
        }
    }

    if cancel.is_cancelled() {
        return Ok(());
    }

    let missing = context.store.missing_analysis_pieces().await;
    if !missing.is_empty() {
        eprintln!("⚠️ 分析件缺失: {}", missing.join(", "));
        if !context.config.auto_confirm {
            println!("⏸️ 停在可审阅状态，请补充输入或使用自动确认后重试");
            return Ok(());
        }
        println!("▶️ 已自动确认，降级继续写作");
    }

    {
        let _phase = TimingScope::new("写作阶段", verbose);
        if let Err(err) = writing::execute(context, cancel).await {
            context.store.set_error(err.to_string()).await;
            return Err(err);
        }
    }

    print_run_report(context).await;
    Ok(())
}

/// 打印运行报告：章节、覆盖率、得分、费用与缓存摘要
async fn print_run_report(context: &GeneratorContext) {
    let state = context.store.snapshot().await;
    let score = content_score(&state);
    let total_points = state
        .analysis
        .as_ref()
        .map(|a| a.reference_analysis.key_information_points.len())
        .unwrap_or(0);

    println!("\n📊 运行报告");
    println!("  章节: {} / {}", state.sections.len(), state.outline.len());
    println!(
        "  关键信息点覆盖: {} / {}",
        state.covered_points.len(),
        total_points
    );
    println!("  产品素材植入: {} 次", state.injected_total);
    println!("  内容得分: {} ({})", score.score, score.label);
    println!(
        "  费用: ${:.4}，共 {} tokens",
        state.ledger.cost, state.ledger.tokens
    );
    println!("  💾 {}", context.cache.monitor().summary());
}
