#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use crate::config::Config;
    use crate::generator::analysis::types::{ExtractorFailure, ExtractorReport};
    use crate::generator::analysis::{execute, extractors, resolve_outline, settle};
    use crate::generator::context::GeneratorContext;
    use crate::llm::client::{ModelError, ModelInvoker, ModelReply, ModelRequest, TokenUsage};
    use crate::types::analysis::SectionPlan;

    #[test]
    fn test_resolve_outline_prefers_custom() {
        let custom = "开篇\n\n正文要点  \n收尾";
        let ai = vec![SectionPlan::titled("AI章节")];
        let outline = resolve_outline(Some(custom), &ai);

        let titles: Vec<&str> = outline.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["开篇", "正文要点", "收尾"]);
    }

    #[test]
    fn test_resolve_outline_falls_back_to_ai_structure() {
        let ai = vec![SectionPlan::titled("A"), SectionPlan::titled("B")];
        let outline = resolve_outline(None, &ai);
        assert_eq!(outline.len(), 2);
        assert_eq!(outline[0].title, "A");
    }

    #[test]
    fn test_resolve_outline_blank_custom_falls_through() {
        let ai = vec![SectionPlan::titled("A")];
        let outline = resolve_outline(Some("   \n\n"), &ai);
        assert_eq!(outline[0].title, "A");
    }

    #[test]
    fn test_resolve_outline_default_when_nothing_available() {
        let outline = resolve_outline(None, &[]);
        assert_eq!(outline.len(), 5);
        assert_eq!(outline[0].title, "Introduction");
        assert_eq!(outline[4].title, "Conclusion");
    }

    #[test]
    fn test_settle_degrades_malformed() {
        let result: Result<ExtractorReport<Vec<String>>, ExtractorFailure> =
            Err(ModelError::Malformed("bad json".to_string()).into());
        let report = settle("x", result).expect("malformed should degrade");
        assert!(report.data.is_empty());
        assert_eq!(report.usage.total(), 0);
    }

    #[test]
    fn test_settle_propagates_transient() {
        let result: Result<ExtractorReport<Vec<String>>, ExtractorFailure> =
            Err(ModelError::Transient("overloaded".to_string()).into());
        assert!(settle("x", result).is_err());
    }

    /// 首次调用成功计费、后续瞬时失败的调用器替身
    struct FailAfterFirstInvoker {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelInvoker for FailAfterFirstInvoker {
        async fn invoke(&self, _request: ModelRequest) -> Result<ModelReply, ModelError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(ModelReply {
                    text: String::new(),
                    object: Some(serde_json::json!({"rules": ["控制密度"]})),
                    usage: TokenUsage::new(10, 20),
                    cost: 0.001,
                })
            } else {
                Err(ModelError::Transient("overloaded".to_string()))
            }
        }
    }

    /// 两个高频词、各带证据句的参考文本
    fn billable_reference() -> String {
        "Rust is fast. Rust is safe. Performance matters. Performance wins users.".to_string()
    }

    #[tokio::test]
    async fn test_keyword_planner_bills_partial_usage_on_transient_abort() {
        let mut config = Config::default();
        config.generation.reference_content = billable_reference();
        let cancel = CancellationToken::new();
        let invoker = FailAfterFirstInvoker {
            calls: AtomicUsize::new(0),
        };

        let failure = extractors::keyword_planner::execute(
            &invoker,
            &config.generation,
            &config.target_language,
            &cancel,
        )
        .await
        .expect_err("second keyword call fails");

        // 中断前成功的那次调用照样计费
        assert!(failure.error.is_transient());
        assert_eq!(failure.usage, TokenUsage::new(10, 20));
        assert!((failure.cost - 0.001).abs() < 1e-9);
    }

    /// 结构类提示词成功、关键词提示词瞬时失败的调用器替身
    struct KeywordOutageInvoker;

    #[async_trait]
    impl ModelInvoker for KeywordOutageInvoker {
        async fn invoke(&self, request: ModelRequest) -> Result<ModelReply, ModelError> {
            if request.system_prompt.contains("内容策略师") {
                return Err(ModelError::Transient("overloaded".to_string()));
            }
            Ok(ModelReply {
                text: String::new(),
                object: Some(serde_json::json!({})),
                usage: TokenUsage::new(100, 200),
                cost: 0.002,
            })
        }
    }

    #[tokio::test]
    async fn test_analysis_bills_successful_extractors_before_propagating() {
        let mut config = Config::default();
        config.cache.enabled = false;
        config.generation.title = "测试".to_string();
        config.generation.reference_content = billable_reference();
        config.generation.target_audience = "readers".to_string();

        let context = GeneratorContext::with_invoker(config, Arc::new(KeywordOutageInvoker));
        let cancel = CancellationToken::new();

        let result = execute(&context, &cancel).await;
        assert!(result.is_err());

        // 结构+权威两次成功调用在错误传播前已经入账
        let state = context.store.snapshot().await;
        assert_eq!(state.ledger.tokens, 600);
        assert!((state.ledger.cost - 0.004).abs() < 1e-9);
    }
}
