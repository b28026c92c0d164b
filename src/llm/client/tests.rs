#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    use crate::config::Config;
    use crate::llm::client::error::{ModelError, message_looks_transient};
    use crate::llm::client::response::{ModelResponse, SseDecoder};
    use crate::llm::client::transport::HttpTransport;
    use crate::llm::client::types::{ModelReply, ModelRequest, TokenUsage};
    use crate::llm::client::{LLMClient, ModelInvoker, Transport};

    #[test]
    fn test_json_response_normalize() {
        let body = r#"{"content":"你好","usage":{"input_tokens":10,"output_tokens":5}}"#;
        let reply = ModelResponse::from_json(body).unwrap().normalize();

        assert_eq!(reply.text, "你好");
        assert!(reply.object.is_none());
        assert_eq!(reply.usage, TokenUsage::new(10, 5));
    }

    #[test]
    fn test_json_response_missing_usage_defaults_to_zero() {
        let body = r#"{"content":"hello"}"#;
        let reply = ModelResponse::from_json(body).unwrap().normalize();

        assert_eq!(reply.text, "hello");
        assert_eq!(reply.usage, TokenUsage::default());
    }

    #[test]
    fn test_json_response_with_structured_object() {
        let body = r#"{"content":"","object":{"brandName":"Acme"},"usage":{"input_tokens":1,"output_tokens":2}}"#;
        let reply = ModelResponse::from_json(body).unwrap().normalize();

        assert_eq!(reply.object.unwrap()["brandName"], "Acme");
    }

    #[test]
    fn test_malformed_json_response() {
        let result = ModelResponse::from_json("not json at all");
        assert!(matches!(result, Err(ModelError::Malformed(_))));
    }

    #[test]
    fn test_sse_decoder_concatenates_deltas() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"data: {\"delta\":\"Hello \"}\n");
        decoder.feed(b"data: {\"delta\":\"world\"}\n");
        decoder.feed(b"data: {\"usage\":{\"input_tokens\":7,\"output_tokens\":3}}\n");
        decoder.feed(b"data: [DONE]\n");

        let reply = decoder.finish().unwrap().normalize();
        assert_eq!(reply.text, "Hello world");
        assert_eq!(reply.usage, TokenUsage::new(7, 3));
    }

    #[test]
    fn test_sse_decoder_handles_split_chunks() {
        let mut decoder = SseDecoder::new();
        // 事件可能在任意字节处被切开
        decoder.feed(b"data: {\"del");
        decoder.feed(b"ta\":\"abc\"}\ndata: [DONE]\n");

        let reply = decoder.finish().unwrap().normalize();
        assert_eq!(reply.text, "abc");
    }

    #[test]
    fn test_sse_decoder_ignores_comments_and_blank_lines() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b": keep-alive\n\ndata: {\"delta\":\"x\"}\n");

        let reply = decoder.finish().unwrap().normalize();
        assert_eq!(reply.text, "x");
    }

    #[test]
    fn test_sse_decoder_empty_stream_is_malformed() {
        let decoder = SseDecoder::new();
        assert!(matches!(
            decoder.finish(),
            Err(ModelError::Malformed(_))
        ));
    }

    #[test]
    fn test_transient_classification() {
        assert!(message_looks_transient("service unavailable"));
        assert!(message_looks_transient("Model Overloaded, retry later"));
        assert!(message_looks_transient("upstream returned 503"));
        assert!(!message_looks_transient("invalid api key"));

        assert!(ModelError::Transient("x".to_string()).is_transient());
        assert!(ModelError::Timeout(1000).is_transient());
        assert!(
            ModelError::Status {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !ModelError::Status {
                status: 400,
                message: String::new()
            }
            .is_transient()
        );
        assert!(!ModelError::Malformed("bad".to_string()).is_transient());
        assert!(!ModelError::Cancelled.is_transient());
    }

    #[test]
    fn test_token_usage_cost_monotonic_in_tokens() {
        let small = TokenUsage::new(100, 100).estimate_cost("Qwen/Qwen3-Next-80B-A3B-Instruct");
        let large = TokenUsage::new(1000, 1000).estimate_cost("Qwen/Qwen3-Next-80B-A3B-Instruct");

        assert!(small > 0.0);
        assert!(large > small);
    }

    #[test]
    fn test_parse_structured_prefers_object() {
        #[derive(serde::Deserialize)]
        struct Payload {
            name: String,
        }

        let reply = ModelReply {
            text: "ignored".to_string(),
            object: Some(serde_json::json!({"name": "from-object"})),
            usage: TokenUsage::default(),
            cost: 0.0,
        };
        let payload: Payload = super::super::parse_structured(&reply).unwrap();
        assert_eq!(payload.name, "from-object");
    }

    #[test]
    fn test_parse_structured_from_fenced_text() {
        #[derive(serde::Deserialize)]
        struct Payload {
            name: String,
        }

        let reply = ModelReply {
            text: "```json\n{\"name\":\"fenced\"}\n```".to_string(),
            object: None,
            usage: TokenUsage::default(),
            cost: 0.0,
        };
        let payload: Payload = super::super::parse_structured(&reply).unwrap();
        assert_eq!(payload.name, "fenced");
    }

    /// 按脚本逐次出结果的传输替身，记录每次派发的模型与时刻
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<ModelReply, ModelError>>>,
        calls: Mutex<Vec<(String, tokio::time::Instant)>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<ModelReply, ModelError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, tokio::time::Instant)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn dispatch(
            &self,
            model: &str,
            _request: &ModelRequest,
        ) -> Result<ModelReply, ModelError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), tokio::time::Instant::now()));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ModelError::Transient("脚本已耗尽".to_string())))
        }
    }

    fn overloaded() -> Result<ModelReply, ModelError> {
        Err(ModelError::Transient("overloaded".to_string()))
    }

    fn ok_reply(input: usize, output: usize) -> Result<ModelReply, ModelError> {
        Ok(ModelReply {
            text: "ok".to_string(),
            object: None,
            usage: TokenUsage::new(input, output),
            cost: 0.0,
        })
    }

    /// 超过32KB的prompt直接选用高质量模型，没有备选模型
    fn powerful_only_request() -> ModelRequest {
        ModelRequest::text("system", "x".repeat(33 * 1024))
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retries_until_cap() {
        let transport = ScriptedTransport::new(vec![overloaded(), overloaded(), overloaded()]);
        let client = LLMClient::with_transport(Config::default(), transport.clone());

        let result = client.invoke(powerful_only_request()).await;

        assert!(matches!(result, Err(ModelError::Transient(_))));
        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        let powerful = Config::default().llm.model_powerful;
        assert!(calls.iter().all(|(model, _)| *model == powerful));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_backoff_increases_linearly() {
        let transport = ScriptedTransport::new(vec![overloaded(), overloaded(), overloaded()]);
        let client = LLMClient::with_transport(Config::default(), transport.clone());

        let _ = client.invoke(powerful_only_request()).await;

        // 重试间隔按尝试次数线性递增：delay、2*delay
        let delay = Config::default().llm.retry_delay_ms;
        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].1 - calls[0].1, Duration::from_millis(delay));
        assert_eq!(calls[2].1 - calls[1].1, Duration::from_millis(delay * 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_then_success_stops_retrying() {
        let transport = ScriptedTransport::new(vec![overloaded(), ok_reply(5, 7)]);
        let client = LLMClient::with_transport(Config::default(), transport.clone());

        let reply = client.invoke(powerful_only_request()).await.unwrap();

        assert_eq!(reply.usage, TokenUsage::new(5, 7));
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_non_transient_error_short_circuits() {
        let transport = ScriptedTransport::new(vec![Err(ModelError::Status {
            status: 400,
            message: "bad request".to_string(),
        })]);
        let client = LLMClient::with_transport(Config::default(), transport.clone());

        let result = client.invoke(powerful_only_request()).await;

        assert!(matches!(
            result,
            Err(ModelError::Status { status: 400, .. })
        ));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallover_serves_reply_at_powerful_model_pricing() {
        // 高能效模型重试耗尽后切换备选模型，费用按实际服务的模型入账
        let transport = ScriptedTransport::new(vec![
            overloaded(),
            overloaded(),
            overloaded(),
            ok_reply(1000, 1000),
        ]);
        let client = LLMClient::with_transport(Config::default(), transport.clone());

        let reply = client
            .invoke(ModelRequest::text("system", "short prompt"))
            .await
            .unwrap();

        let llm = Config::default().llm;
        let calls = transport.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0].0, llm.model_efficient);
        assert_eq!(calls[3].0, llm.model_powerful);

        let expected = TokenUsage::new(1000, 1000).estimate_cost(&llm.model_powerful);
        assert!((reply.cost - expected).abs() < 1e-9);
        assert!(reply.cost > TokenUsage::new(1000, 1000).estimate_cost(&llm.model_efficient));
    }

    #[tokio::test]
    async fn test_reply_priced_by_efficient_model_without_fallover() {
        let transport = ScriptedTransport::new(vec![ok_reply(1000, 1000)]);
        let client = LLMClient::with_transport(Config::default(), transport.clone());

        let reply = client
            .invoke(ModelRequest::text("system", "short prompt"))
            .await
            .unwrap();

        let expected =
            TokenUsage::new(1000, 1000).estimate_cost(&Config::default().llm.model_efficient);
        assert!((reply.cost - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_zero_usage_reply_gets_estimated_usage_and_cost() {
        let transport = ScriptedTransport::new(vec![Ok(ModelReply {
            text: "a reasonably long generated answer".to_string(),
            object: None,
            usage: TokenUsage::default(),
            cost: 0.0,
        })]);
        let client = LLMClient::with_transport(Config::default(), transport);

        let reply = client
            .invoke(ModelRequest::text("system", "short prompt"))
            .await
            .unwrap();

        assert!(reply.usage.total() > 0);
        assert!(reply.cost > 0.0);
    }

    fn request_is_complete(buf: &[u8]) -> bool {
        let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let head = String::from_utf8_lossy(&buf[..pos]);
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        buf.len() >= pos + 4 + content_length
    }

    async fn read_request_path(stream: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if request_is_complete(&buf) {
                break;
            }
        }
        String::from_utf8_lossy(&buf)
            .lines()
            .next()
            .unwrap_or_default()
            .split_whitespace()
            .nth(1)
            .unwrap_or_default()
            .to_string()
    }

    #[tokio::test]
    async fn test_dispatch_falls_back_to_stream_path_on_404() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // /generate返回404，客户端应改投/stream
        tokio::spawn(async move {
            for _ in 0..2 {
                let (mut stream, _) = listener.accept().await.unwrap();
                let path = read_request_path(&mut stream).await;
                let response = if path == "/generate" {
                    "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                        .to_string()
                } else {
                    let body =
                        r#"{"content":"streamed ok","usage":{"input_tokens":3,"output_tokens":4}}"#;
                    format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                         content-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    )
                };
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });

        let mut llm = Config::default().llm;
        llm.api_base_url = format!("http://{}", addr);
        llm.api_key = String::new();
        let transport = HttpTransport::new(&llm).unwrap();

        let reply = transport
            .dispatch("test-model", &ModelRequest::text("s", "u"))
            .await
            .unwrap();

        assert_eq!(reply.text, "streamed ok");
        assert_eq!(reply.usage, TokenUsage::new(3, 4));
    }

    #[tokio::test]
    async fn test_dispatch_aborted_by_cancellation_token() {
        // 端点只建立连接从不应答，取消信号应立即中止调用
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut llm = Config::default().llm;
        llm.api_base_url = format!("http://{}", addr);
        llm.api_key = String::new();
        let transport = HttpTransport::new(&llm).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let mut request = ModelRequest::text("s", "u");
        request.cancel = Some(token);

        let err = transport.dispatch("test-model", &request).await.unwrap_err();
        assert!(matches!(err, ModelError::Cancelled));
        drop(listener);
    }
}
