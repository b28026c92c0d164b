//! HTTP传输层 - POST {base}/generate，404时回退到{base}/stream

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;

use crate::config::LLMConfig;
use crate::llm::client::Transport;
use crate::llm::client::error::{ModelError, message_looks_transient};
use crate::llm::client::response::{ModelResponse, SseDecoder};
use crate::llm::client::types::{ModelReply, ModelRequest};

const GENERATE_PATH: &str = "/generate";
const STREAM_PATH: &str = "/stream";

/// 模型端点传输器
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    config: LLMConfig,
}

impl HttpTransport {
    pub fn new(config: &LLMConfig) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    async fn dispatch_inner(
        &self,
        model: &str,
        request: &ModelRequest,
    ) -> Result<ModelReply, ModelError> {
        let body = self.build_body(model, request);

        let response = self.post(GENERATE_PATH, &body).await?;

        // 404视为端点不支持批量接口，回退到流式接口
        let response = if response.status() == reqwest::StatusCode::NOT_FOUND {
            self.post(STREAM_PATH, &body).await?
        } else {
            response
        };

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status.as_u16() == 503 || message_looks_transient(&message) {
                return Err(ModelError::Transient(format!("{}: {}", status, message)));
            }
            return Err(ModelError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let decoded = if content_type.starts_with("text/event-stream") {
            let mut decoder = SseDecoder::new();
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                decoder.feed(&chunk?);
            }
            decoder.finish()?
        } else {
            let body = response.text().await?;
            ModelResponse::from_json(&body)?
        };

        Ok(decoded.normalize())
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, ModelError> {
        let url = format!(
            "{}{}",
            self.config.api_base_url.trim_end_matches('/'),
            path
        );

        let mut builder = self.http.post(&url).json(body);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        Ok(builder.send().await?)
    }

    fn build_body(&self, model: &str, request: &ModelRequest) -> serde_json::Value {
        let mut body = json!({
            "model": model,
            "system": request.system_prompt,
            "prompt": request.user_prompt,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });

        if let Some(schema) = &request.response_schema {
            body["response_schema"] = schema.clone();
        }
        if !request.images.is_empty() {
            body["images"] = json!(request.images);
        }

        body
    }
}

#[async_trait]
impl Transport for HttpTransport {
    /// 发送一次模型调用；超时与取消都会中止在途请求
    async fn dispatch(
        &self,
        model: &str,
        request: &ModelRequest,
    ) -> Result<ModelReply, ModelError> {
        let timeout_ms = request
            .timeout_ms
            .unwrap_or(self.config.timeout_seconds * 1000);

        let call = self.dispatch_inner(model, request);

        match &request.cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => Err(ModelError::Cancelled),
                    result = tokio::time::timeout(Duration::from_millis(timeout_ms), call) => {
                        result.map_err(|_| ModelError::Timeout(timeout_ms))?
                    }
                }
            }
            None => tokio::time::timeout(Duration::from_millis(timeout_ms), call)
                .await
                .map_err(|_| ModelError::Timeout(timeout_ms))?,
        }
    }
}
