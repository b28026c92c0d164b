//! 模型响应归一化 - 将JSON与SSE两种传输形态显式建模为带标签的联合类型

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::client::error::ModelError;
use crate::llm::client::types::{ModelReply, TokenUsage};

/// 单次JSON响应体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonPayload {
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub object: Option<Value>,

    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// SSE流中的单个事件
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(default)]
    pub delta: Option<String>,

    #[serde(default)]
    pub object: Option<Value>,

    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// 已解码的模型响应 - 所有可接受的传输形态在此枚举中可穷举
#[derive(Debug, Clone)]
pub enum ModelResponse {
    /// application/json 单次响应
    Json(JsonPayload),
    /// text/event-stream 流式响应，已按事件切分
    EventStream(Vec<StreamEvent>),
}

impl ModelResponse {
    /// 解析JSON响应体
    pub fn from_json(body: &str) -> Result<Self, ModelError> {
        let payload: JsonPayload = serde_json::from_str(body)
            .map_err(|e| ModelError::Malformed(format!("JSON响应解析失败: {}", e)))?;
        Ok(ModelResponse::Json(payload))
    }

    /// 两种形态收敛为统一的ModelReply；usage缺失时取零值
    pub fn normalize(self) -> ModelReply {
        match self {
            ModelResponse::Json(payload) => ModelReply {
                text: payload.content,
                object: payload.object,
                usage: payload.usage.unwrap_or_default(),
                cost: 0.0,
            },
            ModelResponse::EventStream(events) => {
                let mut text = String::new();
                let mut object = None;
                let mut usage = TokenUsage::default();
                for event in events {
                    if let Some(delta) = event.delta {
                        text.push_str(&delta);
                    }
                    if event.object.is_some() {
                        object = event.object;
                    }
                    if let Some(event_usage) = event.usage {
                        usage = event_usage;
                    }
                }
                ModelReply {
                    text,
                    object,
                    usage,
                    cost: 0.0,
                }
            }
        }
    }
}

/// SSE增量解码器 - 按行缓冲，逐事件产出
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
    events: Vec<StreamEvent>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 喂入一段字节流，解码其中完整的事件行
    pub fn feed(&mut self, chunk: &[u8]) {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        while let Some(pos) = self.buffer.find('\n') {
            let line = self.buffer[..pos].trim_end_matches('\r').to_string();
            self.buffer.drain(..=pos);
            self.decode_line(&line);
        }
    }

    fn decode_line(&mut self, line: &str) {
        let Some(data) = line.strip_prefix("data:") else {
            // 注释行、事件名行与空行直接忽略
            return;
        };
        let data = data.trim();

        if data == "[DONE]" {
            self.done = true;
            return;
        }

        // 单个事件解码失败不致命，跳过该事件继续
        if let Ok(event) = serde_json::from_str::<StreamEvent>(data) {
            self.events.push(event);
        }
    }

    /// 流结束，产出带标签的响应
    pub fn finish(mut self) -> Result<ModelResponse, ModelError> {
        // 处理无结尾换行的残留行
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            self.decode_line(line.trim_end());
        }

        if self.events.is_empty() && !self.done {
            return Err(ModelError::Malformed("SSE流中没有任何有效事件".to_string()));
        }
        Ok(ModelResponse::EventStream(self.events))
    }
}
