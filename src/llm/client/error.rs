use thiserror::Error;

/// 模型客户端错误分类 - 决定是否自动重试
#[derive(Debug, Error)]
pub enum ModelError {
    /// 瞬时性失败（过载、不可用、503），允许重试
    #[error("模型服务暂时不可用: {0}")]
    Transient(String),

    /// 单次调用超时
    #[error("模型调用超时（{0}毫秒）")]
    Timeout(u64),

    /// 调用被外部取消
    #[error("模型调用已取消")]
    Cancelled,

    /// 非瞬时性的HTTP状态错误（4xx等），立即传播
    #[error("模型服务返回错误状态 {status}: {message}")]
    Status { status: u16, message: String },

    /// 响应格式无法解析，立即传播
    #[error("模型响应格式无效: {0}")]
    Malformed(String),

    /// 网络层错误
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),
}

impl ModelError {
    /// 是否属于可重试的瞬时性失败
    pub fn is_transient(&self) -> bool {
        match self {
            ModelError::Transient(_) | ModelError::Timeout(_) => true,
            ModelError::Status { status, .. } => *status == 503,
            ModelError::Network(e) => {
                e.is_timeout() || e.is_connect() || message_looks_transient(&e.to_string())
            }
            _ => false,
        }
    }
}

/// 根据错误消息判断是否为瞬时性失败（unavailable / overloaded / 503）
pub fn message_looks_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("unavailable") || lower.contains("overloaded") || lower.contains("503")
}
