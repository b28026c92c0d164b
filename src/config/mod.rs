use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use crate::i18n::TargetLanguage;

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// 输出路径（最终文章Markdown）
    pub output_path: PathBuf,

    /// 内部工作目录路径 (.quill)
    pub internal_path: PathBuf,

    /// 目标语言
    pub target_language: TargetLanguage,

    /// 生成任务输入
    pub generation: GenerationConfig,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 缓存配置
    pub cache: CacheConfig,

    /// 自动确认破坏性操作（丢弃上一次运行的分析/正文）
    pub auto_confirm: bool,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// 生成任务输入 - 生成开始后视为不可变
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GenerationConfig {
    /// 文章标题
    pub title: String,

    /// 参考资料正文
    pub reference_content: String,

    /// 用户自定义大纲（每行一个章节标题，优先于AI结构）
    pub custom_outline: Option<String>,

    /// 目标读者描述
    pub target_audience: String,

    /// 权威词（可选，由用户预先提供）
    pub authority_terms: Vec<String>,

    /// 站点类型（可选，用于措辞风格）
    pub website_type: Option<String>,

    /// 产品原始介绍文本（可选）
    pub product_raw_text: Option<String>,

    /// 抓取到的配图URL（可选，最多取前5张参与视觉风格分析）
    pub scraped_images: Vec<String>,

    /// 是否启用Turbo并行模式
    pub turbo_mode: bool,

    /// Turbo模式的章节并发上限
    pub max_parallels: usize,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LLMConfig {
    /// LLM API KEY（可选，作为Bearer Token发送）
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 高能效模型，优先用于常规推理任务
    pub model_efficient: String,

    /// 高质量模型，优先用于长上下文任务，以及作为efficient失效情况下的兜底
    pub model_powerful: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数（仅对瞬时性失败生效）
    pub retry_attempts: u32,

    /// 重试基础间隔（毫秒），按尝试次数线性递增
    pub retry_delay_ms: u64,

    /// 单次调用超时时间（秒）
    pub timeout_seconds: u64,
}

/// 缓存配置
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// 是否启用缓存
    pub enabled: bool,

    /// 缓存目录
    pub cache_dir: PathBuf,

    /// 缓存过期时间（小时）
    pub expire_hours: u64,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./quill.article.md"),
            internal_path: PathBuf::from("./.quill"),
            target_language: TargetLanguage::default(),
            generation: GenerationConfig::default_with_parallels(),
            llm: LLMConfig::default(),
            cache: CacheConfig::default(),
            auto_confirm: false,
            verbose: false,
        }
    }
}

impl GenerationConfig {
    /// 默认输入，Turbo并发上限为2（后端与token预算不允许无界扇出）
    pub fn default_with_parallels() -> Self {
        Self {
            max_parallels: 2,
            ..Default::default()
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("QUILL_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::from("https://api-inference.modelscope.cn/v1"),
            model_efficient: String::from("Qwen/Qwen3-Next-80B-A3B-Instruct"),
            model_powerful: String::from("Qwen/Qwen3-235B-A22B-Instruct-2507"),
            max_tokens: 131072,
            temperature: 0.1,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            timeout_seconds: 90,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: PathBuf::from(".quill/cache"),
            expire_hours: 8760,
        }
    }
}
