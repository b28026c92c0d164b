//! 命令行接口 - 参数解析与配置装配

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::i18n::TargetLanguage;

/// Quill - AI辅助长文写作引擎
#[derive(Parser, Debug)]
#[command(name = "quill", version, about = "AI-assisted long-form article writer")]
pub struct Args {
    /// 配置文件路径（quill.toml），命令行参数优先于文件
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 文章标题
    #[arg(short, long)]
    pub title: Option<String>,

    /// 参考资料文件路径
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// 自定义大纲文件路径（每行一个章节标题）
    #[arg(long)]
    pub outline: Option<PathBuf>,

    /// 产品原始介绍文件路径
    #[arg(long)]
    pub product: Option<PathBuf>,

    /// 配图URL（可重复，最多取前5张参与视觉分析）
    #[arg(long = "image")]
    pub images: Vec<String>,

    /// 目标读者描述
    #[arg(long)]
    pub audience: Option<String>,

    /// 权威词（可重复）
    #[arg(long = "authority-term")]
    pub authority_terms: Vec<String>,

    /// 站点类型（用于措辞风格）
    #[arg(long)]
    pub website_type: Option<String>,

    /// 启用Turbo并行模式
    #[arg(long)]
    pub turbo: bool,

    /// Turbo模式的章节并发上限
    #[arg(long)]
    pub max_parallels: Option<usize>,

    /// 目标语言 (zh/en/ja/ko/de/fr/ru)
    #[arg(short = 'l', long)]
    pub target_language: Option<String>,

    /// 输出文件路径
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// LLM API基地址
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// 自动确认破坏性操作（丢弃上一次运行、降级继续）
    #[arg(short = 'y', long = "yes")]
    pub auto_confirm: bool,

    /// 禁用模型响应缓存
    #[arg(long)]
    pub no_cache: bool,

    /// 详细日志
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// 装配最终配置：文件配置打底，命令行参数覆盖
    pub fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(title) = self.title {
            config.generation.title = title;
        }
        if let Some(path) = &self.reference {
            config.generation.reference_content = read_input_file(path, "参考资料")?;
        }
        if let Some(path) = &self.outline {
            config.generation.custom_outline = Some(read_input_file(path, "自定义大纲")?);
        }
        if let Some(path) = &self.product {
            config.generation.product_raw_text = Some(read_input_file(path, "产品介绍")?);
        }
        if !self.images.is_empty() {
            config.generation.scraped_images = self.images;
        }
        if let Some(audience) = self.audience {
            config.generation.target_audience = audience;
        }
        if !self.authority_terms.is_empty() {
            config.generation.authority_terms = self.authority_terms;
        }
        if self.website_type.is_some() {
            config.generation.website_type = self.website_type;
        }
        if self.turbo {
            config.generation.turbo_mode = true;
        }
        if let Some(parallels) = self.max_parallels {
            config.generation.max_parallels = parallels.max(1);
        }
        if let Some(language) = &self.target_language {
            config.target_language = language
                .parse::<TargetLanguage>()
                .map_err(|e| anyhow::anyhow!(e))?;
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(base_url) = self.api_base_url {
            config.llm.api_base_url = base_url;
        }
        if self.auto_confirm {
            config.auto_confirm = true;
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
        if self.verbose {
            config.verbose = true;
        }

        if config.generation.title.trim().is_empty() {
            anyhow::bail!("缺少文章标题，请通过 --title 或配置文件提供");
        }
        if config.generation.reference_content.trim().is_empty() {
            anyhow::bail!("缺少参考资料，请通过 --reference 或配置文件提供");
        }
        Ok(config)
    }
}

fn read_input_file(path: &PathBuf, label: &str) -> Result<String> {
    std::fs::read_to_string(path).context(format!("无法读取{}文件: {:?}", label, path))
}

// Include tests
#[cfg(test)]
mod tests;
