//! Quill - AI辅助长文写作引擎
//!
//! 分析阶段并发提取写作蓝图，写作阶段按大纲逐章（或Turbo并行）成文，
//! 全程维护可观察的会话状态、覆盖率与费用账本。

pub mod cache;
pub mod cli;
pub mod config;
pub mod generator;
pub mod i18n;
pub mod llm;
pub mod store;
pub mod types;
pub mod utils;

pub use config::Config;
pub use generator::context::GeneratorContext;
pub use generator::score::{ContentScore, content_score};
pub use generator::workflow::{GenerationHandle, launch};
pub use store::SessionStore;
