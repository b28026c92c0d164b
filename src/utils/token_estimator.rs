//! Token估算 - 基于字符构成的轻量估算，服务于模型选择与费用展示兜底

/// 英文（及其他ASCII）字符数/token的经验比例
const ASCII_CHARS_PER_TOKEN: f64 = 4.0;

/// 中文字符数/token的经验比例
const CJK_CHARS_PER_TOKEN: f64 = 1.5;

/// 固定提示词开销
const BASE_TOKEN_OVERHEAD: usize = 50;

/// Token估算结果
#[derive(Debug, Clone)]
pub struct TokenEstimation {
    pub estimated_tokens: usize,
    pub character_count: usize,
    pub cjk_char_count: usize,
}

/// 无状态的token估算器
#[derive(Debug, Default)]
pub struct TokenEstimator;

impl TokenEstimator {
    pub fn new() -> Self {
        Self
    }

    /// 估算一段文本的token数量；中英文按各自比例折算
    pub fn estimate_tokens(&self, text: &str) -> TokenEstimation {
        let character_count = text.chars().count();
        let cjk_char_count = text.chars().filter(|c| is_cjk_char(*c)).count();
        let other_count = character_count - cjk_char_count;

        let cjk_tokens = (cjk_char_count as f64 / CJK_CHARS_PER_TOKEN).ceil() as usize;
        let other_tokens = (other_count as f64 / ASCII_CHARS_PER_TOKEN).ceil() as usize;

        TokenEstimation {
            estimated_tokens: cjk_tokens + other_tokens + BASE_TOKEN_OVERHEAD,
            character_count,
            cjk_char_count,
        }
    }
}

fn is_cjk_char(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF |   // CJK统一汉字
        0x3400..=0x4DBF |   // 扩展A
        0x20000..=0x2A6DF | // 扩展B
        0x2A700..=0x2EBEF | // 扩展C-F
        0x30000..=0x3134F   // 扩展G
    )
}
