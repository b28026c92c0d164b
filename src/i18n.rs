use serde::{Deserialize, Serialize};

/// 目标受众语言类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum TargetLanguage {
    #[serde(rename = "zh")]
    #[default]
    Chinese,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "ru")]
    Russian,
}

impl std::fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetLanguage::Chinese => write!(f, "zh"),
            TargetLanguage::English => write!(f, "en"),
            TargetLanguage::Japanese => write!(f, "ja"),
            TargetLanguage::Korean => write!(f, "ko"),
            TargetLanguage::German => write!(f, "de"),
            TargetLanguage::French => write!(f, "fr"),
            TargetLanguage::Russian => write!(f, "ru"),
        }
    }
}

impl std::str::FromStr for TargetLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zh" | "chinese" | "中文" => Ok(TargetLanguage::Chinese),
            "en" | "english" | "英文" => Ok(TargetLanguage::English),
            "ja" | "japanese" | "日本語" | "日文" => Ok(TargetLanguage::Japanese),
            "ko" | "korean" | "한국어" | "韩文" => Ok(TargetLanguage::Korean),
            "de" | "german" | "deutsch" | "德文" => Ok(TargetLanguage::German),
            "fr" | "french" | "français" | "法文" => Ok(TargetLanguage::French),
            "ru" | "russian" | "русский" | "俄文" => Ok(TargetLanguage::Russian),
            _ => Err(format!("Unknown target language: {}", s)),
        }
    }
}

impl TargetLanguage {
    /// 获取语言的描述性名称
    pub fn display_name(&self) -> &'static str {
        match self {
            TargetLanguage::Chinese => "中文",
            TargetLanguage::English => "English",
            TargetLanguage::Japanese => "日本語",
            TargetLanguage::Korean => "한국어",
            TargetLanguage::German => "Deutsch",
            TargetLanguage::French => "Français",
            TargetLanguage::Russian => "Русский",
        }
    }

    /// 获取语言的提示词指令
    pub fn prompt_instruction(&self) -> &'static str {
        match self {
            TargetLanguage::Chinese => "请使用中文撰写正文内容，确保语言表达自然、流畅、符合目标读者的阅读习惯。",
            TargetLanguage::English => {
                "Please write the article content in English, ensuring natural, fluent language that matches the reading habits of the target audience."
            }
            TargetLanguage::Japanese => {
                "日本語で本文を作成してください。自然で読みやすく、対象読者の読書習慣に合った表現を心がけてください。"
            }
            TargetLanguage::Korean => {
                "한국어로 본문을 작성해 주세요. 자연스럽고 유창하며 대상 독자의 독서 습관에 맞는 표현을 사용해 주세요."
            }
            TargetLanguage::German => {
                "Bitte verfassen Sie den Artikeltext auf Deutsch, mit natürlicher, flüssiger Sprache, die den Lesegewohnheiten der Zielgruppe entspricht."
            }
            TargetLanguage::French => {
                "Veuillez rédiger le contenu de l'article en français, dans une langue naturelle et fluide adaptée aux habitudes de lecture du public cible."
            }
            TargetLanguage::Russian => {
                "Пожалуйста, напишите текст статьи на русском языке, естественным и плавным языком, соответствующим привычкам целевой аудитории."
            }
        }
    }
}
