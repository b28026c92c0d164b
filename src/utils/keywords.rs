//! 关键词候选提取 - NLP协作方的本地实现，产出候选词与支撑证据

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z][A-Za-z0-9\-]{2,}|[一-鿿]{2,6}").unwrap());

/// 关键词候选，附带参考文本中的支撑片段
#[derive(Debug, Clone)]
pub struct KeywordCandidate {
    pub word: String,
    pub frequency: usize,
    /// 参考文本中包含该词的句子（证据），没有证据的候选在规划阶段被丢弃
    pub evidence: Vec<String>,
}

/// 从参考文本中提取高频关键词候选
pub fn extract_candidates(reference: &str, limit: usize) -> Vec<KeywordCandidate> {
    let mut frequencies: HashMap<String, usize> = HashMap::new();
    for capture in WORD_PATTERN.find_iter(reference) {
        let word = capture.as_str().to_lowercase();
        if is_stop_word(&word) {
            continue;
        }
        *frequencies.entry(word).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, usize)> = frequencies
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(word, frequency)| {
            let evidence = collect_evidence(reference, &word);
            KeywordCandidate {
                word,
                frequency,
                evidence,
            }
        })
        .collect()
}

/// 提取包含关键词的句子作为证据，最多3条
fn collect_evidence(reference: &str, word: &str) -> Vec<String> {
    reference
        .split(['。', '！', '？', '.', '!', '?', '\n'])
        .filter(|sentence| sentence.to_lowercase().contains(word))
        .map(|sentence| sentence.trim().to_string())
        .filter(|sentence| !sentence.is_empty())
        .take(3)
        .collect()
}

fn is_stop_word(word: &str) -> bool {
    const STOP_WORDS: &[&str] = &[
        "the", "and", "for", "with", "that", "this", "are", "was", "have", "has", "not", "but",
        "can", "will", "you", "your", "from", "they", "their", "what", "when", "which", "about",
        "into", "more", "than", "then", "them", "these", "those", "also", "其中", "以及", "因为",
        "所以", "但是", "如果", "我们", "他们", "这个", "那个", "可以", "没有", "就是", "一个",
    ];
    STOP_WORDS.contains(&word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_candidates_ranked_by_frequency() {
        let reference = "Rust is fast. Rust is safe. Rust powers many tools. \
                         Performance matters. Performance wins users.";
        let candidates = extract_candidates(reference, 10);

        assert!(!candidates.is_empty());
        assert_eq!(candidates[0].word, "rust");
        assert_eq!(candidates[0].frequency, 3);
        assert!(candidates[0].evidence.len() <= 3);
        assert!(candidates.iter().any(|c| c.word == "performance"));
    }

    #[test]
    fn test_extract_candidates_drops_single_occurrences() {
        let candidates = extract_candidates("unique words only appear once here", 10);
        assert!(candidates.iter().all(|c| c.frequency >= 2));
    }

    #[test]
    fn test_extract_candidates_chinese_text() {
        let reference = "智能写作可以提升效率。智能写作依赖参考资料。效率是关键指标，效率决定体验。";
        let candidates = extract_candidates(reference, 10);

        assert!(candidates.iter().any(|c| c.word.contains("智能写作") || c.word.contains("效率")));
    }

    #[test]
    fn test_stop_words_excluded() {
        let candidates = extract_candidates("the the the and and for for", 10);
        assert!(candidates.is_empty());
    }
}
