//! 作文分段分句 - 能力层
//!
//! 纯函数，不调用 LLM。产出的 `P{n}` / `P{n}S{m}` 是后续所有阶段引用原文的唯一方式，
//! 所以遇到歧义时宁可少切一句，也不把一句话切坏。

use std::sync::OnceLock;

use phf::phf_set;
use regex::Regex;
use tracing::warn;

use crate::models::{EssayStructure, Paragraph, Sentence};

/// 以这些词结尾的句点不是句子边界（小写，不含末尾句点）
static ABBREVIATIONS: phf::Set<&'static str> = phf_set! {
    "mr", "mrs", "ms", "dr", "prof", "st", "jr", "sr", "vs", "etc",
    "e.g", "i.e", "u.s", "u.k", "u.n", "no", "fig", "approx", "inc",
    "ltd", "co", "dept", "govt", "a.m", "p.m", "cf", "al", "viz", "est",
};

/// 行首的项目符号 / 编号标记
///
/// 符号后可以不带空格（`•cheap fares`）；编号后必须有空格，`1.5 million` 不算。
const BULLET_LINE: &str =
    r"(?m)^[ \t]*(?:[-*•·][ \t]*\S|(?:\d{1,2}[.)]|\(\d{1,2}\)|[A-Za-z]\))[ \t]+\S)";

/// 分段分句
///
/// 空白输入返回 `word_count == 0`、没有段落的结构，由调用方判定为不可评分。
pub fn structure_essay(raw: &str) -> EssayStructure {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    let word_count = text.split_whitespace().count();
    if word_count == 0 {
        return EssayStructure::empty();
    }

    let paragraphs = split_paragraphs(&text)
        .into_iter()
        .enumerate()
        .map(|(p_idx, block)| {
            let pid = format!("P{}", p_idx + 1);
            let sentences = split_sentences(block)
                .into_iter()
                .enumerate()
                .map(|(s_idx, text)| Sentence {
                    sid: format!("{}S{}", pid, s_idx + 1),
                    text: text.to_string(),
                })
                .collect();
            Paragraph { pid, sentences }
        })
        .collect();

    EssayStructure {
        word_count,
        has_bullets: detect_bullets(&text),
        paragraphs,
    }
}

/// 是否有任意一行以项目符号或编号开头
pub fn detect_bullets(text: &str) -> bool {
    bullet_regex().is_some_and(|re| re.is_match(text))
}

fn bullet_regex() -> Option<&'static Regex> {
    static BULLET_RE: OnceLock<Option<Regex>> = OnceLock::new();
    BULLET_RE
        .get_or_init(|| match Regex::new(BULLET_LINE) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("项目符号正则无效: {}", e);
                None
            }
        })
        .as_ref()
}

/// 以空行分段，段内单个换行保留
fn split_paragraphs(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut block_start: Option<usize> = None;
    let mut block_end = 0;
    let mut offset = 0;

    for line in text.split('\n') {
        let line_start = offset;
        let line_end = offset + line.len();
        offset = line_end + 1;

        if line.trim().is_empty() {
            if let Some(start) = block_start.take() {
                blocks.push(text[start..block_end].trim());
            }
        } else {
            block_start.get_or_insert(line_start);
            block_end = line_end;
        }
    }
    if let Some(start) = block_start {
        blocks.push(text[start..block_end].trim());
    }
    blocks
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '?' | '!')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '”' | '’' | '»')
}

/// 下一句的首字符
fn starts_sentence(c: char) -> bool {
    c.is_uppercase() || c.is_ascii_digit() || matches!(c, '"' | '\'' | '(' | '[' | '“' | '‘' | '«')
}

/// 句点前的词是否是缩写（`Mr`、`e.g`、`U.S`、单个字母的姓名首字母）
fn ends_with_abbreviation(prefix: &str) -> bool {
    let token = prefix
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .trim_start_matches(|c: char| matches!(c, '"' | '\'' | '(' | '[' | '“' | '‘'));
    if token.is_empty() {
        return false;
    }
    let lower = token.to_lowercase();
    ABBREVIATIONS.contains(lower.as_str())
        || token.contains('.')
        || (token.chars().count() == 1 && token.chars().all(char::is_alphabetic))
}

/// 段内分句，返回原文的精确子串（保留句末标点）
fn split_sentences(block: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = block.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if !is_terminator(c) {
            i += 1;
            continue;
        }

        // 吞掉连续标点和右引号 / 右括号
        let mut j = i + 1;
        while j < chars.len() && (is_terminator(chars[j].1) || is_closer(chars[j].1)) {
            j += 1;
        }

        if j < chars.len() {
            // 后面紧跟非空白（3.5、e.g、网址）不是边界
            if !chars[j].1.is_whitespace() {
                i = j;
                continue;
            }
            let next = chars[j..].iter().map(|&(_, ch)| ch).find(|ch| !ch.is_whitespace());
            if !next.map_or(true, starts_sentence) {
                i = j;
                continue;
            }
            if c == '.' && ends_with_abbreviation(&block[start..pos]) {
                i = j;
                continue;
            }
        }

        let end = chars.get(j).map_or(block.len(), |&(p, _)| p);
        let sentence = block[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = end;
        i = j;
    }

    let tail = block[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(essay: &EssayStructure) -> Vec<&str> {
        essay.sentences().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_single_ten_word_sentence() {
        let essay = structure_essay("Technology has changed the way many people live their lives.");
        assert_eq!(essay.word_count, 10);
        assert_eq!(essay.paragraphs.len(), 1);
        assert_eq!(essay.sentence_count(), 1);
        assert_eq!(essay.paragraphs[0].sentences[0].sid, "P1S1");
        assert!(!essay.has_bullets);
    }

    #[test]
    fn test_empty_input() {
        for raw in ["", "   ", "\n\n\t"] {
            let essay = structure_essay(raw);
            assert_eq!(essay.word_count, 0);
            assert!(essay.paragraphs.is_empty());
            assert!(essay.is_empty());
        }
    }

    #[test]
    fn test_paragraphs_and_ids() {
        let raw = "First point here. Second point!\r\n\r\nAnother paragraph? Yes.\n   \nLast one.";
        let essay = structure_essay(raw);
        assert_eq!(essay.paragraph_count(), 3);
        let sids: Vec<&str> = essay.sentences().map(|s| s.sid.as_str()).collect();
        assert_eq!(sids, vec!["P1S1", "P1S2", "P2S1", "P2S2", "P3S1"]);
        assert_eq!(
            texts(&essay),
            vec!["First point here.", "Second point!", "Another paragraph?", "Yes.", "Last one."]
        );
    }

    #[test]
    fn test_abbreviations_do_not_split() {
        let raw = "Mr. Smith moved to the U.S. in 1990. Many cities, e.g. London, grew. Dr. Lee agreed.";
        let essay = structure_essay(raw);
        assert_eq!(
            texts(&essay),
            vec![
                "Mr. Smith moved to the U.S. in 1990.",
                "Many cities, e.g. London, grew.",
                "Dr. Lee agreed."
            ]
        );
    }

    #[test]
    fn test_decimals_and_lowercase_continuations() {
        let raw = "Sales rose to 3.5 million. it then fell... Prices stayed flat.";
        let essay = structure_essay(raw);
        assert_eq!(
            texts(&essay),
            vec!["Sales rose to 3.5 million. it then fell...", "Prices stayed flat."]
        );
    }

    #[test]
    fn test_quotes_stay_with_their_sentence() {
        let raw = "He said \"enough.\" Then he left.";
        let essay = structure_essay(raw);
        assert_eq!(texts(&essay), vec!["He said \"enough.\"", "Then he left."]);
    }

    #[test]
    fn test_sentence_text_is_exact_substring() {
        let raw = "Cities grow.  Parks shrink!\nRoads widen?  Yes.";
        let essay = structure_essay(raw);
        for sentence in essay.sentences() {
            assert!(raw.contains(&sentence.text), "{}", sentence.text);
        }
        assert_eq!(essay.paragraph_count(), 1);
    }

    #[test]
    fn test_bullet_detection() {
        assert!(detect_bullets("Intro\n- first\n- second"));
        assert!(detect_bullets("  * item"));
        assert!(detect_bullets("• item"));
        assert!(detect_bullets("1. First reason"));
        assert!(detect_bullets("2) Second reason"));
        assert!(detect_bullets("(3) Third reason"));
        assert!(detect_bullets("a) option"));
        assert!(!detect_bullets("In 2010 the rate was 5.5 percent."));
        assert!(!detect_bullets("Well-known cities - like Paris - attract tourists."));
        assert!(structure_essay("Reasons:\n- cost\n- time").has_bullets);

        // 符号后不带空格也算
        assert!(detect_bullets("Reasons:\n•cheap fares"));
        assert!(detect_bullets("Reasons:\n-cheap fares\n-more trains"));
        assert!(detect_bullets("*first point"));
        assert!(!detect_bullets("1.5 million people used the metro."));
        assert!(!detect_bullets("Reasons:\n2010 was a record year."));
    }
}
