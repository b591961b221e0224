//! Разбиение текста сегмента на фрагменты для синтезатора.
//!
//! Синтезатор принимает ограниченное число символов, поэтому длинный текст
//! делится по предложениям. Предложение длиннее лимита делится принудительно:
//! сначала по знакам препинания внутри предложения, затем по пробелам и,
//! в крайнем случае, нарезается по символам. Ошибок нет ни на одном уровне.
//!
//! Длина измеряется в символах Unicode, а не в байтах.

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

lazy_static! {
    static ref SPACES_RE: Regex = Regex::new(r"\s+").expect("valid regex");
    // Конец предложения: знак, необязательные закрывающие кавычки/скобки, пробел
    static ref SENTENCE_END_RE: Regex =
        Regex::new(r#"[.!?…。！？]+["'»”’)\]]*\s+"#).expect("valid regex");
    static ref CLAUSE_END_RE: Regex = Regex::new(r"[,;:，；：]+\s+").expect("valid regex");
}

/// Фрагмент текста с порядковым номером для последующей склейки аудио
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

impl Chunk {
    /// Длина фрагмента в символах
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Делитель текста с фиксированным лимитом длины
#[derive(Debug, Clone)]
pub struct TextSegmenter {
    max_chars: usize,
}

impl TextSegmenter {
    /// Нулевой лимит заменяется единицей
    pub fn new(max_chars: usize) -> Self {
        if max_chars == 0 {
            warn!("Chunk limit of 0 characters requested, using 1");
        }
        Self {
            max_chars: max_chars.max(1),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Разбить текст на упорядоченные фрагменты не длиннее лимита.
    ///
    /// Для пустого или пробельного текста возвращается пустой вектор.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let normalized = normalize_whitespace(text);
        if normalized.is_empty() {
            return Vec::new();
        }

        if char_len(&normalized) <= self.max_chars {
            return vec![Chunk {
                index: 0,
                text: normalized,
            }];
        }

        let mut pieces: Vec<String> = Vec::new();
        let mut current = String::new();

        for sentence in split_after(&SENTENCE_END_RE, &normalized) {
            if char_len(&sentence) > self.max_chars {
                if !current.is_empty() {
                    pieces.push(std::mem::take(&mut current));
                }
                debug!(
                    "Sentence of {} chars exceeds limit {}, forcing a split",
                    char_len(&sentence),
                    self.max_chars
                );
                pieces.extend(self.force_split(&sentence));
                continue;
            }

            if current.is_empty() {
                current = sentence;
            } else if char_len(&current) + 1 + char_len(&sentence) <= self.max_chars {
                current.push(' ');
                current.push_str(&sentence);
            } else {
                pieces.push(std::mem::replace(&mut current, sentence));
            }
        }
        if !current.is_empty() {
            pieces.push(current);
        }

        pieces
            .into_iter()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .enumerate()
            .map(|(index, text)| Chunk { index, text })
            .collect()
    }

    /// Принудительное деление одного слишком длинного предложения
    fn force_split(&self, sentence: &str) -> Vec<String> {
        let clauses = split_after(&CLAUSE_END_RE, sentence);
        if clauses.len() > 1 {
            return self.pack(clauses, |unit| self.split_words(unit));
        }
        self.split_words(sentence)
    }

    /// Деление по пробелам; слова длиннее лимита нарезаются по символам
    fn split_words(&self, unit: &str) -> Vec<String> {
        let words: Vec<String> = unit.split_whitespace().map(str::to_string).collect();
        self.pack(words, |word| {
            warn!(
                "Token of {} chars has no break points, slicing at {} chars",
                char_len(word),
                self.max_chars
            );
            hard_slice(word, self.max_chars)
        })
    }

    /// Жадная упаковка единиц через одиночный пробел.
    /// Единицы длиннее лимита передаются следующему уровню деления.
    fn pack<F>(&self, units: Vec<String>, mut oversized: F) -> Vec<String>
    where
        F: FnMut(&str) -> Vec<String>,
    {
        let mut out = Vec::new();
        let mut current = String::new();

        for unit in units {
            let unit_len = char_len(&unit);
            if unit_len > self.max_chars {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                out.extend(oversized(&unit));
                continue;
            }

            if current.is_empty() {
                current = unit;
            } else if char_len(&current) + 1 + unit_len <= self.max_chars {
                current.push(' ');
                current.push_str(&unit);
            } else {
                out.push(std::mem::replace(&mut current, unit));
            }
        }
        if !current.is_empty() {
            out.push(current);
        }
        out
    }
}

/// Разбить текст на фрагменты с заданным лимитом
pub fn split_text(text: &str, max_chars: usize) -> Vec<Chunk> {
    TextSegmenter::new(max_chars).split(text)
}

/// Схлопывает пробельные последовательности в один пробел
pub fn normalize_whitespace(text: &str) -> String {
    SPACES_RE.replace_all(text.trim(), " ").to_string()
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Делит текст сразу после каждого совпадения; разделитель остается в левой части
fn split_after(re: &Regex, text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut last = 0;
    for m in re.find_iter(text) {
        let part = text[last..m.end()].trim();
        if !part.is_empty() {
            parts.push(part.to_string());
        }
        last = m.end();
    }
    let tail = text[last..].trim();
    if !tail.is_empty() {
        parts.push(tail.to_string());
    }
    parts
}

fn hard_slice(word: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_chars)
        .map(|part| part.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = split_text("  Hello   world.  ", 200);
        assert_eq!(
            chunks,
            vec![Chunk {
                index: 0,
                text: "Hello world.".to_string()
            }]
        );
    }

    #[test]
    fn test_blank_text_gives_no_chunks() {
        assert!(split_text("", 10).is_empty());
        assert!(split_text(" \n\t ", 10).is_empty());
    }

    #[test]
    fn test_sentences_are_packed_greedily() {
        let text = "One two three. Four five six. Seven eight nine.";
        let chunks = split_text(text, 30);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["One two three. Four five six.", "Seven eight nine."]);
        assert_eq!(chunks[1].index, 1);
    }

    #[test]
    fn test_clause_split_for_long_sentence() {
        let text = "alpha beta gamma, delta epsilon zeta; eta theta iota";
        let chunks = split_text(text, 20);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 20, "{:?}", chunk);
        }
        assert_eq!(chunks[0].text, "alpha beta gamma,");
        assert_eq!(joined(&chunks), text);
    }

    #[test]
    fn test_unpunctuated_text_splits_on_whitespace() {
        let word = "abcdefghi"; // 9 символов + пробел
        let text = vec![word; 60].join(" "); // 599 символов
        assert_eq!(text.chars().count(), 599);

        let chunks = split_text(&text, 200);
        assert!(chunks.len() >= 3);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 200);
        }
        assert_eq!(joined(&chunks), text);
    }

    #[test]
    fn test_pathological_token_is_hard_sliced() {
        let text = "x".repeat(45);
        let chunks = split_text(&text, 20);
        let lens: Vec<usize> = chunks.iter().map(|c| c.char_len()).collect();
        assert_eq!(lens, vec![20, 20, 5]);
        let concatenated: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(concatenated, text);
    }

    #[test]
    fn test_limit_counts_characters_not_bytes() {
        // Кириллица занимает два байта на символ
        let text = "привет мир. как дела сегодня.";
        let chunks = split_text(text, 15);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 15);
        }
        assert_eq!(joined(&chunks), text);
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let chunks = split_text("ab c", 0);
        assert!(chunks.iter().all(|c| c.char_len() == 1));
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_indices_follow_order() {
        let text = "First sentence here. Second sentence here. Third sentence here.";
        let chunks = split_text(text, 22);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }
}
