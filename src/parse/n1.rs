//! Sentence splitter for the N1 pass: one model response in, an ordered,
//! deduplicated list of period-terminated atomic sentences out.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Leading answer label some models prepend ("Resposta:", "Saida:").
static RESPONSE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(resposta|saida)\s*:\s*").unwrap());

/// Bullet list marker at line start.
static BULLET_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[-*]\s+").unwrap());

/// Numbered list marker at line start: `1)`, `1.`, `1-`.
static NUMERIC_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[).\s-]+\s*").unwrap());

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Strip markdown fences, a leading answer label and surrounding quotes.
pub fn clean_output(text: &str) -> String {
    let cleaned = text.trim().replace("```", "");
    let cleaned = RESPONSE_LABEL.replace(cleaned.trim(), "");
    cleaned
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim()
        .to_string()
}

/// Full N1 parse: clean, collapse whitespace runs, split into sentences.
///
/// Total function: an unusable response yields an empty list, which the
/// retry controller treats as a failed attempt.
pub fn process_text(text: &str) -> Vec<String> {
    let cleaned = clean_output(text);
    let collapsed = WHITESPACE_RUN.replace_all(&cleaned, " ");
    split_sentences(&collapsed)
}

/// Split cleaned text into period-terminated sentences, preserving first
/// occurrence order and dropping exact duplicates.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        lines.push(text.trim());
    }

    let mut sentences = Vec::new();
    for line in lines {
        let line = BULLET_MARKER.replace(line, "");
        let line = NUMERIC_MARKER.replace(&line, "");
        if line.is_empty() {
            continue;
        }
        for part in split_at_boundaries(&line) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if part.ends_with('.') {
                sentences.push(part.to_string());
            } else {
                sentences.push(format!("{part}."));
            }
        }
    }

    let mut seen = HashSet::new();
    sentences.retain(|s| seen.insert(s.clone()));
    sentences
}

/// Split a line at sentence boundaries: a period followed by whitespace,
/// where the period does not close a single-uppercase-letter initial
/// ("J. Silva") and the following text does not continue in lowercase
/// (mid-abbreviation). The period and trailing whitespace are consumed.
fn split_at_boundaries(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '.' {
            i += 1;
            continue;
        }

        let mut after_ws = i + 1;
        while after_ws < chars.len() && chars[after_ws].is_whitespace() {
            after_ws += 1;
        }
        let ws_len = after_ws - i - 1;

        if ws_len == 0 || closes_initial(&chars, i) || continues_lowercase(&chars, after_ws, ws_len)
        {
            i += 1;
            continue;
        }

        parts.push(chars[start..i].iter().collect());
        start = after_ws;
        i = after_ws;
    }

    parts.push(chars[start..].iter().collect());
    parts
}

/// True when the period at `dot` is preceded by a lone uppercase letter,
/// i.e. an initial or single-letter abbreviation.
fn closes_initial(chars: &[char], dot: usize) -> bool {
    if dot == 0 || !chars[dot - 1].is_ascii_uppercase() {
        return false;
    }
    dot == 1 || !is_word_char(chars[dot - 2])
}

/// True when the text after the separator resumes in ASCII lowercase and the
/// separator is a single whitespace character (decimal-like constructs and
/// broken abbreviations).
fn continues_lowercase(chars: &[char], after_ws: usize, ws_len: usize) -> bool {
    ws_len == 1
        && chars
            .get(after_ws)
            .is_some_and(|c| c.is_ascii_lowercase())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
