//! Text preprocessing for networked speech.
//!
//! Strips markdown formatting and splits the remaining text into
//! sentence-aligned chunks that the synthesis service can handle in one
//! request.
//!
//! Lengths are measured in `char`s: replies mix Vietnamese and Devanagari,
//! where byte lengths would be two to three times the visible length.

pub use vakya_core::DEFAULT_MAX_CHUNK_CHARS;

/// Characters that end a sentence-like unit.
const TERMINATORS: [char; 4] = ['.', '!', '?', '\n'];

/// Normalize and chunk `text` for synthesis.
///
/// Returns an empty vector when there is nothing to speak.
#[must_use]
pub fn chunk_for_speech(text: &str, max_chars: usize) -> Vec<String> {
    split_into_chunks(&strip_markdown(text), max_chars)
}

/// Strip markdown formatting, keeping line structure.
///
/// Handles:
/// - Fenced code blocks: fence lines are dropped, contents kept verbatim
/// - Inline code (`…`): unwrapped
/// - Headers (# …): text only
/// - Bold / italic / strikethrough (`**`, `__`, `~~`, `*`): markers removed
/// - Links \[text\](url): text only
/// - Bullet / numbered lists, blockquotes: markers removed
/// - Horizontal rules (---, ***, ___): removed
///
/// Newlines survive as single `\n` separators because the chunker treats
/// them as sentence boundaries. Blank lines are dropped and runs of spaces
/// collapse to one.
#[must_use]
pub fn strip_markdown(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut in_code_block = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            in_code_block = !in_code_block;
            continue;
        }

        let processed = if in_code_block {
            collapse_spaces(trimmed)
        } else {
            if is_horizontal_rule(trimmed) {
                continue;
            }
            collapse_spaces(&strip_line_markdown(line))
        };

        if !processed.is_empty() {
            lines.push(processed);
        }
    }

    lines.join("\n")
}

/// Split `text` into sentence-like units.
///
/// A unit is a run of non-terminal characters followed by the run of
/// terminal characters (`.`, `!`, `?`, newline) that ends it. Terminators are
/// kept with their unit, and leading terminators attach to the first unit,
/// so concatenating the units always gives back `text`.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    let mut in_terminal_run = false;
    let mut has_body = false;

    for (idx, c) in text.char_indices() {
        let is_terminal = TERMINATORS.contains(&c);
        if in_terminal_run && !is_terminal {
            units.push(&text[start..idx]);
            start = idx;
        }
        has_body |= !is_terminal;
        // A terminal run only ends a unit that already has some body.
        in_terminal_run = is_terminal && has_body;
    }

    if start < text.len() {
        units.push(&text[start..]);
    }

    units
}

/// Greedily pack sentence units into chunks of at most `max_chars`.
///
/// When the next unit would push the running buffer past the limit, the
/// buffer is flushed and the unit starts a new one. A single unit longer than
/// the limit becomes its own oversized chunk; it is never cut mid-sentence.
#[must_use]
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for unit in split_sentences(text) {
        let unit_chars = unit.chars().count();

        if current_chars + unit_chars > max_chars {
            flush(&mut chunks, &current);
            current.clear();
            current_chars = 0;
        }

        current.push_str(unit);
        current_chars += unit_chars;
    }

    flush(&mut chunks, &current);
    chunks
}

// ── Internal helpers ───────────────────────────────────────────────

fn flush(chunks: &mut Vec<String>, buffer: &str) {
    let trimmed = buffer.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Check if a line is a horizontal rule (---, ***, ___).
fn is_horizontal_rule(line: &str) -> bool {
    let chars: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    chars.len() >= 3
        && chars.iter().all(|&c| c == '-' || c == '*' || c == '_')
        && chars.windows(2).all(|w| w[0] == w[1])
}

/// Strip inline markdown from a single line.
fn strip_line_markdown(line: &str) -> String {
    let mut s = line.trim().to_string();

    while s.starts_with('>') {
        s = s.trim_start_matches('>').trim_start().to_string();
    }

    if s.starts_with('#') {
        s = s.trim_start_matches('#').trim_start().to_string();
    }

    s = strip_list_marker(&s);
    s = strip_links(&s);
    s = strip_inline_code(&s);
    strip_emphasis(&s)
}

fn strip_list_marker(line: &str) -> String {
    if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("+ "))
    {
        return rest.to_string();
    }

    // Numbered: 1. item, 2) item
    if let Some(pos) = line.find(|c: char| !c.is_ascii_digit()) {
        let after = &line[pos..];
        if pos > 0 && (after.starts_with(". ") || after.starts_with(") ")) {
            return after[2..].to_string();
        }
    }

    line.to_string()
}

fn strip_links(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('[') {
        result.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let link = after_open.find(']').and_then(|close| {
            let label = &after_open[..close];
            let tail = after_open[close + 1..].strip_prefix('(')?;
            let url_end = tail.find(')')?;
            Some((label, &tail[url_end + 1..]))
        });

        match link {
            Some((label, remainder)) => {
                result.push_str(label);
                rest = remainder;
            }
            None => {
                result.push('[');
                rest = after_open;
            }
        }
    }

    result.push_str(rest);
    result
}

fn strip_inline_code(text: &str) -> String {
    text.replace('`', "")
}

fn strip_emphasis(text: &str) -> String {
    // A lone `_` is common in identifiers and IAST glosses, so only the
    // doubled form is treated as emphasis.
    text.replace("**", "")
        .replace("__", "")
        .replace("~~", "")
        .replace('*', "")
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_simple_markdown() {
        let input = "**Hello** world! This is *italic* and `code`.";
        assert_eq!(strip_markdown(input), "Hello world! This is italic and code.");
    }

    #[test]
    fn test_strip_link() {
        let input = "Check [this link](https://example.com) out.";
        assert_eq!(strip_markdown(input), "Check this link out.");
    }

    #[test]
    fn test_unclosed_bracket_is_kept() {
        assert_eq!(strip_markdown("a [b c"), "a [b c");
        assert_eq!(strip_markdown("[x] done"), "[x] done");
    }

    #[test]
    fn test_strip_headers_keeps_newline() {
        let input = "### Bài 1\nSome text.";
        assert_eq!(strip_markdown(input), "Bài 1\nSome text.");
    }

    #[test]
    fn test_strip_lists_and_quotes() {
        let input = "- First\n2. Second\n> Quoted";
        assert_eq!(strip_markdown(input), "First\nSecond\nQuoted");
    }

    #[test]
    fn test_code_fence_lines_dropped() {
        let input = "Code:\n```\nनमः\n```\nDone.";
        assert_eq!(strip_markdown(input), "Code:\nनमः\nDone.");
    }

    #[test]
    fn test_horizontal_rule_removed() {
        assert_eq!(strip_markdown("Above.\n---\nBelow."), "Above.\nBelow.");
    }

    #[test]
    fn test_split_sentences_keeps_terminators() {
        let units = split_sentences("Xin chào. Bạn khỏe không?! Tốt\nOK");
        assert_eq!(units, vec!["Xin chào.", " Bạn khỏe không?!", " Tốt\n", "OK"]);
    }

    #[test]
    fn test_split_sentences_leading_terminator_attaches() {
        let units = split_sentences("...wait. Go");
        assert_eq!(units, vec!["...wait.", " Go"]);

        let units = split_sentences("!!?Hi. x");
        assert_eq!(units, vec!["!!?Hi.", " x"]);
    }

    #[test]
    fn test_split_sentences_only_terminators() {
        assert_eq!(split_sentences("?!."), vec!["?!."]);
    }

    #[test]
    fn test_split_short_text() {
        assert_eq!(split_into_chunks("Hello world.", 500), vec!["Hello world."]);
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(split_into_chunks("", 500).is_empty());
        assert!(chunk_for_speech("  \n\t ", 500).is_empty());
        assert!(chunk_for_speech("---\n**", 500).is_empty());
    }

    #[test]
    fn test_no_boundaries_single_oversized_chunk() {
        let text = "a".repeat(1200);
        let chunks = split_into_chunks(&text, 500);
        assert_eq!(chunks, vec![text]);
    }

    #[test]
    fn test_split_long_text_respects_limit() {
        let text: String = (1..=30)
            .map(|i| format!("Đây là câu số {i} trong bài học tiếng Phạn hôm nay. "))
            .collect();
        let chunks = split_into_chunks(&text, 120);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 120, "chunk too long: {chunk}");
        }
    }

    #[test]
    fn test_oversized_sentence_stands_alone() {
        let long = format!("{}.", "x".repeat(50));
        let text = format!("Short one. {long} Tail.");
        let chunks = split_into_chunks(&text, 20);
        assert_eq!(chunks, vec!["Short one.".to_string(), long, "Tail.".to_string()]);
    }

    #[test]
    fn test_chunks_reconstruct_input() {
        let text = "Một. Hai! Ba?\nBốn năm sáu bảy. Tám.";
        let chunks = split_into_chunks(text, 10);
        let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        assert_eq!(strip(&chunks.concat()), strip(text));
    }

    #[test]
    fn test_limit_counts_chars_not_bytes() {
        // 12 characters, 32 bytes
        let text = "नमस्ते दुनि.";
        assert!(text.len() > 12);
        assert_eq!(split_into_chunks(text, 12).len(), 1);
    }
}
