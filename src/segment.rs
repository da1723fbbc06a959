use crate::models::{Block, Heading};
use crate::normalize::normalize_text;
use regex::Regex;
use std::sync::LazyLock;

/// A sentence chunk is never cut on punctuation before it reaches this length.
pub const MIN_CHUNK_CHARS: usize = 35;
/// A sentence chunk is always cut once it reaches this length.
pub const MAX_CHUNK_CHARS: usize = 120;

const TERMINATORS: [char; 4] = ['。', '！', '？', '；'];
const ELLIPSIS: char = '…';

static CHAPTER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*第\s*([0-9]{1,4})\s*章\s*(.*)$").unwrap());
static BLANK_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Paragraphs separated by blank lines.
    BlankLines,
    /// No blank lines, one unit per line.
    Lines,
    /// A single run-on line, cut at sentence ends.
    Sentences,
}

impl Strategy {
    pub fn detect(text: &str) -> Self {
        if BLANK_LINE.is_match(text) {
            Strategy::BlankLines
        } else if text.contains('\n') {
            Strategy::Lines
        } else {
            Strategy::Sentences
        }
    }
}

/// Segment already-normalized text into headings and paragraphs.
///
/// The result is a pure function of the input: block order is input order,
/// and chapter numbers are never used to reorder anything.
pub fn segment(text: &str) -> Vec<Block> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    match Strategy::detect(text) {
        Strategy::BlankLines => segment_paragraphs(text),
        Strategy::Lines => {
            let blocks = text
                .split('\n')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(classify)
                .collect();
            merge_paragraphs(blocks)
        }
        Strategy::Sentences => chunk_sentences(text).iter().map(|c| classify(c)).collect(),
    }
}

/// Normalize raw source text and segment it.
pub fn segment_raw(raw: &str) -> Vec<Block> {
    segment(&normalize_text(raw))
}

/// Test a single unit against the chapter heading pattern.
pub fn parse_heading(unit: &str) -> Option<Heading> {
    let caps = CHAPTER_LINE.captures(unit)?;
    let id = format!("{:0>2}", &caps[1]);
    let name = caps.get(2).map(|m| m.as_str().trim()).unwrap_or("");
    let title = if name.is_empty() {
        format!("第{}章", id)
    } else {
        format!("第{}章 {}", id, name)
    };
    Some(Heading { id, title })
}

fn classify(unit: &str) -> Block {
    match parse_heading(unit) {
        Some(heading) => Block::Heading(heading),
        None => Block::paragraph(unit.trim()),
    }
}

// Heading lines inside a blank-line paragraph are split out before the
// remaining lines are collapsed, so "第1章 标题\n正文" yields a heading and a
// paragraph rather than one heading swallowing the prose.
fn segment_paragraphs(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();

    for para in BLANK_LINE.split(text) {
        let mut pending: Vec<&str> = Vec::new();
        for line in para.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
            match parse_heading(line) {
                Some(heading) => {
                    flush_lines(&mut pending, &mut blocks);
                    blocks.push(Block::Heading(heading));
                }
                None => pending.push(line),
            }
        }
        flush_lines(&mut pending, &mut blocks);
    }

    blocks
}

fn flush_lines(pending: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if pending.is_empty() {
        return;
    }
    blocks.push(Block::paragraph(pending.join(" ")));
    pending.clear();
}

/// Cut a single run-on line into chunks at sentence ends.
///
/// A chunk ends after a terminator once it holds at least
/// [`MIN_CHUNK_CHARS`] characters, or unconditionally at
/// [`MAX_CHUNK_CHARS`]. A doubled ellipsis counts as one terminator and is
/// never split between chunks.
pub fn chunk_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut buf = String::new();
    let mut len = 0usize;

    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        let doubled_ellipsis = ch == ELLIPSIS && chars.get(i + 1) == Some(&ELLIPSIS);
        // A doubled ellipsis that would overflow the chunk opens the next one.
        if doubled_ellipsis && len + 2 > MAX_CHUNK_CHARS {
            push_chunk(&mut parts, &buf);
            buf.clear();
            len = 0;
        }

        buf.push(ch);
        len += 1;
        if doubled_ellipsis {
            buf.push(ELLIPSIS);
            len += 1;
            i += 1;
        }

        let is_end = doubled_ellipsis || TERMINATORS.contains(&ch);
        if (is_end && len >= MIN_CHUNK_CHARS) || len >= MAX_CHUNK_CHARS {
            push_chunk(&mut parts, &buf);
            buf.clear();
            len = 0;
        }
        i += 1;
    }
    push_chunk(&mut parts, &buf);

    parts
}

fn push_chunk(parts: &mut Vec<String>, buf: &str) {
    let chunk = buf.trim();
    if !chunk.is_empty() {
        parts.push(chunk.to_string());
    }
}

/// Collapse runs of consecutive paragraphs into one, joined by a space.
pub fn merge_paragraphs(blocks: Vec<Block>) -> Vec<Block> {
    let mut merged: Vec<Block> = Vec::with_capacity(blocks.len());
    for block in blocks {
        match (merged.last_mut(), block) {
            (Some(Block::Paragraph(last)), Block::Paragraph(text)) => {
                last.push(' ');
                last.push_str(&text);
            }
            (_, block) => merged.push(block),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_ws(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_blank_line_scenario() {
        let blocks = segment("第1章 开端\n这是第一段。\n\n第2章\n第二段内容。");
        assert_eq!(
            blocks,
            vec![
                Block::heading("01", "第01章 开端"),
                Block::paragraph("这是第一段。"),
                Block::heading("02", "第02章"),
                Block::paragraph("第二段内容。"),
            ]
        );
    }

    #[test]
    fn test_heading_inside_blank_line_paragraph_splits_it() {
        let blocks = segment("前言一行\n第3章 风雪\n正文。\n\n尾声");
        assert_eq!(
            blocks,
            vec![
                Block::paragraph("前言一行"),
                Block::heading("03", "第03章 风雪"),
                Block::paragraph("正文。"),
                Block::paragraph("尾声"),
            ]
        );
    }

    #[test]
    fn test_blank_line_paragraphs_collapse_internal_breaks() {
        let blocks = segment("第一行\n  第二行  \n\n\n \n另一段");
        assert_eq!(
            blocks,
            vec![Block::paragraph("第一行 第二行"), Block::paragraph("另一段")]
        );
    }

    #[test]
    fn test_lines_merge_into_one_paragraph() {
        let blocks = segment("早上出门。\n中午吃饭。\n晚上回家。");
        assert_eq!(blocks, vec![Block::paragraph("早上出门。 中午吃饭。 晚上回家。")]);
    }

    #[test]
    fn test_lines_merge_stops_at_headings() {
        let blocks = segment("序言\n第3章 风雪\n一\n二\n第4章\n三");
        assert_eq!(
            blocks,
            vec![
                Block::paragraph("序言"),
                Block::heading("03", "第03章 风雪"),
                Block::paragraph("一 二"),
                Block::heading("04", "第04章"),
                Block::paragraph("三"),
            ]
        );
    }

    #[test]
    fn test_out_of_order_headings_keep_input_order() {
        let blocks = segment("第9章\n甲\n第2章\n乙\n第2章\n丙");
        let ids: Vec<&str> = blocks
            .iter()
            .filter_map(Block::as_heading)
            .map(|h| h.id.as_str())
            .collect();
        assert_eq!(ids, vec!["09", "02", "02"]);
    }

    #[test]
    fn test_heading_pattern_variants() {
        assert_eq!(parse_heading("  第 7 章   归来 ").unwrap().title, "第07章 归来");
        assert_eq!(parse_heading("第1234章").unwrap().id, "1234");
        assert_eq!(parse_heading("第007章").unwrap().id, "007");
        assert!(parse_heading("第12345章").is_none());
        assert!(parse_heading("第十章").is_none());
        assert!(parse_heading("第１章").is_none());
        assert!(parse_heading("他说第1章很好").is_none());
    }

    #[test]
    fn test_long_unpunctuated_line_is_chunked() {
        let text = "字".repeat(200);
        let chunks = chunk_sentences(&text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= MAX_CHUNK_CHARS));
        assert_eq!(chunks[0].chars().count(), 120);
        assert_eq!(chunks[1].chars().count(), 80);

        let blocks = segment(&text);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_short_punctuated_line_stays_whole() {
        let text = "他停下来。看了看天。然后走了。";
        assert!(text.chars().count() < MIN_CHUNK_CHARS);
        assert_eq!(chunk_sentences(text), vec![text.to_string()]);
    }

    #[test]
    fn test_chunk_cut_after_terminator_past_minimum() {
        let first = format!("{}。", "甲".repeat(40));
        let text = format!("{}{}", first, "乙".repeat(10));
        let chunks = chunk_sentences(&text);
        assert_eq!(chunks, vec![first, "乙".repeat(10)]);
    }

    #[test]
    fn test_ellipsis_at_the_limit_starts_next_chunk() {
        let text = format!("{}……{}", "甲".repeat(119), "乙".repeat(5));
        let chunks = chunk_sentences(&text);
        let lengths: Vec<usize> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lengths, vec![119, 7]);
        assert!(chunks[1].starts_with("……"));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_doubled_ellipsis_is_one_unit() {
        let first = format!("{}……", "甲".repeat(34));
        let text = format!("{}{}", first, "乙".repeat(5));
        let chunks = chunk_sentences(&text);
        assert_eq!(chunks, vec![first, "乙".repeat(5)]);

        // A single ellipsis glyph is not a terminator.
        let single = format!("{}…{}", "甲".repeat(40), "乙".repeat(5));
        assert_eq!(chunk_sentences(&single).len(), 1);
    }

    #[test]
    fn test_segmentation_is_deterministic() {
        let text = "第1章 起\n风吹过。\n\n第2章 承\n雨落下。\n\n尾声";
        assert_eq!(segment(text), segment(text));
    }

    #[test]
    fn test_no_content_lost() {
        let inputs = [
            "一段。\n\n二段\n续行。\n\n三段",
            "一行\n二行\n三行",
            "一句话说完了。又一句话也说完了。这是第三句话，它比较长一些，足够超过最小长度了。最后一句",
        ];
        for input in inputs {
            let joined: String = segment(input).iter().map(Block::text).collect();
            assert_eq!(strip_ws(&joined), strip_ws(input));
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(segment("").is_empty());
        assert!(segment(" \n\n \t").is_empty());
        assert!(segment_raw("\u{FEFF}\r\n").is_empty());
    }

    #[test]
    fn test_strategy_detection() {
        assert_eq!(Strategy::detect("a\n\nb"), Strategy::BlankLines);
        assert_eq!(Strategy::detect("a\n \nb"), Strategy::BlankLines);
        assert_eq!(Strategy::detect("a\nb"), Strategy::Lines);
        assert_eq!(Strategy::detect("ab"), Strategy::Sentences);
    }

    #[test]
    fn test_segment_raw_normalizes_crlf() {
        let blocks = segment_raw("\u{FEFF}第1章\r\n\r\n正文。\r\n");
        assert_eq!(
            blocks,
            vec![Block::heading("01", "第01章"), Block::paragraph("正文。")]
        );
    }
}
