use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::Paragraph,
};
use textwrap::{Options, WordSeparator, WordSplitter};

use crate::models::{Block, Theme};

/// First-line indent of every paragraph: two ideographic spaces.
pub const PARAGRAPH_INDENT: &str = "\u{3000}\u{3000}";
/// Column budget that a font size divides into a line width.
pub const WIDTH_BUDGET: usize = 1440;
const MIN_TEXT_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Heading,
    Rule,
    Text,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardLine {
    pub text: String,
    pub kind: LineKind,
}

/// Colors for the reading area.
pub fn theme_style(theme: Theme) -> Style {
    match theme {
        Theme::Light => Style::default().fg(Color::Black).bg(Color::White),
        Theme::Dark => Style::default().fg(Color::Gray).bg(Color::Black),
    }
}

/// Block list laid out into terminal rows.
#[derive(Debug, Clone, Default)]
pub struct Board {
    lines: Vec<BoardLine>,
    /// First row and row count of each heading, in heading order.
    headings: Vec<(u32, u32)>,
    width: usize,
}

impl Board {
    /// Line width for a font size: larger fonts give shorter lines. Never
    /// wider than the available columns.
    pub fn text_width(font_size: u8, available: u16) -> usize {
        let preferred = WIDTH_BUDGET / (font_size.max(1) as usize);
        preferred.min(available as usize).max(MIN_TEXT_WIDTH)
    }

    pub fn layout(blocks: &[Block], width: usize) -> Self {
        let mut lines = Vec::new();
        let mut headings = Vec::new();

        for (i, block) in blocks.iter().enumerate() {
            if i > 0 {
                lines.push(BoardLine {
                    text: String::new(),
                    kind: LineKind::Blank,
                });
            }
            match block {
                Block::Heading(heading) => {
                    let start = lines.len() as u32;
                    let wrapped = wrap(&heading.title, width, "");
                    let rows = wrapped.len() as u32;
                    lines.extend(wrapped.into_iter().map(|text| BoardLine {
                        text,
                        kind: LineKind::Heading,
                    }));
                    lines.push(BoardLine {
                        text: "─".repeat(width),
                        kind: LineKind::Rule,
                    });
                    headings.push((start, rows));
                }
                Block::Paragraph(text) => {
                    lines.extend(wrap(text, width, PARAGRAPH_INDENT).into_iter().map(|text| {
                        BoardLine {
                            text,
                            kind: LineKind::Text,
                        }
                    }));
                }
            }
        }

        Self {
            lines,
            headings,
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn lines(&self) -> &[BoardLine] {
        &self.lines
    }

    pub fn total_rows(&self) -> u32 {
        self.lines.len() as u32
    }

    pub fn heading_count(&self) -> usize {
        self.headings.len()
    }

    pub fn heading_row(&self, index: usize) -> Option<u32> {
        self.headings.get(index).map(|(row, _)| *row)
    }

    pub fn heading_height(&self, index: usize) -> Option<u32> {
        self.headings.get(index).map(|(_, rows)| *rows)
    }

    pub fn heading_rows(&self) -> Vec<u32> {
        self.headings.iter().map(|(row, _)| *row).collect()
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, offset: u32, theme: Theme) {
        let base = theme_style(theme);
        let start = (offset as usize).min(self.lines.len());
        let end = (start + area.height as usize).min(self.lines.len());

        let visible: Vec<Line> = self.lines[start..end]
            .iter()
            .map(|line| match line.kind {
                LineKind::Heading => Line::styled(
                    line.text.clone(),
                    base.add_modifier(Modifier::BOLD),
                ),
                LineKind::Rule => Line::styled(line.text.clone(), base.add_modifier(Modifier::DIM)),
                LineKind::Text | LineKind::Blank => Line::styled(line.text.clone(), base),
            })
            .collect();

        let padding = (area.width as usize).saturating_sub(self.width) / 2;
        let inner = Rect::new(
            area.x + padding as u16,
            area.y,
            area.width.saturating_sub(padding as u16),
            area.height,
        );
        frame.render_widget(Paragraph::new("").style(base), area);
        frame.render_widget(Paragraph::new(visible).style(base), inner);
    }
}

fn wrap(text: &str, width: usize, indent: &str) -> Vec<String> {
    let options = Options::new(width.max(1))
        .initial_indent(indent)
        .word_separator(WordSeparator::UnicodeBreakProperties)
        .word_splitter(WordSplitter::NoHyphenation);
    textwrap::wrap(text, &options)
        .into_iter()
        .map(|line| line.trim_end().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks() -> Vec<Block> {
        vec![
            Block::heading("01", "第01章 开端"),
            Block::paragraph("天色渐暗，风从北方吹来，雪落满了山谷里的每一棵松树。"),
            Block::heading("02", "第02章 风雪"),
            Block::paragraph("短段。"),
        ]
    }

    #[test]
    fn test_text_width_follows_font_size() {
        assert_eq!(Board::text_width(18, 200), 80);
        assert_eq!(Board::text_width(14, 200), 102);
        assert_eq!(Board::text_width(26, 200), 55);
        assert_eq!(Board::text_width(18, 60), 60);
        assert_eq!(Board::text_width(18, 5), MIN_TEXT_WIDTH);
    }

    #[test]
    fn test_layout_rows() {
        let board = Board::layout(&blocks(), 80);
        let kinds: Vec<LineKind> = board.lines().iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LineKind::Heading,
                LineKind::Rule,
                LineKind::Blank,
                LineKind::Text,
                LineKind::Blank,
                LineKind::Heading,
                LineKind::Rule,
                LineKind::Blank,
                LineKind::Text,
            ]
        );
        assert_eq!(board.heading_rows(), vec![0, 5]);
        assert_eq!(board.heading_height(1), Some(1));
        assert_eq!(board.heading_row(2), None);
        assert_eq!(board.total_rows(), 9);
    }

    #[test]
    fn test_paragraph_indent_and_wrap() {
        let board = Board::layout(&[blocks()[1].clone()], 20);
        let lines = board.lines();
        assert!(lines.len() > 1);
        assert!(lines[0].text.starts_with(PARAGRAPH_INDENT));
        assert!(!lines[1].text.starts_with(PARAGRAPH_INDENT));
        let joined: String = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            joined.trim_start_matches('\u{3000}'),
            "天色渐暗，风从北方吹来，雪落满了山谷里的每一棵松树。"
        );
    }

    #[test]
    fn test_empty_board() {
        let board = Board::layout(&[], 80);
        assert_eq!(board.total_rows(), 0);
        assert_eq!(board.heading_count(), 0);
    }
}
