use ratatui::{
    Frame,
    layout::Rect,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::navigation::parse_chapter_number;

/// One-line prompt for a chapter number.
#[derive(Debug, Clone, Default)]
pub struct JumpPrompt {
    pub input: String,
}

impl JumpPrompt {
    pub fn clear(&mut self) {
        self.input.clear();
    }

    /// Only digits are accepted.
    pub fn push_char(&mut self, c: char) {
        if c.is_ascii_digit() && self.input.len() < 6 {
            self.input.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        self.input.pop();
    }

    pub fn number(&self) -> Option<u32> {
        parse_chapter_number(&self.input)
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let width = 30.min(area.width);
        let height = 3.min(area.height);
        let popup_area = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        );
        frame.render_widget(Clear, popup_area);
        let paragraph = Paragraph::new(format!("第 {} 章", self.input))
            .block(Block::default().title("跳转").borders(Borders::ALL));
        frame.render_widget(paragraph, popup_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_accepts_digits_only() {
        let mut prompt = JumpPrompt::default();
        for c in "1a2-".chars() {
            prompt.push_char(c);
        }
        assert_eq!(prompt.input, "12");
        assert_eq!(prompt.number(), Some(12));
        prompt.pop_char();
        prompt.pop_char();
        assert_eq!(prompt.number(), None);
        prompt.push_char('0');
        assert_eq!(prompt.number(), None);
    }
}
