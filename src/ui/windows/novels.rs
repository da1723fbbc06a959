use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem},
};

use crate::source::Novel;
use crate::ui::windows::centered_popup_area;

/// Picker over the novel catalog.
#[derive(Debug, Clone, Default)]
pub struct NovelsWindow {
    pub selected_index: usize,
}

impl NovelsWindow {
    pub fn open(&mut self, current: usize) {
        self.selected_index = current;
    }

    pub fn next_entry(&mut self, len: usize) {
        if len > 0 {
            self.selected_index = (self.selected_index + 1).min(len - 1);
        }
    }

    pub fn previous_entry(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, novels: &[Novel], current: usize) {
        let popup_area = centered_popup_area(area, 40, 50);
        frame.render_widget(Clear, popup_area);

        let items: Vec<ListItem> = novels
            .iter()
            .enumerate()
            .map(|(i, novel)| {
                let mut style = if i == self.selected_index {
                    Style::default().bg(Color::Blue).fg(Color::White)
                } else {
                    Style::default()
                };
                if i == current {
                    style = style.add_modifier(Modifier::BOLD);
                }
                ListItem::new(Line::from(novel.name.clone())).style(style)
            })
            .collect();

        let list = List::new(items).block(Block::default().title("小说").borders(Borders::ALL));
        frame.render_widget(list, popup_area);
    }
}
