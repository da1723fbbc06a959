use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::navigation::NavigationIndex;
use crate::ui::windows::centered_popup_area;

/// Chapter index with an incremental title filter.
#[derive(Debug, Clone, Default)]
pub struct TocWindow {
    pub query: String,
    /// Heading indices matching the query, with their titles.
    pub entries: Vec<(usize, String)>,
    pub selected_index: usize,
}

impl TocWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the entry list from `index`, selecting `active` if it matches.
    pub fn open(&mut self, index: &NavigationIndex, active: Option<usize>) {
        self.query.clear();
        self.refresh(index);
        if let Some(active) = active
            && let Some(pos) = self.entries.iter().position(|(i, _)| *i == active)
        {
            self.selected_index = pos;
        }
    }

    pub fn refresh(&mut self, index: &NavigationIndex) {
        self.entries = index
            .filter(&self.query)
            .into_iter()
            .map(|(i, heading)| (i, heading.title.clone()))
            .collect();
        self.selected_index = 0;
    }

    pub fn push_char(&mut self, c: char, index: &NavigationIndex) {
        self.query.push(c);
        self.refresh(index);
    }

    pub fn pop_char(&mut self, index: &NavigationIndex) {
        self.query.pop();
        self.refresh(index);
    }

    pub fn next_entry(&mut self) {
        if !self.entries.is_empty() {
            self.selected_index = (self.selected_index + 1).min(self.entries.len() - 1);
        }
    }

    pub fn previous_entry(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    /// Heading index of the selected entry.
    pub fn selected(&self) -> Option<usize> {
        self.entries.get(self.selected_index).map(|(i, _)| *i)
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_popup_area(area, 50, 80);
        frame.render_widget(Clear, popup_area);

        let title = if self.query.is_empty() {
            "目录".to_string()
        } else {
            format!("目录 / {}", self.query)
        };

        if self.entries.is_empty() {
            let empty_text = vec![
                Line::from("没有匹配的章节"),
                Line::from(""),
                Line::from(Span::styled(
                    "Esc 关闭",
                    Style::default().add_modifier(Modifier::ITALIC),
                )),
            ];
            let paragraph = Paragraph::new(empty_text)
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().title(title).borders(Borders::ALL));
            frame.render_widget(paragraph, popup_area);
            return;
        }

        // Keep the selection on screen.
        let visible = popup_area.height.saturating_sub(2).max(1) as usize;
        let skip = self.selected_index.saturating_sub(visible - 1);

        let items: Vec<ListItem> = self
            .entries
            .iter()
            .enumerate()
            .skip(skip)
            .take(visible)
            .map(|(i, (_, title))| {
                let style = if i == self.selected_index {
                    Style::default().bg(Color::Blue).fg(Color::White)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(title.clone())).style(style)
            })
            .collect();

        let list = List::new(items).block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(list, popup_area);
    }
}
