use ratatui::{
    Frame,
    layout::Rect,
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::settings::Keymap;

pub struct HelpWindow;

impl HelpWindow {
    pub fn lines(keymap: &Keymap) -> Vec<String> {
        vec![
            " Reading:".to_string(),
            "   Up / Down             Line Up / Down".to_string(),
            "   PgUp / PgDn / Space   Page Up / Down".to_string(),
            format!("   {:<22}Top", keymap.scroll_to_top),
            format!("   {:<22}Next Chapter", keymap.next_chapter),
            format!("   {:<22}Prev Chapter", keymap.prev_chapter),
            format!("   {:<22}Jump To Chapter Number", keymap.jump_to_chapter),
            String::new(),
            " Display:".to_string(),
            format!("   {} / {:<18}Larger / Smaller Font", keymap.enlarge, keymap.shrink),
            format!("   {:<22}Light / Dark Theme", keymap.switch_color),
            String::new(),
            " Windows:".to_string(),
            format!("   {:<22}Chapter Index", keymap.table_of_contents),
            format!("   {:<22}Novels", keymap.novels),
            format!("   {:<22}Quit / Close Window", keymap.quit),
            format!("   {:<22}Help", keymap.help),
        ]
    }

    pub fn get_total_lines(keymap: &Keymap) -> usize {
        Self::lines(keymap).len()
    }

    pub fn render(frame: &mut Frame, area: Rect, keymap: &Keymap, scroll_offset: u16) {
        let help_content: Vec<Line> = Self::lines(keymap).into_iter().map(Line::from).collect();

        let max_width = help_content.iter().map(|l| l.width()).max().unwrap_or(0) as u16;
        let width = (max_width + 4).min(area.width);
        let height = (help_content.len() as u16 + 2).min(area.height);

        let x = area.x + (area.width - width) / 2;
        let y = area.y + (area.height - height) / 2;
        let popup_area = Rect::new(x, y, width, height);

        frame.render_widget(Clear, popup_area);

        let help_paragraph = Paragraph::new(help_content)
            .block(Block::default().title("Help").borders(Borders::ALL))
            .scroll((scroll_offset, 0));

        frame.render_widget(help_paragraph, popup_area);
    }
}
