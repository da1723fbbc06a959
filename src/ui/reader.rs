use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use eyre::Result;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::Paragraph,
};

use crate::config::Config;
use crate::logging;
use crate::models::Theme;
use crate::position::PositionStore;
use crate::restore::{FrameQueue, Viewport};
use crate::segment::segment_raw;
use crate::settings::{Keymap, StoreSettingsPort};
use crate::source::{Novel, load_novel_text, neighbours, read_chapter};
use crate::state::State;
use crate::surface::{
    Action, CommitOutcome, FlushTrigger, ReadingSurface, SurfaceContext, chapter_blocks,
};
use crate::tracker::VisibleBand;
use crate::ui::board::{Board, theme_style};
use crate::ui::viewport::{LayoutObserver, ScreenViewport};
use crate::ui::windows::{
    help::HelpWindow, jump::JumpPrompt, novels::NovelsWindow, toc::TocWindow,
};

/// What the reader walks through: a catalog of whole novels, or a directory
/// of chapter files.
#[derive(Debug, Clone)]
pub enum Library {
    Novels { catalog: Vec<Novel>, current: usize },
    Chapters { dir: PathBuf, ids: Vec<String>, current: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    Reader,
    Help,
    Toc,
    Novels,
    Jump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Warning,
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub active_window: WindowType,
    pub toc: TocWindow,
    pub novels: NovelsWindow,
    pub jump: JumpPrompt,
    pub help_scroll_offset: u16,
    pub message: Option<String>,
    pub message_type: MessageType,
    pub message_time: Option<Instant>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            active_window: WindowType::Reader,
            toc: TocWindow::new(),
            novels: NovelsWindow::default(),
            jump: JumpPrompt::default(),
            help_scroll_offset: 0,
            message: None,
            message_type: MessageType::Info,
            message_time: None,
        }
    }
}

impl UiState {
    pub fn set_message(&mut self, message: String, message_type: MessageType) {
        self.message = Some(message);
        self.message_type = message_type;
        self.message_time = Some(Instant::now());
    }

    pub fn clear_message(&mut self) {
        self.message = None;
        self.message_time = None;
    }

    /// Returns true if the current message has expired (older than 3 seconds).
    pub fn message_expired(&self) -> bool {
        self.message_time
            .is_some_and(|t| t.elapsed() >= Duration::from_secs(3))
    }
}

pub struct Reader {
    config: Config,
    positions: PositionStore,
    history: Option<Rc<RefCell<State>>>,
    library: Library,
    surface: ReadingSurface,
    board: Board,
    viewport: ScreenViewport,
    observer: LayoutObserver,
    frames: FrameQueue,
    ui: UiState,
    area: (u16, u16),
    layout_dirty: bool,
    mounted: bool,
    should_quit: bool,
}

impl Reader {
    pub fn new(
        config: Config,
        positions: PositionStore,
        history: Option<Rc<RefCell<State>>>,
        library: Library,
    ) -> Result<Self> {
        let surface = Self::open_surface(&config, &positions, &library)?;
        let band = VisibleBand::new(config.settings.visible_fraction);
        Ok(Self {
            config,
            positions,
            history,
            library,
            surface,
            board: Board::default(),
            viewport: ScreenViewport::new(0),
            observer: LayoutObserver::new(band),
            frames: FrameQueue::new(),
            ui: UiState::default(),
            area: (0, 0),
            layout_dirty: true,
            mounted: false,
            should_quit: false,
        })
    }

    fn open_surface(
        config: &Config,
        positions: &PositionStore,
        library: &Library,
    ) -> Result<ReadingSurface> {
        let port = Box::new(StoreSettingsPort::new(positions.durable()));
        let surface = match library {
            Library::Novels { catalog, current } => {
                let novel = catalog
                    .get(*current)
                    .ok_or_else(|| eyre::eyre!("no novels to read"))?;
                let context = SurfaceContext::continuous(&novel.key)
                    .with_budget(config.settings.restore_attempts);
                ReadingSurface::new(
                    &load_novel_text(&novel.file),
                    context,
                    positions.clone(),
                    port,
                )
            }
            Library::Chapters { dir, ids, current } => {
                let id = ids
                    .get(*current)
                    .ok_or_else(|| eyre::eyre!("no chapters in {}", dir.display()))?;
                let chapter = read_chapter(dir, id)?;
                let context = SurfaceContext::chapter(id)
                    .with_budget(config.settings.chapter_restore_attempts);
                ReadingSurface::for_chapter(&chapter, context, positions.clone(), port)
            }
        };
        Ok(surface.with_heading_margin(config.settings.heading_scroll_margin))
    }

    pub fn surface(&self) -> &ReadingSurface {
        &self.surface
    }

    pub fn viewport(&self) -> &ScreenViewport {
        &self.viewport
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn keymap(&self) -> &Keymap {
        &self.config.keymap
    }

    /// Rows taken by the toolbar and, when shown, the status line.
    fn chrome_rows(&self) -> u16 {
        if self.config.settings.show_status_bar { 2 } else { 1 }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.area = (width, height);
        self.viewport
            .set_height(height.saturating_sub(self.chrome_rows()) as u32);
        self.layout_dirty = true;
    }

    fn relayout(&mut self) {
        let available = self.area.0.saturating_sub(2);
        let width = Board::text_width(self.surface.settings().font_size, available);
        if !self.layout_dirty && width == self.board.width() {
            return;
        }
        self.board = Board::layout(self.surface.blocks(), width);
        self.viewport.set_layout(&self.board);
        self.layout_dirty = false;
    }

    pub fn mount(&mut self) {
        self.relayout();
        self.surface
            .mount(&mut self.viewport, &mut self.frames, &mut self.observer);
        self.mounted = true;
    }

    /// One frame of work: lay out, run frame callbacks, then report heading
    /// visibility.
    pub fn tick(&mut self) {
        self.relayout();
        for token in self.frames.drain() {
            self.surface
                .on_frame(token, &mut self.viewport, &mut self.frames);
        }
        self.observer.update(&self.board, &self.viewport);
        self.surface.poll_observer(&mut self.observer);

        if self.ui.message_expired() {
            self.ui.clear_message();
        }
    }

    pub fn has_pending_frames(&self) -> bool {
        self.frames.has_pending()
    }

    fn flush(&mut self, trigger: FlushTrigger) {
        if self.surface.commit(trigger, &self.viewport, &mut self.frames) == CommitOutcome::Saved {
            self.record_history();
        }
    }

    fn record_history(&self) {
        let Some(history) = &self.history else {
            return;
        };
        let context = &self.surface.context().key.context;
        let title = match &self.library {
            Library::Novels { catalog, current } => catalog.get(*current).map(|n| n.name.clone()),
            Library::Chapters { .. } => self.surface.index().get(0).map(|h| h.title.clone()),
        };
        let offset = self.viewport.scroll_offset();
        if let Err(err) = history
            .borrow()
            .update_library(context, title.as_deref(), offset)
        {
            logging::warn(format!("could not update history: {}", err));
        }
    }

    /// Save and detach before the reader goes away.
    pub fn close(&mut self) {
        if !self.mounted {
            return;
        }
        self.flush(FlushTrigger::Unload);
        self.surface.unmount(&mut self.frames, &mut self.observer);
        self.mounted = false;
    }

    fn scroll_by(&mut self, delta: i64) {
        if self.viewport.scroll_by(delta) {
            self.flush(FlushTrigger::Scroll);
        }
    }

    fn apply(&mut self, action: Action) {
        self.surface
            .apply(action, &mut self.viewport, &mut self.frames);
        if matches!(action, Action::IncreaseFont | Action::DecreaseFont) {
            self.layout_dirty = true;
        }
    }

    /// Swap in another novel from the catalog.
    pub fn switch_novel(&mut self, index: usize) {
        let Library::Novels { catalog, current } = &self.library else {
            return;
        };
        if index == *current {
            return;
        }
        let Some(novel) = catalog.get(index).cloned() else {
            return;
        };

        if self.surface.is_settled() {
            self.record_history();
        }
        let context =
            SurfaceContext::continuous(&novel.key).with_budget(self.config.settings.restore_attempts);
        self.surface
            .switch_context(context, &mut self.viewport, &mut self.frames);
        let blocks = segment_raw(&load_novel_text(&novel.file));
        self.surface
            .set_blocks(blocks, &mut self.observer, &mut self.frames);
        self.positions.set_last_active(&novel.key);

        if let Library::Novels { current, .. } = &mut self.library {
            *current = index;
        }
        self.layout_dirty = true;
        logging::info(format!("switched to novel {}", novel.key));
    }

    /// Step to the neighbouring chapter file.
    pub fn step_chapter(&mut self, forward: bool) {
        let Library::Chapters { dir, ids, current } = &self.library else {
            return;
        };
        let (prev, next) = neighbours(ids, &ids[*current]);
        let Some(target) = (if forward { next } else { prev }).map(str::to_string) else {
            return;
        };
        let chapter = match read_chapter(dir, &target) {
            Ok(chapter) => chapter,
            Err(err) => {
                logging::warn(format!("could not open chapter {}: {}", target, err));
                self.ui
                    .set_message(format!("无法打开第 {} 章", target), MessageType::Warning);
                return;
            }
        };
        let position = ids.iter().position(|i| *i == target);

        if self.surface.is_settled() {
            self.record_history();
        }
        let context = SurfaceContext::chapter(&target)
            .with_budget(self.config.settings.chapter_restore_attempts);
        self.surface
            .switch_context(context, &mut self.viewport, &mut self.frames);
        self.surface
            .set_blocks(chapter_blocks(&chapter), &mut self.observer, &mut self.frames);

        if let (Library::Chapters { current, .. }, Some(position)) = (&mut self.library, position) {
            *current = position;
        }
        self.layout_dirty = true;
    }

    fn chapter_availability(&self) -> (bool, bool) {
        match &self.library {
            Library::Novels { .. } => (self.surface.has_previous(), self.surface.has_next()),
            Library::Chapters { ids, current, .. } => {
                let (prev, next) = neighbours(ids, &ids[*current]);
                (prev.is_some(), next.is_some())
            }
        }
    }

    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key_event(key)?,
            Event::FocusLost => self.flush(FlushTrigger::VisibilityHidden),
            Event::Resize(width, height) => self.resize(width, height),
            _ => {}
        }
        Ok(())
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        match self.ui.active_window {
            WindowType::Reader => self.handle_reader_keys(key),
            WindowType::Help => self.handle_help_keys(key),
            WindowType::Toc => self.handle_toc_keys(key),
            WindowType::Novels => self.handle_novels_keys(key),
            WindowType::Jump => self.handle_jump_keys(key),
        }
        Ok(())
    }

    fn handle_reader_keys(&mut self, key: KeyEvent) {
        if self.ui.message.is_some() {
            self.ui.clear_message();
        }
        match key.code {
            KeyCode::Up => self.scroll_by(-1),
            KeyCode::Down => self.scroll_by(1),
            KeyCode::PageUp => self.scroll_by(-self.viewport.page()),
            KeyCode::PageDown | KeyCode::Char(' ') => self.scroll_by(self.viewport.page()),
            KeyCode::Home => self.apply(Action::ScrollToTop),
            KeyCode::Esc => self.quit(),
            KeyCode::Char(c) => self.handle_reader_char(c),
            _ => {}
        }
    }

    fn handle_reader_char(&mut self, c: char) {
        let keymap = self.keymap().clone();
        let chapters = matches!(self.library, Library::Chapters { .. });

        if Keymap::matches(&keymap.quit, c) {
            self.quit();
        } else if Keymap::matches(&keymap.next_chapter, c) {
            if chapters {
                self.step_chapter(true);
            } else {
                self.apply(Action::NextChapter);
            }
        } else if Keymap::matches(&keymap.prev_chapter, c) {
            if chapters {
                self.step_chapter(false);
            } else {
                self.apply(Action::PreviousChapter);
            }
        } else if Keymap::matches(&keymap.enlarge, c) || (c == '=' && keymap.enlarge == "+") {
            self.apply(Action::IncreaseFont);
        } else if Keymap::matches(&keymap.shrink, c) {
            self.apply(Action::DecreaseFont);
        } else if Keymap::matches(&keymap.switch_color, c) {
            self.apply(Action::ToggleTheme);
        } else if Keymap::matches(&keymap.scroll_to_top, c) {
            self.apply(Action::ScrollToTop);
        } else if Keymap::matches(&keymap.table_of_contents, c) {
            self.ui
                .toc
                .open(self.surface.index(), self.surface.active().index());
            self.ui.active_window = WindowType::Toc;
        } else if Keymap::matches(&keymap.novels, c) {
            if let Library::Novels { current, .. } = &self.library {
                self.ui.novels.open(*current);
                self.ui.active_window = WindowType::Novels;
            }
        } else if Keymap::matches(&keymap.jump_to_chapter, c) {
            self.ui.jump.clear();
            self.ui.active_window = WindowType::Jump;
        } else if Keymap::matches(&keymap.help, c) {
            self.ui.help_scroll_offset = 0;
            self.ui.active_window = WindowType::Help;
        }
    }

    fn quit(&mut self) {
        self.flush(FlushTrigger::PageHide);
        self.should_quit = true;
    }

    fn close_window(&mut self) {
        self.ui.active_window = WindowType::Reader;
    }

    fn handle_help_keys(&mut self, key: KeyEvent) {
        let total = HelpWindow::get_total_lines(self.keymap()) as u16;
        match key.code {
            KeyCode::Up => self.ui.help_scroll_offset = self.ui.help_scroll_offset.saturating_sub(1),
            KeyCode::Down => {
                self.ui.help_scroll_offset = (self.ui.help_scroll_offset + 1).min(total.saturating_sub(1))
            }
            _ => self.close_window(),
        }
    }

    fn handle_toc_keys(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.close_window(),
            KeyCode::Up => self.ui.toc.previous_entry(),
            KeyCode::Down => self.ui.toc.next_entry(),
            KeyCode::Backspace => self.ui.toc.pop_char(self.surface.index()),
            KeyCode::Enter => {
                if let Some(index) = self.ui.toc.selected() {
                    self.apply(Action::JumpToHeading(index));
                }
                self.close_window();
            }
            KeyCode::Char(c) => self.ui.toc.push_char(c, self.surface.index()),
            _ => {}
        }
    }

    fn handle_novels_keys(&mut self, key: KeyEvent) {
        let len = match &self.library {
            Library::Novels { catalog, .. } => catalog.len(),
            Library::Chapters { .. } => 0,
        };
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.close_window(),
            KeyCode::Up | KeyCode::Char('k') => self.ui.novels.previous_entry(),
            KeyCode::Down | KeyCode::Char('j') => self.ui.novels.next_entry(len),
            KeyCode::Enter => {
                let index = self.ui.novels.selected_index;
                self.close_window();
                self.switch_novel(index);
            }
            _ => {}
        }
    }

    fn handle_jump_keys(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.close_window(),
            KeyCode::Backspace => self.ui.jump.pop_char(),
            KeyCode::Enter => {
                self.close_window();
                let Some(number) = self.ui.jump.number() else {
                    return;
                };
                if self.surface.index().find_by_number(number).is_some() {
                    self.apply(Action::JumpToNumber(number));
                } else {
                    self.ui
                        .set_message(format!("没有第 {} 章", number), MessageType::Warning);
                }
            }
            KeyCode::Char(c) => self.ui.jump.push_char(c),
            _ => {}
        }
    }

    fn toolbar_text(&self) -> String {
        let name = match &self.library {
            Library::Novels { catalog, current } => catalog
                .get(*current)
                .map(|n| n.name.clone())
                .unwrap_or_default(),
            Library::Chapters { ids, current, .. } => format!("{}/{}", current + 1, ids.len()),
        };
        let (prev, next) = self.chapter_availability();
        let settings = self.surface.settings();
        format!(
            " {} │ {} │ {} {} │ {}px │ {}",
            name,
            self.surface.active_label(),
            if prev { "← 上一章" } else { "        " },
            if next { "下一章 →" } else { "" },
            settings.font_size,
            match settings.theme {
                Theme::Light => "日间",
                Theme::Dark => "夜间",
            }
        )
    }

    pub fn render(&self, frame: &mut Frame) {
        let [toolbar, content, status] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(self.chrome_rows() - 1),
        ])
        .areas(frame.area());
        let area = frame.area();

        let theme = self.surface.settings().theme;
        let bar_style = theme_style(theme).fg(Color::DarkGray);
        frame.render_widget(Paragraph::new(self.toolbar_text()).style(bar_style), toolbar);

        self.board
            .render(frame, content, self.viewport.scroll_offset(), theme);

        if self.config.settings.show_status_bar {
            self.render_status(frame, status, bar_style);
        }

        match self.ui.active_window {
            WindowType::Reader => {}
            WindowType::Help => {
                HelpWindow::render(frame, area, self.keymap(), self.ui.help_scroll_offset)
            }
            WindowType::Toc => self.ui.toc.render(frame, area),
            WindowType::Novels => {
                if let Library::Novels { catalog, current } = &self.library {
                    self.ui.novels.render(frame, area, catalog, *current);
                }
            }
            WindowType::Jump => self.ui.jump.render(frame, area),
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect, style: Style) {
        let line = match (&self.ui.message, self.ui.message_type) {
            (Some(message), MessageType::Warning) => {
                Line::styled(format!(" {}", message), style.fg(Color::Red))
            }
            (Some(message), MessageType::Info) => Line::styled(format!(" {}", message), style),
            (None, _) => {
                let total = self.viewport.max_offset().max(1);
                let percent = self.viewport.scroll_offset() * 100 / total;
                Line::styled(
                    format!(" {}%  {} 帮助", percent.min(100), self.keymap().help),
                    style,
                )
            }
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    /// Run the main application loop
    pub fn run(&mut self) -> Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(
            io::stdout(),
            crossterm::terminal::EnterAlternateScreen,
            crossterm::event::EnableFocusChange
        )?;
        logging::set_muted(true);

        let result = self.event_loop();

        logging::set_muted(false);
        if let Err(err) = &result {
            logging::error(format!("reader stopped: {}", err));
        }
        crossterm::execute!(
            io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::event::DisableFocusChange
        )?;
        crossterm::terminal::disable_raw_mode()?;

        self.close();
        result
    }

    fn event_loop(&mut self) -> Result<()> {
        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        terminal.clear()?;
        terminal.hide_cursor()?;

        let (width, height) = crossterm::terminal::size()?;
        self.resize(width, height);
        self.mount();

        loop {
            self.tick();
            if self.should_quit {
                break;
            }

            terminal.draw(|f| self.render(f))?;

            // Frame requests are served at roughly display rate; otherwise
            // wake up only for message expiry.
            let poll_timeout = if self.frames.has_pending() {
                Duration::from_millis(16)
            } else if self.ui.message_time.is_some() {
                Duration::from_millis(250)
            } else {
                Duration::from_secs(60)
            };

            if crossterm::event::poll(poll_timeout)? {
                let event = crossterm::event::read()?;
                self.handle_event(event)?;
            }
        }

        terminal.show_cursor()?;
        Ok(())
    }
}
