use crate::logging;
use crate::models::{ActiveChapter, Block, Heading, NO_CHAPTER_LABEL, PositionKey, headings_of};
use crate::navigation::NavigationIndex;
use crate::position::PositionStore;
use crate::restore::{
    CHAPTER_RESTORE_ATTEMPTS, CONTINUOUS_RESTORE_ATTEMPTS, FrameScheduler, FrameToken,
    RestoreState, ScrollRestorer, Viewport,
};
use crate::segment::segment_raw;
use crate::settings::{ReaderSettings, SettingsPort};
use crate::source::Chapter;
use crate::tracker::{ActiveChapterTracker, ViewportObserver, VisibilityEvent};

/// Blocks of a single chapter: its title as a heading, then the body.
pub fn chapter_blocks(chapter: &Chapter) -> Vec<Block> {
    let mut blocks = vec![Block::heading(chapter.id.clone(), chapter.title.clone())];
    blocks.extend(segment_raw(&chapter.content));
    blocks
}

/// Where a surface saves its offset and how hard it tries to restore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceContext {
    pub key: PositionKey,
    /// Novel to record as last active on every save, if any.
    pub novel: Option<String>,
    pub budget: u32,
}

impl SurfaceContext {
    /// A whole novel rendered as one continuous surface.
    pub fn continuous(novel: &str) -> Self {
        Self {
            key: PositionKey::new(novel),
            novel: Some(novel.to_string()),
            budget: CONTINUOUS_RESTORE_ATTEMPTS,
        }
    }

    /// One chapter file rendered on its own.
    pub fn chapter(id: &str) -> Self {
        Self {
            key: PositionKey::new(id),
            novel: None,
            budget: CHAPTER_RESTORE_ATTEMPTS,
        }
    }

    pub fn with_budget(mut self, budget: u32) -> Self {
        self.budget = budget;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    IncreaseFont,
    DecreaseFont,
    ToggleTheme,
    ScrollToTop,
    JumpToHeading(usize),
    JumpToNumber(u32),
    PreviousChapter,
    NextChapter,
}

/// Events that ask for the current offset to be persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Throttled to one save per frame.
    Scroll,
    PageHide,
    VisibilityHidden,
    Unload,
    ContextSwitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Restoration has not settled yet; nothing was written.
    Rejected,
    /// A save will run on the next frame.
    Scheduled,
    Saved,
}

/// Inputs that invalidate a completed restoration when they change.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RestoreInputs {
    key: PositionKey,
    font_size: u8,
    block_count: usize,
}

/// One mounted reading surface: segmented content plus the restore, tracking
/// and persistence state that goes with it.
pub struct ReadingSurface {
    context: SurfaceContext,
    blocks: Vec<Block>,
    index: NavigationIndex,
    tracker: ActiveChapterTracker,
    restorer: ScrollRestorer,
    positions: PositionStore,
    settings: ReaderSettings,
    settings_port: Box<dyn SettingsPort>,
    heading_margin: u32,
    save_frame: Option<FrameToken>,
    restore_inputs: Option<RestoreInputs>,
}

impl ReadingSurface {
    pub fn new(
        content: &str,
        context: SurfaceContext,
        positions: PositionStore,
        settings_port: Box<dyn SettingsPort>,
    ) -> Self {
        Self::from_blocks(segment_raw(content), context, positions, settings_port)
    }

    /// A single chapter, its title leading the blocks as a heading.
    pub fn for_chapter(
        chapter: &Chapter,
        context: SurfaceContext,
        positions: PositionStore,
        settings_port: Box<dyn SettingsPort>,
    ) -> Self {
        Self::from_blocks(chapter_blocks(chapter), context, positions, settings_port)
    }

    pub fn from_blocks(
        blocks: Vec<Block>,
        context: SurfaceContext,
        positions: PositionStore,
        settings_port: Box<dyn SettingsPort>,
    ) -> Self {
        let index = NavigationIndex::new(headings_of(&blocks));
        let tracker = ActiveChapterTracker::new(index.len());
        let restorer = ScrollRestorer::new(context.budget);
        let settings = settings_port.load();
        Self {
            context,
            blocks,
            index,
            tracker,
            restorer,
            positions,
            settings,
            settings_port,
            heading_margin: 0,
            save_frame: None,
            restore_inputs: None,
        }
    }

    /// Rows left above a heading after a jump.
    pub fn with_heading_margin(mut self, margin: u32) -> Self {
        self.heading_margin = margin;
        self
    }

    pub fn context(&self) -> &SurfaceContext {
        &self.context
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn index(&self) -> &NavigationIndex {
        &self.index
    }

    pub fn settings(&self) -> ReaderSettings {
        self.settings
    }

    pub fn restore_state(&self) -> RestoreState {
        self.restorer.state()
    }

    pub fn is_settled(&self) -> bool {
        self.restorer.is_settled()
    }

    pub fn active(&self) -> ActiveChapter {
        self.tracker.active()
    }

    pub fn active_heading(&self) -> Option<&Heading> {
        self.active().index().and_then(|i| self.index.get(i))
    }

    /// Title of the active chapter, or the no-chapter label.
    pub fn active_label(&self) -> &str {
        self.active_heading()
            .map(|h| h.title.as_str())
            .unwrap_or(NO_CHAPTER_LABEL)
    }

    pub fn has_previous(&self) -> bool {
        self.active()
            .index()
            .is_some_and(|i| self.index.has_previous(i))
    }

    pub fn has_next(&self) -> bool {
        self.active().index().is_some_and(|i| self.index.has_next(i))
    }

    pub fn mount(
        &mut self,
        viewport: &mut dyn Viewport,
        scheduler: &mut dyn FrameScheduler,
        observer: &mut dyn ViewportObserver,
    ) {
        let target = self.positions.load(&self.context.key);
        logging::info(format!("mounting {} at offset {}", self.context.key, target));
        self.restore_inputs = Some(self.current_inputs());
        self.restorer.mount(target, viewport, scheduler);
        self.tracker.attach(observer);
    }

    pub fn unmount(
        &mut self,
        scheduler: &mut dyn FrameScheduler,
        observer: &mut dyn ViewportObserver,
    ) {
        self.restorer.cancel(scheduler);
        if let Some(token) = self.save_frame.take() {
            scheduler.cancel_frame(token);
        }
        self.tracker.detach(observer);
        self.restore_inputs = None;
    }

    fn current_inputs(&self) -> RestoreInputs {
        RestoreInputs {
            key: self.context.key.clone(),
            font_size: self.settings.font_size,
            block_count: self.blocks.len(),
        }
    }

    /// Restart restoration if the key, font size or block list changed since
    /// the last one began. Returns true when it restarted.
    pub fn sync_inputs(&mut self, scheduler: &mut dyn FrameScheduler) -> bool {
        let Some(previous) = &self.restore_inputs else {
            return false;
        };
        let current = self.current_inputs();
        if *previous == current {
            return false;
        }
        let target = self.positions.load(&current.key);
        logging::debug(format!("layout inputs changed, restoring {} again", current.key));
        self.restore_inputs = Some(current);
        self.restorer.restart(target, scheduler);
        true
    }

    /// Point the surface at another reading context. The old context gets a
    /// final save first.
    pub fn switch_context(
        &mut self,
        context: SurfaceContext,
        viewport: &mut dyn Viewport,
        scheduler: &mut dyn FrameScheduler,
    ) {
        self.commit(FlushTrigger::ContextSwitch, viewport, scheduler);
        self.restorer.cancel(scheduler);
        if let Some(token) = self.save_frame.take() {
            scheduler.cancel_frame(token);
        }
        self.restorer = ScrollRestorer::new(context.budget);
        self.context = context;
        self.sync_inputs(scheduler);
    }

    /// Replace the content. The tracker starts over on the new headings.
    pub fn set_blocks(
        &mut self,
        blocks: Vec<Block>,
        observer: &mut dyn ViewportObserver,
        scheduler: &mut dyn FrameScheduler,
    ) {
        self.tracker.detach(observer);
        self.blocks = blocks;
        self.index = NavigationIndex::new(headings_of(&self.blocks));
        self.tracker = ActiveChapterTracker::new(self.index.len());
        self.tracker.attach(observer);
        self.sync_inputs(scheduler);
    }

    /// Route a delivered frame to whoever asked for it. Returns false for
    /// tokens this surface does not own.
    pub fn on_frame(
        &mut self,
        token: FrameToken,
        viewport: &mut dyn Viewport,
        scheduler: &mut dyn FrameScheduler,
    ) -> bool {
        if self.restorer.on_frame(token, viewport, scheduler) {
            return true;
        }
        if self.save_frame == Some(token) {
            self.save_frame = None;
            if self.restorer.is_settled() {
                self.save(viewport.scroll_offset());
            }
            return true;
        }
        false
    }

    pub fn on_visibility(&mut self, events: &[VisibilityEvent]) -> bool {
        self.tracker.on_visibility(events)
    }

    pub fn poll_observer(&mut self, observer: &mut dyn ViewportObserver) -> bool {
        let events = observer.take_events();
        !events.is_empty() && self.on_visibility(&events)
    }

    /// The single save path for every flush trigger.
    pub fn commit(
        &mut self,
        trigger: FlushTrigger,
        viewport: &dyn Viewport,
        scheduler: &mut dyn FrameScheduler,
    ) -> CommitOutcome {
        if !self.restorer.is_settled() {
            logging::debug(format!("{:?} save ignored while restoring", trigger));
            return CommitOutcome::Rejected;
        }
        match trigger {
            FlushTrigger::Scroll => {
                if self.save_frame.is_none() {
                    self.save_frame = Some(scheduler.request_frame());
                }
                CommitOutcome::Scheduled
            }
            _ => {
                if let Some(token) = self.save_frame.take() {
                    scheduler.cancel_frame(token);
                }
                self.save(viewport.scroll_offset());
                CommitOutcome::Saved
            }
        }
    }

    fn save(&self, offset: u32) {
        logging::debug(format!("saving {} = {}", self.context.key, offset));
        self.positions.save(&self.context.key, offset);
        if let Some(novel) = &self.context.novel {
            self.positions.set_last_active(novel);
        }
    }

    pub fn apply(
        &mut self,
        action: Action,
        viewport: &mut dyn Viewport,
        scheduler: &mut dyn FrameScheduler,
    ) {
        match action {
            Action::IncreaseFont => {
                if self.settings.increase_font() {
                    self.store_settings(scheduler);
                }
            }
            Action::DecreaseFont => {
                if self.settings.decrease_font() {
                    self.store_settings(scheduler);
                }
            }
            Action::ToggleTheme => {
                self.settings.toggle_theme();
                self.store_settings(scheduler);
            }
            Action::ScrollToTop => self.scroll_to(0, viewport, scheduler),
            Action::JumpToHeading(index) => self.jump_to_heading(index, viewport, scheduler),
            Action::JumpToNumber(number) => match self.index.find_by_number(number) {
                Some(index) => self.jump_to_heading(index, viewport, scheduler),
                None => logging::debug(format!("no chapter numbered {}", number)),
            },
            Action::PreviousChapter => {
                if let Some(index) = self.active().index().and_then(|i| self.index.previous_index(i)) {
                    self.jump_to_heading(index, viewport, scheduler);
                }
            }
            Action::NextChapter => {
                if let Some(index) = self.active().index().and_then(|i| self.index.next_index(i)) {
                    self.jump_to_heading(index, viewport, scheduler);
                }
            }
        }
    }

    fn store_settings(&mut self, scheduler: &mut dyn FrameScheduler) {
        self.settings_port.save(&self.settings);
        self.sync_inputs(scheduler);
    }

    fn jump_to_heading(
        &mut self,
        index: usize,
        viewport: &mut dyn Viewport,
        scheduler: &mut dyn FrameScheduler,
    ) {
        match viewport.heading_offset(index) {
            Some(offset) => {
                self.scroll_to(offset.saturating_sub(self.heading_margin), viewport, scheduler)
            }
            None => logging::debug(format!("heading {} is not laid out", index)),
        }
    }

    fn scroll_to(
        &mut self,
        offset: u32,
        viewport: &mut dyn Viewport,
        scheduler: &mut dyn FrameScheduler,
    ) {
        viewport.scroll_to(offset);
        self.commit(FlushTrigger::Scroll, viewport, scheduler);
    }
}
