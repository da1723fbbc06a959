use std::collections::{BTreeMap, BTreeSet};

use eyre::Result;

use crate::restore::Viewport;
use crate::tracker::{ViewportObserver, VisibilityEvent, VisibleBand};
use crate::ui::board::Board;

/// Terminal-backed viewport. Offsets are rows of the current [`Board`].
#[derive(Debug, Clone, Default)]
pub struct ScreenViewport {
    offset: u32,
    height: u32,
    total_rows: u32,
    headings: Vec<u32>,
    manual_restoration: bool,
}

impl ScreenViewport {
    pub fn new(height: u32) -> Self {
        Self {
            height,
            ..Default::default()
        }
    }

    pub fn set_height(&mut self, height: u32) {
        self.height = height;
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Take over the geometry of a freshly laid out board.
    pub fn set_layout(&mut self, board: &Board) {
        self.total_rows = board.total_rows();
        self.headings = board.heading_rows();
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn max_offset(&self) -> u32 {
        self.total_rows.saturating_sub(self.height)
    }

    pub fn manual_restoration(&self) -> bool {
        self.manual_restoration
    }

    /// Scroll by `delta` rows. Returns true when the offset moved.
    pub fn scroll_by(&mut self, delta: i64) -> bool {
        let before = self.offset;
        let target = (self.offset as i64 + delta).clamp(0, self.max_offset() as i64);
        self.offset = target as u32;
        self.offset != before
    }

    pub fn page(&self) -> i64 {
        self.height.saturating_sub(1).max(1) as i64
    }
}

impl Viewport for ScreenViewport {
    fn scroll_offset(&self) -> u32 {
        self.offset
    }

    fn scroll_to(&mut self, offset: u32) {
        self.offset = offset.min(self.max_offset());
    }

    fn heading_offset(&self, index: usize) -> Option<u32> {
        self.headings.get(index).copied()
    }

    fn disable_scroll_restoration(&mut self) -> Result<()> {
        self.manual_restoration = true;
        Ok(())
    }
}

/// Derives visibility events for observed headings from the board geometry
/// after every layout or scroll.
#[derive(Debug, Clone, Default)]
pub struct LayoutObserver {
    band: VisibleBand,
    observed: BTreeSet<usize>,
    last: BTreeMap<usize, (bool, i32)>,
    pending: Vec<VisibilityEvent>,
}

impl LayoutObserver {
    pub fn new(band: VisibleBand) -> Self {
        Self {
            band,
            ..Default::default()
        }
    }

    /// Emit an event for every observed heading whose intersection state
    /// changed, or whose top moved while intersecting.
    pub fn update(&mut self, board: &Board, viewport: &ScreenViewport) {
        let offset = viewport.scroll_offset() as i64;
        for &heading in &self.observed {
            let (Some(row), Some(rows)) = (board.heading_row(heading), board.heading_height(heading))
            else {
                continue;
            };
            let top = (row as i64 - offset).clamp(i32::MIN as i64, i32::MAX as i64) as i32;
            let intersecting = self.band.intersects(top, rows, viewport.height());

            let changed = match self.last.get(&heading) {
                None => intersecting,
                Some(&(was, last_top)) => was != intersecting || (intersecting && last_top != top),
            };
            self.last.insert(heading, (intersecting, top));
            if changed {
                self.pending.push(VisibilityEvent {
                    heading,
                    intersecting,
                    top,
                });
            }
        }
    }
}

impl ViewportObserver for LayoutObserver {
    fn observe(&mut self, heading: usize) {
        self.observed.insert(heading);
    }

    fn disconnect(&mut self) {
        self.observed.clear();
        self.last.clear();
        self.pending.clear();
    }

    fn take_events(&mut self) -> Vec<VisibilityEvent> {
        std::mem::take(&mut self.pending)
    }
}
