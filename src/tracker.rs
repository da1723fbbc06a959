use crate::logging;
use crate::models::ActiveChapter;
use std::collections::BTreeMap;

/// Upper share of the viewport in which a heading counts as visible.
pub const DEFAULT_VISIBLE_FRACTION: f32 = 0.35;

/// One visibility notification for an observed heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityEvent {
    /// Index into the heading list.
    pub heading: usize,
    pub intersecting: bool,
    /// Top edge relative to the top of the viewport, in rows.
    pub top: i32,
}

/// Capability that reports when observed headings enter or leave the visible
/// band of the viewport.
pub trait ViewportObserver {
    fn observe(&mut self, heading: usize);
    fn disconnect(&mut self);
    fn take_events(&mut self) -> Vec<VisibilityEvent>;
}

/// The part of the viewport that counts for chapter detection: from the top
/// edge down to `fraction` of its height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleBand {
    pub fraction: f32,
}

impl Default for VisibleBand {
    fn default() -> Self {
        Self {
            fraction: DEFAULT_VISIBLE_FRACTION,
        }
    }
}

impl VisibleBand {
    pub fn new(fraction: f32) -> Self {
        Self {
            fraction: fraction.clamp(0.0, 1.0),
        }
    }

    pub fn rows(&self, viewport_height: u32) -> i32 {
        ((viewport_height as f32) * self.fraction).round().max(1.0) as i32
    }

    /// Whether an element spanning `[top, top + height)` overlaps the band.
    pub fn intersects(&self, top: i32, height: u32, viewport_height: u32) -> bool {
        top < self.rows(viewport_height) && top + height as i32 > 0
    }
}

/// Tracks which chapter heading the reader is currently at.
#[derive(Debug, Clone)]
pub struct ActiveChapterTracker {
    visible: BTreeMap<usize, i32>,
    active: ActiveChapter,
    heading_count: usize,
}

impl ActiveChapterTracker {
    pub fn new(heading_count: usize) -> Self {
        let active = if heading_count > 0 {
            ActiveChapter::Heading(0)
        } else {
            ActiveChapter::NotDetected
        };
        Self {
            visible: BTreeMap::new(),
            active,
            heading_count,
        }
    }

    pub fn attach(&mut self, observer: &mut dyn ViewportObserver) {
        for heading in 0..self.heading_count {
            observer.observe(heading);
        }
    }

    pub fn detach(&mut self, observer: &mut dyn ViewportObserver) {
        observer.disconnect();
        self.visible.clear();
    }

    pub fn active(&self) -> ActiveChapter {
        self.active
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Apply a batch of notifications. Returns true when the active chapter
    /// changed. An empty visibility set leaves the previous answer in place.
    pub fn on_visibility(&mut self, events: &[VisibilityEvent]) -> bool {
        for event in events {
            if event.heading >= self.heading_count {
                continue;
            }
            if event.intersecting {
                self.visible.insert(event.heading, event.top);
            } else {
                self.visible.remove(&event.heading);
            }
        }

        // Strict comparison keeps the earlier heading on equal tops.
        let mut best: Option<(usize, i32)> = None;
        for (&heading, &top) in &self.visible {
            if best.is_none_or(|(_, best_top)| top < best_top) {
                best = Some((heading, top));
            }
        }

        match best {
            Some((heading, _)) if self.active != ActiveChapter::Heading(heading) => {
                logging::debug(format!("active chapter -> heading {}", heading));
                self.active = ActiveChapter::Heading(heading);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen(heading: usize, top: i32) -> VisibilityEvent {
        VisibilityEvent {
            heading,
            intersecting: true,
            top,
        }
    }

    fn gone(heading: usize) -> VisibilityEvent {
        VisibilityEvent {
            heading,
            intersecting: false,
            top: 0,
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        observed: Vec<usize>,
        disconnected: bool,
    }

    impl ViewportObserver for RecordingObserver {
        fn observe(&mut self, heading: usize) {
            self.observed.push(heading);
        }

        fn disconnect(&mut self) {
            self.disconnected = true;
        }

        fn take_events(&mut self) -> Vec<VisibilityEvent> {
            Vec::new()
        }
    }

    #[test]
    fn test_initial_state() {
        assert_eq!(ActiveChapterTracker::new(3).active(), ActiveChapter::Heading(0));
        assert_eq!(ActiveChapterTracker::new(0).active(), ActiveChapter::NotDetected);
    }

    #[test]
    fn test_smallest_top_wins() {
        let mut tracker = ActiveChapterTracker::new(2);
        assert!(tracker.on_visibility(&[seen(0, 40), seen(1, 5)]));
        assert_eq!(tracker.active(), ActiveChapter::Heading(1));
    }

    #[test]
    fn test_heading_above_viewport_wins() {
        let mut tracker = ActiveChapterTracker::new(3);
        tracker.on_visibility(&[seen(1, -2), seen(2, 3)]);
        assert_eq!(tracker.active(), ActiveChapter::Heading(1));
    }

    #[test]
    fn test_empty_set_keeps_previous() {
        let mut tracker = ActiveChapterTracker::new(3);
        tracker.on_visibility(&[seen(2, 1)]);
        assert!(!tracker.on_visibility(&[gone(2)]));
        assert_eq!(tracker.visible_count(), 0);
        assert_eq!(tracker.active(), ActiveChapter::Heading(2));
    }

    #[test]
    fn test_leaving_heading_hands_over() {
        let mut tracker = ActiveChapterTracker::new(3);
        tracker.on_visibility(&[seen(0, 0), seen(1, 8)]);
        assert_eq!(tracker.active(), ActiveChapter::Heading(0));
        tracker.on_visibility(&[gone(0)]);
        assert_eq!(tracker.active(), ActiveChapter::Heading(1));
    }

    #[test]
    fn test_equal_tops_prefer_earlier_heading() {
        let mut tracker = ActiveChapterTracker::new(3);
        tracker.on_visibility(&[seen(2, 4), seen(1, 4)]);
        assert_eq!(tracker.active(), ActiveChapter::Heading(1));
    }

    #[test]
    fn test_out_of_range_events_ignored() {
        let mut tracker = ActiveChapterTracker::new(1);
        assert!(!tracker.on_visibility(&[seen(5, 0)]));
        assert_eq!(tracker.visible_count(), 0);
    }

    #[test]
    fn test_attach_and_detach() {
        let mut tracker = ActiveChapterTracker::new(3);
        let mut observer = RecordingObserver::default();
        tracker.attach(&mut observer);
        assert_eq!(observer.observed, vec![0, 1, 2]);

        tracker.on_visibility(&[seen(1, 2)]);
        tracker.detach(&mut observer);
        assert!(observer.disconnected);
        assert_eq!(tracker.visible_count(), 0);
        assert_eq!(tracker.active(), ActiveChapter::Heading(1));
    }

    #[test]
    fn test_visible_band() {
        let band = VisibleBand::default();
        assert_eq!(band.rows(20), 7);
        assert!(band.intersects(0, 1, 20));
        assert!(band.intersects(6, 1, 20));
        assert!(!band.intersects(7, 1, 20));
        assert!(!band.intersects(-1, 1, 20));
        assert!(band.intersects(-1, 2, 20));
        assert_eq!(band.rows(1), 1);
    }
}
