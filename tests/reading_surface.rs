use std::collections::BTreeMap;

use nread::models::{ActiveChapter, PositionKey};
use nread::position::{KeyValueStore, MemoryStore, PositionStore};
use nread::restore::{FrameQueue, RestoreState, Viewport};
use nread::settings::StoreSettingsPort;
use nread::surface::{Action, CommitOutcome, FlushTrigger, ReadingSurface, SurfaceContext};
use nread::tracker::{ActiveChapterTracker, ViewportObserver, VisibilityEvent};

/// A page whose headings sit at fixed offsets.
#[derive(Default)]
struct Page {
    offset: u32,
    headings: BTreeMap<usize, u32>,
}

impl Viewport for Page {
    fn scroll_offset(&self) -> u32 {
        self.offset
    }

    fn scroll_to(&mut self, offset: u32) {
        self.offset = offset;
    }

    fn heading_offset(&self, index: usize) -> Option<u32> {
        self.headings.get(&index).copied()
    }
}

#[derive(Default)]
struct Events {
    observed: Vec<usize>,
    queued: Vec<VisibilityEvent>,
}

impl ViewportObserver for Events {
    fn observe(&mut self, heading: usize) {
        self.observed.push(heading);
    }

    fn disconnect(&mut self) {
        self.observed.clear();
    }

    fn take_events(&mut self) -> Vec<VisibilityEvent> {
        std::mem::take(&mut self.queued)
    }
}

const NOVEL: &str = "第1章 开端\n\n甲段。\n\n第2章 风雪\n\n乙段。\n\n第3章 归来\n\n丙段。";

#[test]
fn test_session_tier_outlives_cleared_durable_tier() {
    let durable = MemoryStore::shared();
    let session = MemoryStore::shared();
    let store = PositionStore::new(durable.clone(), session.clone());
    let key = PositionKey::new("novel");

    assert_eq!(store.load(&key), 0);
    store.save(&key, 450);
    durable.borrow_mut().clear();
    assert_eq!(store.load(&key), 450);
    assert_eq!(
        session.borrow().get("ss_nr_pos_novel").unwrap().as_deref(),
        Some("450")
    );
}

#[test]
fn test_topmost_visible_heading_is_active() {
    let mut tracker = ActiveChapterTracker::new(2);
    let changed = tracker.on_visibility(&[
        VisibilityEvent {
            heading: 0,
            intersecting: true,
            top: 40,
        },
        VisibilityEvent {
            heading: 1,
            intersecting: true,
            top: 5,
        },
    ]);
    assert!(changed);
    assert_eq!(tracker.active(), ActiveChapter::Heading(1));
}

#[test]
fn test_reading_session_round_trip() {
    let durable = MemoryStore::shared();
    durable.borrow_mut().set("nr_pos_novel", "120").unwrap();
    durable.borrow_mut().set("nr_font", "40").unwrap();

    let positions = PositionStore::new(durable.clone(), MemoryStore::shared());
    let port = Box::new(StoreSettingsPort::new(durable.clone()));
    let mut surface = ReadingSurface::new(
        NOVEL,
        SurfaceContext::continuous("novel"),
        positions,
        port,
    );
    assert_eq!(surface.index().len(), 3);
    assert_eq!(surface.settings().font_size, 26);

    let mut page = Page {
        offset: 0,
        headings: BTreeMap::from([(0, 0), (1, 100), (2, 200)]),
    };
    let mut frames = FrameQueue::new();
    let mut events = Events::default();
    surface.mount(&mut page, &mut frames, &mut events);
    assert_eq!(events.observed, vec![0, 1, 2]);

    let mut ticks = 0;
    while frames.has_pending() {
        for token in frames.drain() {
            surface.on_frame(token, &mut page, &mut frames);
        }
        ticks += 1;
    }
    assert_eq!(ticks, 10);
    assert_eq!(surface.restore_state(), RestoreState::Settled);
    assert_eq!(page.offset, 120);

    events.queued.push(VisibilityEvent {
        heading: 1,
        intersecting: true,
        top: 2,
    });
    surface.poll_observer(&mut events);
    assert_eq!(surface.active_label(), "第02章 风雪");

    surface.apply(Action::NextChapter, &mut page, &mut frames);
    assert_eq!(page.offset, 200);
    for token in frames.drain() {
        surface.on_frame(token, &mut page, &mut frames);
    }
    assert_eq!(
        durable.borrow().get("nr_pos_novel").unwrap().as_deref(),
        Some("200")
    );

    page.offset = 210;
    assert_eq!(
        surface.commit(FlushTrigger::Unload, &page, &mut frames),
        CommitOutcome::Saved
    );
    assert_eq!(
        durable.borrow().get("nr_pos_novel").unwrap().as_deref(),
        Some("210")
    );
    assert_eq!(
        durable.borrow().get("nr_current_novel").unwrap().as_deref(),
        Some("novel")
    );

    surface.unmount(&mut frames, &mut events);
    assert!(events.observed.is_empty());
    assert!(!frames.has_pending());
}
