use crate::logging;
use eyre::Result;

/// Retry budget for a continuous (whole-novel) reading surface.
pub const CONTINUOUS_RESTORE_ATTEMPTS: u32 = 10;
/// Retry budget for a single-chapter reading surface.
pub const CHAPTER_RESTORE_ATTEMPTS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(u64);

/// Capability for asking the host to run work on its next rendered frame.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameToken;
    fn cancel_frame(&mut self, token: FrameToken);
}

/// Frame requests collected between two draws of the event loop.
#[derive(Debug, Default)]
pub struct FrameQueue {
    next: u64,
    pending: Vec<FrameToken>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Take every request made so far. Requests made while the returned
    /// tokens are being handled belong to the following frame.
    pub fn drain(&mut self) -> Vec<FrameToken> {
        std::mem::take(&mut self.pending)
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&mut self) -> FrameToken {
        self.next += 1;
        let token = FrameToken(self.next);
        self.pending.push(token);
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        self.pending.retain(|t| *t != token);
    }
}

/// The scrollable rendering surface as seen by the core.
pub trait Viewport {
    fn scroll_offset(&self) -> u32;
    fn scroll_to(&mut self, offset: u32);
    /// Absolute top offset of heading `index`, if it has been laid out.
    fn heading_offset(&self, index: usize) -> Option<u32>;
    /// Turn off any scroll restoration the host performs on its own.
    fn disable_scroll_restoration(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreState {
    Pending,
    Restoring { remaining: u32 },
    Settled,
}

/// Re-applies a saved offset over several frames so late layout shifts
/// cannot undo it.
#[derive(Debug)]
pub struct ScrollRestorer {
    state: RestoreState,
    budget: u32,
    target: u32,
    frame: Option<FrameToken>,
}

impl ScrollRestorer {
    pub fn new(budget: u32) -> Self {
        Self {
            state: RestoreState::Pending,
            budget,
            target: 0,
            frame: None,
        }
    }

    pub fn state(&self) -> RestoreState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        self.state == RestoreState::Settled
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    /// First restoration after a surface mounts.
    pub fn mount(
        &mut self,
        target: u32,
        viewport: &mut dyn Viewport,
        scheduler: &mut dyn FrameScheduler,
    ) {
        if let Err(err) = viewport.disable_scroll_restoration() {
            logging::debug(format!("could not disable host scroll restoration: {}", err));
        }
        self.begin(target, scheduler);
    }

    /// Drop any restoration in flight and start over towards `target`.
    pub fn restart(&mut self, target: u32, scheduler: &mut dyn FrameScheduler) {
        self.cancel(scheduler);
        self.begin(target, scheduler);
    }

    fn begin(&mut self, target: u32, scheduler: &mut dyn FrameScheduler) {
        self.target = target;
        if self.budget == 0 {
            self.state = RestoreState::Settled;
            return;
        }
        logging::debug(format!(
            "restoring offset {} over {} frames",
            target, self.budget
        ));
        self.state = RestoreState::Restoring {
            remaining: self.budget,
        };
        self.frame = Some(scheduler.request_frame());
    }

    /// Handle a delivered frame. Returns false when `token` was not requested
    /// by this restorer.
    pub fn on_frame(
        &mut self,
        token: FrameToken,
        viewport: &mut dyn Viewport,
        scheduler: &mut dyn FrameScheduler,
    ) -> bool {
        if self.frame != Some(token) {
            return false;
        }
        self.frame = None;

        if let RestoreState::Restoring { remaining } = self.state {
            viewport.scroll_to(self.target);
            let remaining = remaining.saturating_sub(1);
            if remaining > 0 {
                self.state = RestoreState::Restoring { remaining };
                self.frame = Some(scheduler.request_frame());
            } else {
                logging::debug(format!("restore settled at {}", self.target));
                self.state = RestoreState::Settled;
            }
        }
        true
    }

    pub fn cancel(&mut self, scheduler: &mut dyn FrameScheduler) {
        if let Some(token) = self.frame.take() {
            scheduler.cancel_frame(token);
        }
        if matches!(self.state, RestoreState::Restoring { .. }) {
            self.state = RestoreState::Pending;
        }
    }
}
