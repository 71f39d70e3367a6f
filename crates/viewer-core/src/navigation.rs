use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Single,
    /// Two pages side by side: spread `k` shows pages `2k + 1` and `2k + 2`.
    Spread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// Visible pages changed immediately.
    Moved,
    /// A flip animation started; pages change when it completes.
    FlipStarted,
    /// A flip is already in flight.
    Ignored,
    AtBoundary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Flip {
    target_page: u32,
    ends_at: Instant,
}

/// Page navigation for one book with the spread flip lock.
#[derive(Debug, Clone)]
pub struct Navigator {
    page_count: u32,
    mode: DisplayMode,
    /// Current page in single mode; left page of the spread in spread mode.
    page: u32,
    flip: Option<Flip>,
    flip_duration: Duration,
}

impl Navigator {
    pub fn new(page_count: u32, mode: DisplayMode, flip_duration: Duration) -> Self {
        let mut navigator = Self { page_count, mode, page: 1, flip: None, flip_duration };
        navigator.page = navigator.anchor(1);
        navigator
    }

    /// Deep-link entry: jumps straight to `page` without animating.
    pub fn open_at(&mut self, page: u32) {
        self.flip = None;
        self.page = self.anchor(page);
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn current_page(&self) -> u32 {
        self.page
    }

    pub fn spread_index(&self) -> u32 {
        (self.page.max(1) - 1) / 2
    }

    pub fn is_flipping(&self) -> bool {
        self.flip.is_some()
    }

    pub fn visible_pages(&self) -> Vec<u32> {
        if self.page_count == 0 {
            return Vec::new();
        }

        match self.mode {
            DisplayMode::Single => vec![self.page],
            DisplayMode::Spread => {
                let left = self.spread_index() * 2 + 1;
                (left..=left + 1).filter(|page| *page <= self.page_count).collect()
            }
        }
    }

    pub fn next(&mut self, now: Instant) -> NavOutcome {
        self.tick(now);
        let step = self.step();
        self.go_to(self.page.saturating_add(step), now)
    }

    pub fn previous(&mut self, now: Instant) -> NavOutcome {
        self.tick(now);
        if self.page <= 1 {
            return if self.is_flipping() { NavOutcome::Ignored } else { NavOutcome::AtBoundary };
        }
        let step = self.step();
        self.go_to(self.page.saturating_sub(step).max(1), now)
    }

    pub fn go_to(&mut self, page: u32, now: Instant) -> NavOutcome {
        self.tick(now);
        if self.is_flipping() {
            return NavOutcome::Ignored;
        }

        if page == 0 || page > self.page_count {
            return NavOutcome::AtBoundary;
        }
        let target = self.anchor(page);
        if target == self.page {
            return NavOutcome::AtBoundary;
        }

        match self.mode {
            DisplayMode::Single => {
                self.page = target;
                NavOutcome::Moved
            }
            DisplayMode::Spread => {
                self.flip = Some(Flip { target_page: target, ends_at: now + self.flip_duration });
                NavOutcome::FlipStarted
            }
        }
    }

    /// Completes a flip whose animation has run its course. Returns true when
    /// the visible pages changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.flip {
            Some(flip) if now >= flip.ends_at => {
                self.flip = None;
                self.page = flip.target_page;
                true
            }
            _ => false,
        }
    }

    /// Switches display mode, landing any flip in flight first. The current
    /// page stays visible.
    pub fn set_mode(&mut self, mode: DisplayMode) -> bool {
        if let Some(flip) = self.flip.take() {
            self.page = flip.target_page;
        }
        if self.mode == mode {
            return false;
        }

        self.mode = mode;
        self.page = self.anchor(self.page);
        true
    }

    fn step(&self) -> u32 {
        match self.mode {
            DisplayMode::Single => 1,
            DisplayMode::Spread => 2,
        }
    }

    fn anchor(&self, page: u32) -> u32 {
        let page = page.clamp(1, self.page_count.max(1));
        match self.mode {
            DisplayMode::Single => page,
            DisplayMode::Spread => (page - 1) / 2 * 2 + 1,
        }
    }
}
