//! Featured-movie slideshow state.
//!
//! [`Carousel`] is the pure index state machine. [`CarouselDriver`] wraps it
//! in a watch channel and owns the auto-advance timer.

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle, time::Instant};
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Carousel {
    len: usize,
    index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavKey {
    Left,
    Right,
}

impl NavKey {
    /// Maps DOM-style key names; anything else is not a carousel key.
    pub fn from_key_name(name: &str) -> Option<Self> {
        match name {
            "ArrowLeft" => Some(NavKey::Left),
            "ArrowRight" => Some(NavKey::Right),
            _ => None,
        }
    }
}

impl Carousel {
    pub fn new(len: usize) -> Self {
        Self { len, index: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Always 0 for an empty carousel.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.index)
    }

    pub fn next(&mut self) {
        if self.is_empty() {
            self.index = 0;
            return;
        }
        self.index = (self.index + 1) % self.len;
    }

    pub fn prev(&mut self) {
        if self.is_empty() {
            self.index = 0;
            return;
        }
        self.index = (self.index + self.len - 1) % self.len;
    }

    /// Jumps to `index`; out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        self.index = index;
        true
    }

    pub fn handle_key(&mut self, key: NavKey) {
        match key {
            NavKey::Left => self.prev(),
            NavKey::Right => self.next(),
        }
    }

    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        if self.index >= len {
            self.index = 0;
        }
    }
}

/// Carousel plus its auto-advance timer.
///
/// The timer only runs with two or more slides and when reduced motion is
/// off. Changing the slide count restarts it; dropping the driver stops it.
pub struct CarouselDriver {
    state: Arc<watch::Sender<Carousel>>,
    period: Duration,
    reduced_motion: bool,
    timer: Option<JoinHandle<()>>,
}

impl CarouselDriver {
    pub fn new(slides: usize, period: Duration, reduced_motion: bool) -> Self {
        let (tx, _rx) = watch::channel(Carousel::new(slides));
        let mut driver = Self { state: Arc::new(tx), period, reduced_motion, timer: None };
        driver.restart_timer();
        driver
    }

    pub fn carousel(&self) -> Carousel {
        *self.state.borrow()
    }

    pub fn index(&self) -> usize {
        self.state.borrow().index()
    }

    pub fn subscribe(&self) -> watch::Receiver<Carousel> {
        self.state.subscribe()
    }

    pub fn is_auto_advancing(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn next(&self) {
        self.state.send_modify(Carousel::next);
    }

    pub fn prev(&self) {
        self.state.send_modify(Carousel::prev);
    }

    pub fn select(&self, index: usize) -> bool {
        self.state.send_if_modified(|c| c.select(index))
    }

    pub fn handle_key(&self, key: NavKey) {
        self.state.send_modify(|c| c.handle_key(key));
    }

    pub fn set_slide_count(&mut self, slides: usize) {
        self.stop_timer();
        self.state.send_modify(|c| c.set_len(slides));
        self.restart_timer();
    }

    pub fn set_reduced_motion(&mut self, reduced_motion: bool) {
        if self.reduced_motion == reduced_motion {
            return;
        }
        self.reduced_motion = reduced_motion;
        self.stop_timer();
        self.restart_timer();
    }

    fn restart_timer(&mut self) {
        let slides = self.state.borrow().len();
        if self.reduced_motion || slides < 2 || self.period.is_zero() {
            debug!(slides, reduced_motion = self.reduced_motion, "carousel auto-advance off");
            return;
        }

        let state = self.state.clone();
        let period = self.period;
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                state.send_modify(Carousel::next);
            }
        }));
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for CarouselDriver {
    fn drop(&mut self) {
        self.stop_timer();
    }
}
