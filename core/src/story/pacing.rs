//! Time-window coalescing for high-frequency host events.
//!
//! Neither gate drops work: a value offered inside the window replaces the
//! pending one and is emitted when the window allows it.

use std::time::{Duration, Instant};

/// Emits at most once per window; the latest value offered during the window
/// is emitted by [`Throttle::flush`] once the window has passed.
#[derive(Debug)]
pub struct Throttle<T> {
    window: Duration,
    last_emit: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_emit: None,
            pending: None,
        }
    }

    pub fn offer(&mut self, now: Instant, value: T) -> Option<T> {
        if self.is_open(now) {
            self.last_emit = Some(now);
            self.pending = None;
            Some(value)
        } else {
            self.pending = Some(value);
            None
        }
    }

    /// Emits the trailing value if the window has passed.
    pub fn flush(&mut self, now: Instant) -> Option<T> {
        if self.pending.is_some() && self.is_open(now) {
            self.last_emit = Some(now);
            self.pending.take()
        } else {
            None
        }
    }

    fn is_open(&self, now: Instant) -> bool {
        self.last_emit
            .map(|last| now.saturating_duration_since(last) >= self.window)
            .unwrap_or(true)
    }
}

/// Emits the last offered value once no new value arrived for a full window.
#[derive(Debug)]
pub struct Debounce<T> {
    window: Duration,
    deadline: Option<Instant>,
    pending: Option<T>,
}

impl<T> Debounce<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            pending: None,
        }
    }

    pub fn offer(&mut self, now: Instant, value: T) {
        self.deadline = Some(now + self.window);
        self.pending = Some(value);
    }

    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(100);

    #[test]
    fn throttle_coalesces_burst_into_leading_and_trailing() {
        let start = Instant::now();
        let mut throttle = Throttle::new(WINDOW);
        assert_eq!(throttle.offer(start, 1), Some(1));
        assert_eq!(throttle.offer(start + Duration::from_millis(20), 2), None);
        assert_eq!(throttle.offer(start + Duration::from_millis(40), 3), None);
        assert_eq!(throttle.flush(start + Duration::from_millis(60)), None);
        assert_eq!(throttle.flush(start + Duration::from_millis(100)), Some(3));
        assert_eq!(throttle.flush(start + Duration::from_millis(300)), None);
    }

    #[test]
    fn debounce_waits_for_quiet_window() {
        let start = Instant::now();
        let mut debounce = Debounce::new(WINDOW);
        debounce.offer(start, "a");
        debounce.offer(start + Duration::from_millis(80), "b");
        assert_eq!(debounce.poll(start + Duration::from_millis(120)), None);
        assert_eq!(debounce.poll(start + Duration::from_millis(180)), Some("b"));
        assert_eq!(debounce.poll(start + Duration::from_millis(400)), None);
    }
}
