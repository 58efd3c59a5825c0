// Copyright 2026 Vidgrab Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-flight request bookkeeping for "network idle" detection.
//!
//! The page is idle once no more than `max_inflight` requests have been
//! outstanding for a full stability window.

use std::collections::HashSet;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct IdleTracker {
    pending: HashSet<String>,
    max_inflight: usize,
    quiet_since: Option<Instant>,
}

impl IdleTracker {
    pub fn new(max_inflight: usize, now: Instant) -> Self {
        Self {
            pending: HashSet::new(),
            max_inflight,
            quiet_since: Some(now),
        }
    }

    pub fn request_started(&mut self, id: &str, now: Instant) {
        self.pending.insert(id.to_string());
        self.refresh(now);
    }

    /// Record a finished or failed request. Unknown ids are ignored.
    pub fn request_finished(&mut self, id: &str, now: Instant) {
        if self.pending.remove(id) {
            self.refresh(now);
        }
    }

    /// Restart the stability window, e.g. when a navigation begins.
    pub fn reset(&mut self, now: Instant) {
        self.pending.clear();
        self.quiet_since = Some(now);
    }

    pub fn inflight(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self, now: Instant, window: Duration) -> bool {
        match self.quiet_since {
            Some(since) => now.saturating_duration_since(since) >= window,
            None => false,
        }
    }

    fn refresh(&mut self, now: Instant) {
        if self.pending.len() > self.max_inflight {
            self.quiet_since = None;
        } else if self.quiet_since.is_none() {
            self.quiet_since = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    #[test]
    fn test_idle_after_window_with_no_requests() {
        let t0 = Instant::now();
        let tracker = IdleTracker::new(0, t0);
        assert!(!tracker.is_idle(t0 + Duration::from_millis(100), WINDOW));
        assert!(tracker.is_idle(t0 + WINDOW, WINDOW));
    }

    #[test]
    fn test_pending_request_blocks_idle() {
        let t0 = Instant::now();
        let mut tracker = IdleTracker::new(0, t0);
        tracker.request_started("1", t0);
        assert!(!tracker.is_idle(t0 + Duration::from_secs(10), WINDOW));

        let t1 = t0 + Duration::from_secs(10);
        tracker.request_finished("1", t1);
        assert!(!tracker.is_idle(t1 + Duration::from_millis(499), WINDOW));
        assert!(tracker.is_idle(t1 + WINDOW, WINDOW));
    }

    #[test]
    fn test_tolerates_inflight_up_to_limit() {
        let t0 = Instant::now();
        let mut tracker = IdleTracker::new(2, t0);
        tracker.request_started("a", t0);
        tracker.request_started("b", t0);
        assert!(tracker.is_idle(t0 + WINDOW, WINDOW));
        tracker.request_started("c", t0 + WINDOW);
        assert!(!tracker.is_idle(t0 + WINDOW * 4, WINDOW));
        assert_eq!(tracker.inflight(), 3);
    }

    #[test]
    fn test_unknown_finish_does_not_restart_window() {
        let t0 = Instant::now();
        let mut tracker = IdleTracker::new(0, t0);
        tracker.request_finished("ghost", t0 + Duration::from_millis(400));
        assert!(tracker.is_idle(t0 + WINDOW, WINDOW));
    }

    #[test]
    fn test_reset_clears_pending() {
        let t0 = Instant::now();
        let mut tracker = IdleTracker::new(0, t0);
        tracker.request_started("x", t0);
        let t1 = t0 + Duration::from_secs(1);
        tracker.reset(t1);
        assert_eq!(tracker.inflight(), 0);
        assert!(tracker.is_idle(t1 + WINDOW, WINDOW));
    }
}
