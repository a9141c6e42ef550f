//! Sliding-window cursor over a step producer.
//!
//! [`StepNavigator`] buffers at most `size + 1` values pulled from any
//! iterator. The extra slot is a lookahead that only tells whether another
//! value exists; it is never shown. Moving forward past the visible window
//! pulls one value and evicts the oldest, and evicted values are gone for
//! good. [`WindowSize::Unbounded`] keeps every value instead.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// How much history a navigator keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSize {
    /// Keep at most this many visible values; 0 behaves like 1.
    Bounded(usize),
    /// Never evict.
    Unbounded,
}

impl WindowSize {
    fn capacity(self) -> Option<usize> {
        match self {
            WindowSize::Bounded(size) => Some(size.max(1)),
            WindowSize::Unbounded => None,
        }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        WindowSize::Bounded(64)
    }
}

#[derive(Debug)]
pub struct StepNavigator<I: Iterator> {
    source: I,
    window: VecDeque<I::Item>,
    cursor: usize,
    exhausted: bool,
    capacity: Option<usize>,
    usable: usize,
}

impl<I: Iterator> StepNavigator<I> {
    /// Pre-fills the window and places the cursor on the first value.
    pub fn new(source: I, size: WindowSize) -> Self {
        let capacity = size.capacity();
        let mut navigator = StepNavigator {
            source,
            window: VecDeque::new(),
            cursor: 0,
            exhausted: false,
            capacity,
            usable: 0,
        };

        let prefill = capacity.unwrap_or(1) + 1;
        while navigator.window.len() < prefill && navigator.pull() {}
        let available = navigator.window.len();
        navigator.usable = available.min(capacity.unwrap_or(available).max(1));
        navigator
    }

    /// Appends one upstream value; marks the source exhausted on `None`.
    fn pull(&mut self) -> bool {
        match self.source.next() {
            Some(value) => {
                self.window.push_back(value);
                true
            }
            None => {
                self.exhausted = true;
                false
            }
        }
    }

    /// Number of buffered values the caller may see.
    fn visible_len(&self) -> usize {
        if self.exhausted {
            self.window.len()
        } else {
            self.window.len().saturating_sub(1)
        }
    }

    /// The value under the cursor, or `None` past the end.
    pub fn current(&self) -> Option<&I::Item> {
        if self.cursor < self.visible_len() {
            self.window.get(self.cursor)
        } else {
            None
        }
    }

    /// Moves forward one value.
    ///
    /// From the last value of an exhausted source the cursor moves onto a
    /// sentinel slot where [`current`](Self::current) is `None`.
    pub fn next(&mut self) {
        let visible = self.visible_len();
        if self.cursor + 1 < visible {
            self.cursor += 1;
            return;
        }
        if self.cursor >= visible {
            return;
        }
        if self.exhausted {
            self.cursor = visible;
            return;
        }

        // the lookahead becomes current either way
        self.cursor += 1;
        if self.pull() {
            if let Some(capacity) = self.capacity {
                if self.window.len() > capacity + 1 {
                    self.window.pop_front();
                    self.cursor -= 1;
                }
            }
        }
    }

    /// Moves back one value, never before the oldest buffered one.
    pub fn previous(&mut self) {
        let last = self.visible_len();
        if self.cursor > last {
            self.cursor = last;
        }
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn has_next(&self) -> bool {
        !self.exhausted || self.cursor + 1 < self.window.len()
    }

    pub fn has_previous(&self) -> bool {
        self.cursor > 0
    }

    /// Advances until the last value is current.
    pub fn step_to_end(&mut self) {
        while self.has_next() {
            self.next();
        }
    }

    pub fn usable_window_size(&self) -> usize {
        match self.capacity {
            Some(_) => self.usable,
            None => self.visible_len(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nav(count: u32, size: WindowSize) -> StepNavigator<std::ops::RangeInclusive<u32>> {
        StepNavigator::new(1..=count, size)
    }

    #[test]
    fn window_of_three_over_ten() {
        let mut nav = nav(10, WindowSize::Bounded(3));
        assert_eq!(nav.usable_window_size(), 3);
        assert_eq!(nav.current(), Some(&1));
        for _ in 0..9 {
            nav.next();
        }
        assert_eq!(nav.current(), Some(&10));
        assert!(!nav.has_next());
        for _ in 0..3 {
            nav.previous();
        }
        assert_eq!(nav.current(), Some(&7));
        assert!(!nav.has_previous());
        nav.previous();
        assert_eq!(nav.current(), Some(&7));
    }

    #[test]
    fn short_source_is_exhausted_up_front() {
        let mut nav = nav(2, WindowSize::Bounded(5));
        assert!(nav.is_exhausted());
        assert_eq!(nav.usable_window_size(), 2);
        nav.next();
        assert_eq!(nav.current(), Some(&2));
        assert!(!nav.has_next());
        nav.next();
        assert_eq!(nav.current(), None);
        nav.next();
        nav.previous();
        assert_eq!(nav.current(), Some(&2));
    }

    #[test]
    fn exact_fit_discovers_the_end_lazily() {
        // 1 visible + 1 lookahead, then nothing
        let mut nav = nav(2, WindowSize::Bounded(1));
        assert!(!nav.is_exhausted());
        assert!(nav.has_next());
        nav.next();
        assert_eq!(nav.current(), Some(&2));
        assert!(nav.is_exhausted());
        assert!(!nav.has_next());
        nav.previous();
        assert_eq!(nav.current(), Some(&1));
    }

    #[test]
    fn zero_window_behaves_like_one() {
        let mut nav = nav(4, WindowSize::Bounded(0));
        assert_eq!(nav.usable_window_size(), 1);
        nav.next();
        nav.next();
        assert_eq!(nav.current(), Some(&3));
        nav.previous();
        assert_eq!(nav.current(), Some(&3));
    }

    #[test]
    fn empty_source() {
        let mut nav = nav(0, WindowSize::Bounded(3));
        assert_eq!(nav.current(), None);
        assert!(!nav.has_next());
        assert!(!nav.has_previous());
        nav.next();
        nav.previous();
        assert_eq!(nav.current(), None);
    }

    #[test]
    fn unbounded_keeps_everything() {
        let mut nav = nav(50, WindowSize::Unbounded);
        nav.step_to_end();
        assert_eq!(nav.current(), Some(&50));
        assert_eq!(nav.usable_window_size(), 50);
        while nav.has_previous() {
            nav.previous();
        }
        assert_eq!(nav.current(), Some(&1));
    }
}
