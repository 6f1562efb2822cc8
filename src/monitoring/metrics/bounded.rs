//! Bounded history for finished batches

use std::collections::VecDeque;

/// Finished batches retained for inspection
pub(super) const MAX_RECENT_BATCHES: usize = 100;

pub(super) trait BoundedPush<T> {
    fn push_bounded(&mut self, value: T, max_size: usize);
}

impl<T> BoundedPush<T> for VecDeque<T> {
    #[inline]
    fn push_bounded(&mut self, value: T, max_size: usize) {
        if max_size == 0 {
            return;
        }
        while self.len() >= max_size {
            self.pop_front();
        }
        self.push_back(value);
    }
}
