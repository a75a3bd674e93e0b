use std::collections::VecDeque;

/// Bounded FIFO recording the highest occupancy it reached.
#[derive(Debug, Clone, Default)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
    peak: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            peak: 0,
        }
    }

    /// `false` and `item` dropped when the buffer is full.
    pub fn append(&mut self, item: T) -> bool {
        if self.is_full() {
            return false;
        }

        self.items.push_back(item);
        self.peak = self.peak.max(self.items.len());
        true
    }

    #[inline]
    pub fn remove(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn peak_count(&self) -> usize {
        self.peak
    }

    /// Restarts peak tracking from the current occupancy.
    #[inline]
    pub fn reset_peak(&mut self) {
        self.peak = self.items.len();
    }
}
