//! # Ring Buffer
//!
//! Fixed-capacity FIFO history for telemetry samples.

use std::collections::VecDeque;

/// A bounded FIFO buffer.
///
/// Storage for `capacity` elements is reserved up front. Pushing into a
/// full buffer evicts the oldest element, so the length never exceeds
/// the capacity no matter how many samples arrive.
///
/// # Thread Safety
///
/// This buffer is NOT thread-safe. Each one lives inside an entity
/// profile (or model) that owns its own lock.
///
/// # Example
///
/// ```rust
/// use warden_core::RingBuffer;
///
/// let mut ring: RingBuffer<u32> = RingBuffer::new(2);
/// ring.push(1);
/// ring.push(2);
/// assert_eq!(ring.push(3), Some(1)); // oldest evicted
/// assert_eq!(ring.to_vec(), vec![2, 3]);
/// ```
#[derive(Clone, Debug)]
pub struct RingBuffer<T> {
    /// The stored elements, oldest at the front.
    items: VecDeque<T>,
    /// Maximum number of elements.
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Creates a new ring buffer with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the fixed capacity.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of stored elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Appends an element, evicting and returning the oldest when full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(value);
        evicted
    }

    /// Returns the newest element.
    #[inline]
    #[must_use]
    pub fn newest(&self) -> Option<&T> {
        self.items.back()
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// Iterates over the newest `count` elements, oldest first.
    pub fn last_n(&self, count: usize) -> impl Iterator<Item = &T> {
        let skip = self.items.len().saturating_sub(count);
        self.items.iter().skip(skip)
    }

    /// Removes every element. Capacity is kept.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copies the contents, oldest to newest.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
