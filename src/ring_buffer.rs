// src/ring_buffer.rs
//! Fixed-capacity circular buffer shared between one producer and one consumer.
//!
//! `head == tail` is ambiguous between empty and full. The buffer remembers
//! whether the last mutation was a write or a read to tell the two apart, so
//! every slot is usable. The capacity must be a power of two; this is checked
//! when the type is instantiated, not at runtime.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingBufferError {
    #[error("ring buffer is full")]
    Full,
    #[error("ring buffer is empty")]
    Empty,
}

/// Which end the non-consuming cursor starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterEnd {
    /// Oldest unread element.
    Tail,
    /// Newest element.
    Head,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastOperation {
    Read,
    Write,
}

#[derive(Clone)]
pub struct RingBuffer<T, const N: usize> {
    buffer: [T; N],
    head: usize,
    tail: usize,
    last_operation: LastOperation,
    // N marks the cursor as invalid
    cursor: usize,
}

impl<T: Copy + Default, const N: usize> RingBuffer<T, N> {
    const CAPACITY_IS_POWER_OF_TWO: () = assert!(
        N > 0 && N.is_power_of_two(),
        "ring buffer capacity must be a power of two"
    );

    const MASK: usize = N - 1;

    pub fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_IS_POWER_OF_TWO;
        Self {
            buffer: [T::default(); N],
            head: 0,
            tail: 0,
            last_operation: LastOperation::Read,
            cursor: N,
        }
    }

    /// Appends `item` at the head. A full buffer is left untouched.
    pub fn write(&mut self, item: T) -> Result<(), RingBufferError> {
        if self.is_full() {
            return Err(RingBufferError::Full);
        }
        self.buffer[self.head] = item;
        self.head = (self.head + 1) & Self::MASK;
        self.last_operation = LastOperation::Write;
        Ok(())
    }

    /// Pops the oldest element. An empty buffer is left untouched.
    pub fn read(&mut self) -> Result<T, RingBufferError> {
        if self.is_empty() {
            return Err(RingBufferError::Empty);
        }
        let item = self.buffer[self.tail];
        self.tail = (self.tail + 1) & Self::MASK;
        self.last_operation = LastOperation::Read;
        Ok(item)
    }

    /// Number of unread elements, `0..=N`.
    pub fn available(&self) -> usize {
        let count = self.head.wrapping_sub(self.tail) & Self::MASK;
        if count == 0 && self.last_operation == LastOperation::Write {
            N
        } else {
            count
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail && self.last_operation == LastOperation::Read
    }

    pub fn is_full(&self) -> bool {
        self.head == self.tail && self.last_operation == LastOperation::Write
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.last_operation = LastOperation::Read;
        self.cursor = N;
    }

    /// Unread element at `index`, counted from the oldest.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.available() {
            return None;
        }
        Some(&self.buffer[(self.tail + index) & Self::MASK])
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.available() {
            return None;
        }
        Some(&mut self.buffer[(self.tail + index) & Self::MASK])
    }

    /// Places the cursor on the oldest or newest element and returns it.
    pub fn start_iterator(&mut self, end: IterEnd) -> Option<&T> {
        if self.is_empty() {
            self.cursor = N;
            return None;
        }
        self.cursor = match end {
            IterEnd::Tail => self.tail,
            IterEnd::Head => self.head.wrapping_sub(1) & Self::MASK,
        };
        Some(&self.buffer[self.cursor])
    }

    /// Moves the cursor one element towards the head. Returns `None` and
    /// leaves the cursor in place once it sits on the newest element.
    pub fn next_element(&mut self) -> Option<&T> {
        if self.cursor == N {
            return None;
        }
        let next = (self.cursor + 1) & Self::MASK;
        if next == self.head {
            return None;
        }
        self.cursor = next;
        Some(&self.buffer[self.cursor])
    }

    /// Moves the cursor one element towards the tail. Returns `None` and
    /// leaves the cursor in place once it sits on the oldest element.
    pub fn previous_element(&mut self) -> Option<&T> {
        if self.cursor == N || self.cursor == self.tail {
            return None;
        }
        self.cursor = self.cursor.wrapping_sub(1) & Self::MASK;
        Some(&self.buffer[self.cursor])
    }

    /// Borrowing FIFO iterator over the unread elements.
    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter {
            ring: self,
            index: 0,
            remaining: self.available(),
        }
    }
}

impl<T: Copy + Default, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default + std::fmt::Debug, const N: usize> std::fmt::Debug for RingBuffer<T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &N)
            .field("available", &self.available())
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish()
    }
}

pub struct Iter<'a, T, const N: usize> {
    ring: &'a RingBuffer<T, N>,
    index: usize,
    remaining: usize,
}

impl<'a, T: Copy + Default, const N: usize> Iterator for Iter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = &self.ring.buffer[(self.ring.tail + self.index) & RingBuffer::<T, N>::MASK];
        self.index += 1;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Copy + Default, const N: usize> ExactSizeIterator for Iter<'_, T, N> {}

impl<'a, T: Copy + Default, const N: usize> IntoIterator for &'a RingBuffer<T, N> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
