//! Wait-free single-producer / single-consumer ring buffer.
//!
//! Bridges the network ingest thread (producer) and the strategy thread
//! (consumer) without mutexes: a mutex wakeup costs microseconds, a
//! release/acquire pair costs nanoseconds. Capacity is a power of two so the
//! index wrap is a bitmask, and one slot is sacrificed to tell full from
//! empty without a separate counter.

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Returned by [`SpscQueue::push`] when the queue is full. Carries the item
/// back so the producer can decide what to do with it (the market-data
/// producer drops it and counts the drop).
pub struct Full<T>(pub T);

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Full(..)")
    }
}

impl<T> fmt::Display for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("queue full")
    }
}

impl<T> std::error::Error for Full<T> {}

/// Fixed-capacity SPSC ring buffer.
///
/// Contract: exactly one thread calls [`push`](Self::push) and exactly one
/// thread calls [`pop`](Self::pop). Both are wait-free and allocation-free.
/// The producer's slot write happens-before the consumer's slot read via the
/// release store / acquire load pair on `tail`; the symmetric pair on `head`
/// keeps the producer from overwriting a slot still being read.
pub struct SpscQueue<T> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    /// Consumer-owned index. Padded so the producer's tail writes never
    /// invalidate the consumer's cache line.
    head: CachePadded<AtomicUsize>,
    /// Producer-owned index.
    tail: CachePadded<AtomicUsize>,
}

unsafe impl<T: Send> Send for SpscQueue<T> {}
unsafe impl<T: Send> Sync for SpscQueue<T> {}

impl<T> SpscQueue<T> {
    /// Create a queue with `capacity` slots. `capacity` must be a power of
    /// two; usable capacity is `capacity - 1`.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two() && capacity > 1,
            "SPSC queue capacity must be a power of two > 1"
        );
        let buffer = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        Self {
            buffer,
            mask: capacity - 1,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Producer side. Returns the item back inside [`Full`] when the queue
    /// has no free slot.
    #[inline]
    pub fn push(&self, item: T) -> Result<(), Full<T>> {
        // Only the producer writes tail, so a relaxed self-read is enough.
        let tail = self.tail.load(Ordering::Relaxed);
        let next_tail = (tail + 1) & self.mask;

        // Acquire pairs with the consumer's release on head: once we observe
        // a freed slot we also observe that the consumer is done reading it.
        if next_tail == self.head.load(Ordering::Acquire) {
            return Err(Full(item));
        }

        // Slot write must precede the tail publication.
        unsafe {
            (*self.buffer[tail].get()).write(item);
        }
        self.tail.store(next_tail, Ordering::Release);
        Ok(())
    }

    /// Consumer side. `None` when the queue is empty.
    #[inline]
    pub fn pop(&self) -> Option<T> {
        let head = self.head.load(Ordering::Relaxed);

        // Acquire pairs with the producer's release on tail: the slot write
        // is visible before the index that publishes it.
        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }

        let item = unsafe { (*self.buffer[head].get()).assume_init_read() };

        // Release: we are done with the slot before handing it back.
        self.head.store((head + 1) & self.mask, Ordering::Release);
        Some(item)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.load(Ordering::Acquire) == self.tail.load(Ordering::Acquire)
    }

    /// Number of items currently queued. Approximate under concurrency.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        tail.wrapping_sub(head) & self.mask
    }

    /// Usable capacity (`slots - 1`).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask
    }
}

impl<T> Drop for SpscQueue<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}
