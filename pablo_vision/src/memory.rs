// THEORY:
// Every buffer a frame needs (classification masks, the morphology scratch plane,
// the visited map and the flood-fill stack) is leased from a `HeapBudget`. The
// sensor module this core targets has one small frame buffer and very little heap
// headroom, so allocation is allowed to fail and the failure has to be observable.
//
// A lease is RAII: dropping a `Buffer` hands its bytes back to the budget. That is
// what guarantees "no partial allocation survives an early return" without any
// explicit cleanup code on the error paths.

use crate::error::VisionError;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
struct BudgetState {
    limit: Option<usize>,
    refuse_lease: Option<usize>,
    leases: AtomicUsize,
    in_use: AtomicUsize,
    peak: AtomicUsize,
}

/// A shareable ceiling on per-frame working memory.
#[derive(Debug, Clone)]
pub struct HeapBudget {
    state: Arc<BudgetState>,
}

impl Default for HeapBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl HeapBudget {
    /// Only the allocator itself can refuse a request.
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn with_limit(bytes: usize) -> Self {
        Self::new(Some(bytes))
    }

    pub fn new(limit: Option<usize>) -> Self {
        Self::build(limit, None)
    }

    /// An unlimited budget that refuses exactly one lease: the `n`th request
    /// (counting from 0) made since creation. Used to exercise failure paths that
    /// a byte limit cannot isolate.
    pub fn refusing_lease(n: usize) -> Self {
        Self::build(None, Some(n))
    }

    fn build(limit: Option<usize>, refuse_lease: Option<usize>) -> Self {
        Self {
            state: Arc::new(BudgetState {
                limit,
                refuse_lease,
                leases: AtomicUsize::new(0),
                in_use: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.state.limit
    }

    /// Bytes currently leased out.
    pub fn in_use(&self) -> usize {
        self.state.in_use.load(Ordering::Acquire)
    }

    /// High-water mark since creation or the last `reset_peak`.
    pub fn peak(&self) -> usize {
        self.state.peak.load(Ordering::Acquire)
    }

    pub fn reset_peak(&self) {
        self.state.peak.store(self.in_use(), Ordering::Release);
    }

    /// Leases `len` elements, all set to `fill`.
    pub fn filled<T: Clone>(
        &self,
        what: &'static str,
        len: usize,
        fill: T,
    ) -> Result<Buffer<T>, VisionError> {
        let mut buffer = self.with_capacity(what, len)?;
        buffer.data.resize(len, fill);
        Ok(buffer)
    }

    /// Leases an empty buffer that can hold `capacity` elements without growing.
    pub fn with_capacity<T>(
        &self,
        what: &'static str,
        capacity: usize,
    ) -> Result<Buffer<T>, VisionError> {
        let bytes = capacity
            .checked_mul(mem::size_of::<T>())
            .ok_or(VisionError::Allocation { what, bytes: usize::MAX })?;
        let lease = self.reserve(what, bytes)?;

        let mut data = Vec::new();
        // The lease is dropped with this error, returning the reservation.
        data.try_reserve_exact(capacity)
            .map_err(|_| VisionError::Allocation { what, bytes })?;

        Ok(Buffer {
            data,
            cap: capacity,
            _lease: lease,
        })
    }

    /// Number of lease requests made so far, granted or not.
    pub fn lease_requests(&self) -> usize {
        self.state.leases.load(Ordering::Acquire)
    }

    fn reserve(&self, what: &'static str, bytes: usize) -> Result<Lease, VisionError> {
        let index = self.state.leases.fetch_add(1, Ordering::AcqRel);
        if self.state.refuse_lease == Some(index) {
            return Err(VisionError::Allocation { what, bytes });
        }
        let previous = self.state.in_use.fetch_add(bytes, Ordering::AcqRel);
        let total = previous.saturating_add(bytes);
        if let Some(limit) = self.state.limit {
            if total > limit {
                self.state.in_use.fetch_sub(bytes, Ordering::AcqRel);
                return Err(VisionError::Allocation { what, bytes });
            }
        }
        self.state.peak.fetch_max(total, Ordering::AcqRel);
        Ok(Lease {
            state: Arc::clone(&self.state),
            bytes,
        })
    }
}

#[derive(Debug)]
struct Lease {
    state: Arc<BudgetState>,
    bytes: usize,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.state.in_use.fetch_sub(self.bytes, Ordering::AcqRel);
    }
}

/// A `Vec` whose bytes are accounted against a `HeapBudget` until dropped.
#[derive(Debug)]
pub struct Buffer<T> {
    data: Vec<T>,
    cap: usize,
    _lease: Lease,
}

impl<T> Buffer<T> {
    /// Number of elements the lease was sized for.
    pub fn leased_len(&self) -> usize {
        self.cap
    }

    /// Pushes only while the leased capacity has room; never reallocates.
    pub fn push_within_capacity(&mut self, value: T) -> bool {
        if self.data.len() < self.cap {
            self.data.push(value);
            true
        } else {
            false
        }
    }
}

impl<T> Deref for Buffer<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.data
    }
}

impl<T> DerefMut for Buffer<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.data
    }
}
