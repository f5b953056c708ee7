//! Striped approximate counter for live entries.

use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;
use once_cell::sync::Lazy;

/// Fixed number of stripes: the number of logical processors.
static NUM_STRIPES: Lazy<usize> = Lazy::new(|| {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
});

/// Round-robin stripe assignment for threads that have not picked one yet.
fn next_stripe() -> usize {
    static INDEX: Lazy<AtomicUsize> = Lazy::new(AtomicUsize::default);

    let mut i0 = INDEX.load(Ordering::Acquire);
    loop {
        let i1 = (i0 + 1) % *NUM_STRIPES;
        match INDEX.compare_exchange_weak(i0, i1, Ordering::Acquire, Ordering::Relaxed) {
            Ok(_) => return i0,
            Err(i2) => i0 = i2,
        }
    }
}

/// A counter split across cache-line-padded stripes so concurrent
/// publications and deletions do not contend on a single cell. Sums are
/// approximate while writers are active.
pub(crate) struct LiveCounter {
    stripes: Box<[CachePadded<AtomicIsize>]>,
}

impl LiveCounter {
    pub(crate) fn new() -> Self {
        let stripes = std::iter::repeat_with(|| CachePadded::new(AtomicIsize::new(0)))
            .take(*NUM_STRIPES)
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { stripes }
    }

    /// The stripe for the current thread.
    fn stripe(&self) -> &AtomicIsize {
        thread_local! { static MY_STRIPE: usize = next_stripe(); }
        MY_STRIPE.with(|i| &self.stripes[*i])
    }

    pub(crate) fn increment(&self) {
        self.stripe().fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decrement(&self) {
        self.stripe().fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn sub(&self, n: usize) {
        self.stripe().fetch_sub(n as isize, Ordering::Relaxed);
    }

    /// Sum of the stripes, clamped at zero: a decrement can be observed
    /// before the increment it pairs with landed on another stripe.
    pub(crate) fn sum(&self) -> usize {
        let n: isize = self
            .stripes
            .iter()
            .map(|stripe| stripe.load(Ordering::Relaxed))
            .sum();
        n.max(0) as usize
    }
}
