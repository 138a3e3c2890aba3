//! One-shot publication of a value from one core to another.
//!
//! The writer stores the value and then releases a ready flag; a reader that
//! acquires the flag sees the whole value. After publication the value is
//! never written again, so shared references are handed out freely.

use core::cell::UnsafeCell;
use core::future::poll_fn;
use core::mem::MaybeUninit;
use core::task::Poll;

use portable_atomic::{AtomicU8, Ordering};

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const READY: u8 = 2;

/// Error type for [`Publication::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishError {
    /// A value was already published.
    AlreadyPublished,
}

/// A write-once cell with acquire/release visibility.
///
/// # Example
///
/// ```
/// use adapter_core::Publication;
///
/// static READY: Publication<u32> = Publication::new();
///
/// assert!(READY.try_get().is_none());
/// READY.publish(7).unwrap();
/// assert_eq!(READY.try_get(), Some(&7));
/// assert!(READY.publish(8).is_err());
/// ```
pub struct Publication<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

// SAFETY: the value is written exactly once, by the thread that won the
// EMPTY -> WRITING transition, before READY is released. Readers only touch
// it after acquiring READY and only through shared references.
unsafe impl<T: Send + Sync> Sync for Publication<T> {}

impl<T> Publication<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Store `value` and make it visible to readers.
    ///
    /// Fails without touching the stored value if anything was published
    /// before (or is being published concurrently).
    pub fn publish(&self, value: T) -> Result<(), PublishError> {
        if self
            .state
            .compare_exchange(EMPTY, WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(PublishError::AlreadyPublished);
        }
        // SAFETY: winning the exchange gives exclusive write access; no reader
        // looks at the cell before READY.
        unsafe { (*self.value.get()).write(value) };
        self.state.store(READY, Ordering::Release);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn is_published(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    /// The published value, if any.
    #[must_use]
    pub fn try_get(&self) -> Option<&T> {
        if self.is_published() {
            // SAFETY: READY was acquired, so the write is complete and final.
            Some(unsafe { (*self.value.get()).assume_init_ref() })
        } else {
            None
        }
    }

    /// Wait for publication, yielding to the executor between checks.
    pub async fn wait(&self) -> &T {
        poll_fn(|cx| match self.try_get() {
            Some(value) => Poll::Ready(value),
            None => {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
        })
        .await
    }

    /// Spin until published. For contexts without an executor.
    pub fn wait_blocking(&self) -> &T {
        loop {
            if let Some(value) = self.try_get() {
                return value;
            }
            core::hint::spin_loop();
        }
    }
}

impl<T> Default for Publication<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Publication<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == READY {
            // SAFETY: READY means initialized, and `&mut self` rules out readers.
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::testing::{block_on, poll_once};
    use std::boxed::Box;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_publish_once() {
        let cell = Publication::new();
        assert!(!cell.is_published());
        assert_eq!(cell.publish(1u32), Ok(()));
        assert_eq!(cell.publish(2), Err(PublishError::AlreadyPublished));
        assert_eq!(cell.try_get(), Some(&1));
    }

    #[test]
    fn test_wait_pending_until_published() {
        let cell = Publication::new();
        {
            let mut wait = core::pin::pin!(cell.wait());
            assert!(poll_once(wait.as_mut()).is_none());
        }
        let _ = cell.publish(5u8);
        assert_eq!(block_on(cell.wait()), &5);
    }

    #[test]
    fn test_cross_thread_publication() {
        let cell: &'static Publication<[u32; 64]> = Box::leak(Box::new(Publication::new()));
        let writer = thread::spawn(move || {
            let mut value = [0u32; 64];
            for (i, v) in value.iter_mut().enumerate() {
                *v = i as u32 * 3;
            }
            cell.publish(value)
        });

        let seen = cell.wait_blocking();
        assert!(seen.iter().enumerate().all(|(i, v)| *v == i as u32 * 3));
        assert_eq!(writer.join().unwrap(), Ok(()));
    }

    #[test]
    fn test_drop_releases_value() {
        let value = Arc::new(());
        {
            let cell = Publication::new();
            let _ = cell.publish(value.clone());
            assert_eq!(Arc::strong_count(&value), 2);
        }
        assert_eq!(Arc::strong_count(&value), 1);
    }
}
