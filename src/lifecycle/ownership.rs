//! Shared ownership of long-lived objects.
//!
//! Config, logger and server are each held by more than one collaborator.
//! `Shared<T>` is a counted handle: `share` takes another reference,
//! `release` gives one back, and the value is dropped exactly once when the
//! last reference goes away. Releasing a handle consumes it, so a reference
//! cannot be released twice.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// What happened to the value when a reference was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Released {
    /// This was the last reference; the value has been dropped.
    Destroyed,
    /// Other references remain.
    Retained,
}

/// A reference-counted handle to `T`.
pub struct Shared<T> {
    inner: Arc<T>,
}

impl<T> Shared<T> {
    /// Wrap a value with an ownership count of 1.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }

    /// Take another reference, incrementing the count.
    pub fn share(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Give this reference back.
    ///
    /// Exactly one of the concurrent releases of the last references observes
    /// `Released::Destroyed`.
    pub fn release(self) -> Released {
        match Arc::into_inner(self.inner) {
            Some(value) => {
                drop(value);
                Released::Destroyed
            }
            None => Released::Retained,
        }
    }

    /// Current number of references.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Returns true if both handles refer to the same value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        self.share()
    }
}

impl<T> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("refs", &self.ref_count())
            .field("value", &*self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct DropSpy(Arc<AtomicUsize>);

    impl Drop for DropSpy {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn new_handle_has_one_reference() {
        let shared = Shared::new(5);
        assert_eq!(shared.ref_count(), 1);
        assert_eq!(*shared, 5);
    }

    #[test]
    fn share_then_release_restores_count() {
        let drops = Arc::new(AtomicUsize::new(0));
        let shared = Shared::new(DropSpy(drops.clone()));

        for _ in 0..4 {
            let extra = shared.share();
            assert_eq!(shared.ref_count(), 2);
            assert_eq!(extra.release(), Released::Retained);
        }

        assert_eq!(shared.ref_count(), 1);
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        assert_eq!(shared.release(), Released::Destroyed);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn last_release_from_any_holder_destroys() {
        let drops = Arc::new(AtomicUsize::new(0));
        let first = Shared::new(DropSpy(drops.clone()));
        let second = first.share();
        assert!(first.ptr_eq(&second));

        assert_eq!(first.release(), Released::Retained);
        assert_eq!(second.ref_count(), 1);
        assert_eq!(second.release(), Released::Destroyed);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_release_destroys_once() {
        let drops = Arc::new(AtomicUsize::new(0));
        let shared = Shared::new(DropSpy(drops.clone()));
        let handles: Vec<_> = (0..8).map(|_| shared.share()).collect();
        drop(shared);

        let threads: Vec<_> = handles
            .into_iter()
            .map(|handle| std::thread::spawn(move || handle.release()))
            .collect();
        let destroyed = threads
            .into_iter()
            .map(|thread| thread.join().unwrap())
            .filter(|released| *released == Released::Destroyed)
            .count();

        assert_eq!(destroyed, 1);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
