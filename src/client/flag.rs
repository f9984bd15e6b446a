//! Operation flags
//!
//! An [`OperationFlag`] is the authoritative gate for one kind of user
//! operation. It is set while a request is in flight and cleared when the
//! [`FlagGuard`] returned by [`OperationFlag::try_acquire`] is dropped, so
//! every exit path (success, handled failure, early return, panic) releases
//! it.

use std::sync::atomic::{AtomicBool, Ordering};

/// Mutual-exclusion guard for a single operation kind
#[derive(Debug)]
pub struct OperationFlag {
    name: &'static str,
    active: AtomicBool,
}

impl OperationFlag {
    /// Create a cleared flag
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            active: AtomicBool::new(false),
        }
    }

    /// Name used in log messages
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether an operation currently holds the flag
    pub fn is_set(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Set the flag if it is clear
    ///
    /// Returns `None` when another operation already holds it. A second
    /// caller is rejected, never queued.
    ///
    /// # Examples
    ///
    /// ```
    /// use ragbridge::client::OperationFlag;
    ///
    /// let flag = OperationFlag::new("sending");
    /// let guard = flag.try_acquire().unwrap();
    /// assert!(flag.is_set());
    /// assert!(flag.try_acquire().is_none());
    /// drop(guard);
    /// assert!(!flag.is_set());
    /// ```
    pub fn try_acquire(&self) -> Option<FlagGuard<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlagGuard { flag: self })
    }
}

/// Holds an [`OperationFlag`] set until dropped
#[derive(Debug)]
#[must_use = "the flag is cleared as soon as the guard is dropped"]
pub struct FlagGuard<'a> {
    flag: &'a OperationFlag,
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.active.store(false, Ordering::Release);
        tracing::trace!("Released {} flag", self.flag.name);
    }
}
