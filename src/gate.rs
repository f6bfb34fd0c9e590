// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! In-flight guard for user-triggered operations
//!
//! A screen action (submit, pick an image) must not start while the previous
//! one is still running, otherwise the older completion can overwrite the
//! newer result. Each service owns an [`InFlight`] flag; the guard returned
//! by [`InFlight::try_begin`] clears it when dropped, on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};

/// Busy flag for one kind of operation
#[derive(Debug, Default)]
pub struct InFlight {
    busy: AtomicBool,
}

/// Holds the flag until dropped
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    busy: &'a AtomicBool,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the flag, or `None` if an operation is already running
    pub fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard { busy: &self.busy })
    }

    /// Whether an operation is running (the screen's loading indicator)
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::AssertUnwindSafe;

    #[test]
    fn test_second_begin_is_refused_while_held() {
        let flag = InFlight::new();
        let guard = flag.try_begin();
        assert!(guard.is_some());
        assert!(flag.is_busy());
        assert!(flag.try_begin().is_none());

        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_begin().is_some());
    }

    #[test]
    fn test_released_on_early_return() {
        fn fails_halfway(flag: &InFlight) -> Result<(), &'static str> {
            let _guard = flag.try_begin().ok_or("busy")?;
            Err("collaborator failed")
        }

        let flag = InFlight::new();
        assert_eq!(fails_halfway(&flag), Err("collaborator failed"));
        assert!(!flag.is_busy());
    }

    #[test]
    fn test_released_when_operation_panics() {
        let flag = InFlight::new();
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = flag.try_begin().unwrap();
            panic!("collaborator panicked");
        }));

        assert!(result.is_err());
        assert!(!flag.is_busy());
        assert!(flag.try_begin().is_some());
    }
}
