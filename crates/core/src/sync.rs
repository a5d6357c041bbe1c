// VMScope - Live VM Debug State Monitor
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use parking_lot::{RwLock, RwLockWriteGuard};
use std::thread;

/// Write-locks two distinct locks without risking a circular wait against a
/// thread locking the same pair in the opposite order.
///
/// Blocks on one lock and only tries the other; on contention everything is
/// released and the roles flip. Guards come back in argument order.
pub(crate) fn write_both<'a, T>(
    a: &'a RwLock<T>,
    b: &'a RwLock<T>,
) -> (RwLockWriteGuard<'a, T>, RwLockWriteGuard<'a, T>) {
    debug_assert!(!std::ptr::eq(a, b), "write_both on a single lock");
    loop {
        let first = a.write();
        if let Some(second) = b.try_write() {
            return (first, second);
        }
        drop(first);
        thread::yield_now();

        let second = b.write();
        if let Some(first) = a.try_write() {
            return (first, second);
        }
        drop(second);
        thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_guards_in_argument_order() {
        let a = RwLock::new(1);
        let b = RwLock::new(2);
        let (ga, gb) = write_both(&a, &b);
        assert_eq!((*ga, *gb), (1, 2));
    }

    #[test]
    fn test_opposite_orders_do_not_deadlock() {
        let a = Arc::new(RwLock::new(0u64));
        let b = Arc::new(RwLock::new(0u64));

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let (a, b) = (Arc::clone(&a), Arc::clone(&b));
                thread::spawn(move || {
                    for _ in 0..5_000 {
                        let (mut x, mut y) = if i % 2 == 0 {
                            write_both(&*a, &*b)
                        } else {
                            write_both(&*b, &*a)
                        };
                        *x += 1;
                        *y += 1;
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(*a.read(), 20_000);
        assert_eq!(*b.read(), 20_000);
    }
}
