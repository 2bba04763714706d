//! 自旋锁封装
//!
//! 提供对数据的互斥访问的自旋锁结构体。

use core::cell::UnsafeCell;

use crate::raw_spin_lock::{RawSpinLock, RawSpinLockGuard};

/// 提供对数据的互斥访问的自旋锁结构体。
///
/// 内部包含一个 RawSpinLock 和一个 UnsafeCell 用于存储数据。
///
/// # 示例
/// ```ignore
/// let lock = SpinLock::new(0);
/// {
///     let mut guard = lock.lock(); // 获取锁
///     *guard += 1; // 访问和修改数据
/// } // 离开作用域，自动释放锁
/// ```
///
/// # 注意
/// SpinLock 不是可重入的。当持有锁时，尝试再次获取锁将导致死锁。
/// 与中断处理函数共享的数据，普通上下文必须使用 [`SpinLock::lock`]，
/// 中断处理函数使用 [`SpinLock::lock_from_irq`]，持锁期间应避免长时间运行的操作。
#[derive(Debug)]
pub struct SpinLock<T> {
    raw_lock: RawSpinLock,
    data: UnsafeCell<T>,
}

impl<T> SpinLock<T> {
    /// 创建一个新的 SpinLock 实例，初始化内部数据。
    pub const fn new(data: T) -> Self {
        SpinLock {
            raw_lock: RawSpinLock::new(),
            data: UnsafeCell::new(data),
        }
    }

    /// 获取自旋锁（禁用本地中断），并返回一个 RAII 保护器。
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let _raw_guard = self.raw_lock.lock();
        SpinLockGuard {
            _raw_guard,
            // SAFETY: 持有锁期间独占访问
            data: unsafe { &mut *self.data.get() },
        }
    }

    /// 在中断上下文中获取自旋锁，并返回一个 RAII 保护器。
    pub fn lock_from_irq(&self) -> SpinLockGuard<'_, T> {
        let _raw_guard = self.raw_lock.lock_from_irq();
        SpinLockGuard {
            _raw_guard,
            // SAFETY: 持有锁期间独占访问
            data: unsafe { &mut *self.data.get() },
        }
    }

    /// 尝试获取自旋锁，如果成功则返回 RAII 保护器，否则返回 None。
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.raw_lock.try_lock().map(|_raw_guard| SpinLockGuard {
            _raw_guard,
            // SAFETY: 持有锁期间独占访问
            data: unsafe { &mut *self.data.get() },
        })
    }

    /// 检查锁是否被占用 (仅用于调试/测试)
    pub fn is_locked(&self) -> bool {
        self.raw_lock.is_locked()
    }

    /// 消耗锁，取回内部数据
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

/// SpinLock 的 RAII 保护器，提供对锁定数据的访问。
///
/// 当保护器离开作用域时，自动释放锁。
pub struct SpinLockGuard<'a, T> {
    _raw_guard: RawSpinLockGuard<'a>,
    data: &'a mut T,
}

impl<T> core::ops::Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

impl<T> core::ops::DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data
    }
}

// Safety: SpinLock 可以在线程间安全共享，
// 因为它通过 RawSpinLock 保证了对数据的互斥访问。
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::{sync::Arc, thread, vec::Vec};

    #[test]
    fn test_spin_lock_basic() {
        let lock = SpinLock::new(0u32);
        *lock.lock() += 1;
        *lock.lock_from_irq() += 1;
        assert_eq!(*lock.lock(), 2);
        assert!(!lock.is_locked());
        assert_eq!(lock.into_inner(), 2);
    }

    #[test]
    fn test_spin_lock_mixed_paths_mutual_exclusion() {
        // 两条获取路径交替递增，非原子的读-改-写若被交错就会丢失更新
        let lock = Arc::new(SpinLock::new(0usize));
        let mut handles = Vec::new();
        for i in 0..4 {
            let lock = lock.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..10_000 {
                    let mut guard = if i % 2 == 0 {
                        lock.lock()
                    } else {
                        lock.lock_from_irq()
                    };
                    let v = *guard;
                    core::hint::spin_loop();
                    *guard = v + 1;
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*lock.lock(), 40_000);
    }
}
