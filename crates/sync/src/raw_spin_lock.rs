//! 自旋锁实现
//!
//! 基于原子操作实现自旋锁机制。互斥本身由 [`lock_api::RawMutex`] 实现提供，
//! 在其之上叠加两种获取策略：
//!
//! - [`RawSpinLock::lock`]：结合 [`IntrGuard`] 禁用本地中断后自旋；
//! - [`RawSpinLock::lock_from_irq`]：仅自旋，供已处于中断上下文的代码使用。

use crate::intr_guard::IntrGuard;
use core::{
    hint,
    sync::atomic::{AtomicBool, Ordering},
};
use lock_api::{GuardNoSend, RawMutex};

/// 自旋锁结构体，提供互斥访问临界区的能力。
///
/// 不可重入 (即不能嵌套调用 RawSpinLock::lock())。
///
/// # 示例
/// ```ignore
/// let lock = RawSpinLock::new();
/// {
///   let guard = lock.lock(); // 获取锁，禁用中断
///   // 临界区代码
/// } // 离开作用域，自动释放锁并恢复中断状态
/// ```
#[derive(Debug)]
pub struct RawSpinLock {
    lock: AtomicBool,
}

impl RawSpinLock {
    /// 创建一个新的 RawSpinLock 实例。
    pub const fn new() -> Self {
        RawSpinLock {
            lock: AtomicBool::new(false),
        }
    }

    /// 获取自旋锁，并返回一个 RAII 保护器。
    ///
    /// 先在当前 CPU 禁用本地中断，再自旋等待锁。
    /// 释放时先释放锁标志，再恢复中断状态。
    pub fn lock(&self) -> RawSpinLockGuard<'_> {
        let guard = IntrGuard::new();
        <Self as RawMutex>::lock(self);
        RawSpinLockGuard {
            lock: self,
            intr_guard: Some(guard),
        }
    }

    /// 在中断上下文中获取自旋锁。
    ///
    /// 中断上下文不可睡眠，本地中断也已被屏蔽，因此这里只做自旋，
    /// 不保存也不恢复中断状态。等待时间受持锁方临界区长度约束。
    pub fn lock_from_irq(&self) -> RawSpinLockGuard<'_> {
        <Self as RawMutex>::lock(self);
        RawSpinLockGuard {
            lock: self,
            intr_guard: None,
        }
    }

    /// 尝试获取自旋锁，如果成功则返回 RAII 保护器，否则返回 None。
    ///
    /// 如果获取失败，会立即恢复中断状态（通过 Drop IntrGuard）。
    pub fn try_lock(&self) -> Option<RawSpinLockGuard<'_>> {
        let guard = IntrGuard::new();

        if <Self as RawMutex>::try_lock(self) {
            Some(RawSpinLockGuard {
                lock: self,
                intr_guard: Some(guard),
            })
        } else {
            None
        }
    }

    /// 检查锁是否被占用
    pub fn is_locked(&self) -> bool {
        self.lock.load(Ordering::Relaxed)
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: 锁标志通过 Acquire/Release 的 CAS 与 store 保证互斥与可见性
unsafe impl RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawSpinLock::new();

    type GuardMarker = GuardNoSend;

    fn lock(&self) {
        // TTAS：失败后只读自旋，减少缓存行争用
        while !<Self as RawMutex>::try_lock(self) {
            while self.lock.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
    }

    fn try_lock(&self) -> bool {
        self.lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.lock.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        RawSpinLock::is_locked(self)
    }
}

/// 自动释放自旋锁和恢复中断状态的 RAII 结构体
pub struct RawSpinLockGuard<'a> {
    lock: &'a RawSpinLock,
    /// 普通上下文获取时持有的中断保护器；中断上下文获取时为 None
    intr_guard: Option<IntrGuard>,
}

impl RawSpinLockGuard<'_> {
    /// 该保护器是否由中断上下文路径获取
    pub fn is_irq_context(&self) -> bool {
        self.intr_guard.is_none()
    }
}

impl Drop for RawSpinLockGuard<'_> {
    /// 退出作用域时自动执行，顺序如下：
    /// 1. 释放自旋锁标志。
    /// 2. IntrGuard 被 Drop，恢复中断状态。
    fn drop(&mut self) {
        // SAFETY: 保护器存在即说明锁由本保护器持有
        unsafe { <RawSpinLock as RawMutex>::unlock(self.lock) };
    }
}

#[cfg(test)]
mod tests {
    extern crate test_support;

    use super::*;
    use test_support::mock::arch::MOCK_ARCH_OPS;

    #[test]
    fn test_lock_disables_local_interrupts() {
        let lock = RawSpinLock::new();
        {
            let guard = lock.lock();
            assert!(lock.is_locked());
            assert!(!guard.is_irq_context());
            assert!(!MOCK_ARCH_OPS.local_irq_enabled());
        }
        assert!(!lock.is_locked());
        assert!(MOCK_ARCH_OPS.local_irq_enabled());
    }

    #[test]
    fn test_lock_from_irq_leaves_interrupt_state() {
        let lock = RawSpinLock::new();
        {
            let guard = lock.lock_from_irq();
            assert!(guard.is_irq_context());
            assert!(lock.is_locked());
            assert!(MOCK_ARCH_OPS.local_irq_enabled());
        }
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_try_lock_excludes_both_paths() {
        let lock = RawSpinLock::new();
        let held = lock.lock_from_irq();
        assert!(lock.try_lock().is_none());
        // 获取失败后中断状态已恢复
        assert!(MOCK_ARCH_OPS.local_irq_enabled());
        drop(held);

        let held = lock.lock();
        assert!(!<RawSpinLock as RawMutex>::try_lock(&lock));
        drop(held);
        assert!(lock.try_lock().is_some());
    }
}
