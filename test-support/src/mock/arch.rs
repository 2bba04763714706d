//! 架构相关操作的 Mock 实现
//!
//! 本地中断使能状态按线程保存：每个测试线程相当于一个独立的 CPU。

use std::cell::Cell;

std::thread_local! {
    static LOCAL_IRQ_ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// 中断使能位
const SIE: usize = 0x2;

/// Mock 架构操作
pub struct MockArchOps;

impl MockArchOps {
    pub const fn new() -> Self {
        Self
    }

    /// 读取并禁用当前线程的本地中断
    ///
    /// # Safety
    /// 仅用于测试环境。
    pub unsafe fn read_and_disable_interrupts(&self) -> usize {
        let was = LOCAL_IRQ_ENABLED.with(|s| s.replace(false));
        if was { SIE } else { 0 }
    }

    /// 恢复当前线程的本地中断状态
    ///
    /// # Safety
    /// flags 必须来自 [`MockArchOps::read_and_disable_interrupts`]。
    pub unsafe fn restore_interrupts(&self, flags: usize) {
        LOCAL_IRQ_ENABLED.with(|s| s.set(flags & SIE != 0));
    }

    pub fn intr_enable_bit(&self) -> usize {
        SIE
    }

    /// 当前线程（模拟 CPU）的本地中断是否开启
    pub fn local_irq_enabled(&self) -> bool {
        LOCAL_IRQ_ENABLED.with(|s| s.get())
    }
}

impl Default for MockArchOps {
    fn default() -> Self {
        Self::new()
    }
}

/// 全局 Mock 实例
pub static MOCK_ARCH_OPS: MockArchOps = MockArchOps::new();
