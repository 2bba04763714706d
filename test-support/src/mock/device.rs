//! 设备相关操作的 Mock 实现
//!
//! 注意：这里不直接依赖 `device` crate（避免循环依赖）。
//! `device` crate 在 `cfg(test)` 下为这些类型实现其 trait（例如 `IrqOps`），
//! 其它 crate 的测试通过本地新类型包装后实现。

use std::collections::BTreeSet;
use std::sync::Mutex;

/// Mock 的中断控制器操作
///
/// 记录当前在中断控制器上处于启用状态的中断线。
pub struct MockIrqOps {
    enabled: Mutex<BTreeSet<u32>>,
}

impl MockIrqOps {
    pub const fn new() -> Self {
        Self {
            enabled: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn enable_irq(&self, irq: u32) {
        self.enabled.lock().unwrap().insert(irq);
    }

    pub fn disable_irq(&self, irq: u32) {
        self.enabled.lock().unwrap().remove(&irq);
    }

    /// 指定中断线是否处于启用状态
    pub fn is_enabled(&self, irq: u32) -> bool {
        self.enabled.lock().unwrap().contains(&irq)
    }
}

impl Default for MockIrqOps {
    fn default() -> Self {
        Self::new()
    }
}

/// 全局 Mock 实例
pub static MOCK_IRQ_OPS: MockIrqOps = MockIrqOps::new();
