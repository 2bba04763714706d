//! 中断线管理
//!
//! [`IrqManager`] 维护中断号到处理函数的映射，宿主内核的中断入口调用
//! [`IrqManager::handle_irq`] 完成派发。每条中断线只允许一个处理函数独占，
//! 不支持共享中断。

use alloc::{collections::btree_map::BTreeMap, sync::Arc};
use bitflags::bitflags;
use lazy_static::lazy_static;
use sync::SpinLock;

use crate::error::DeviceError;
use crate::ops::irq_ops;

bitflags! {
    /// 中断请求标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct IrqFlags: u32 {
        /// 与其它设备共享中断线
        const SHARED = 0x0000_0080;
    }
}

/// 中断处理函数的返回值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// 中断不属于此设备或未被处理
    None,
    /// 中断已被此设备处理
    Handled,
}

/// 中断处理函数
pub trait IrqHandler: Send + Sync {
    /// 在中断上下文中执行，不可睡眠
    fn handle(&self, irq: u32) -> IrqReturn;
}

/// 中断管理器
pub struct IrqManager {
    handlers: SpinLock<BTreeMap<u32, Arc<dyn IrqHandler>>>,
}

impl IrqManager {
    /// 创建空的中断管理器
    pub const fn new() -> Self {
        Self {
            handlers: SpinLock::new(BTreeMap::new()),
        }
    }

    /// 为中断线注册处理函数，并在中断控制器上启用该中断线
    ///
    /// # 错误
    /// - 请求共享中断：[`DeviceError::InvalidArgument`]
    /// - 中断线已被占用：[`DeviceError::Busy`]
    pub fn request_irq(
        &self,
        irq: u32,
        flags: IrqFlags,
        handler: Arc<dyn IrqHandler>,
    ) -> Result<(), DeviceError> {
        if flags.contains(IrqFlags::SHARED) {
            return Err(DeviceError::InvalidArgument);
        }
        {
            let mut handlers = self.handlers.lock();
            if handlers.contains_key(&irq) {
                return Err(DeviceError::Busy);
            }
            handlers.insert(irq, handler);
        }
        irq_ops().enable_irq(irq);
        Ok(())
    }

    /// 在中断控制器上禁用中断线并注销处理函数
    ///
    /// 返回后新的派发不再找到该处理函数；但在移除之前已经取到处理函数的派发
    /// 仍可能在返回后执行完毕。处理函数需要自行与注销方同步。
    pub fn free_irq(&self, irq: u32) {
        irq_ops().disable_irq(irq);
        if self.handlers.lock().remove(&irq).is_none() {
            log::warn!("free_irq: irq {} was not requested", irq);
        }
    }

    /// 中断入口：派发给中断线上注册的处理函数
    ///
    /// 未注册的中断线返回 [`IrqReturn::None`]。
    pub fn handle_irq(&self, irq: u32) -> IrqReturn {
        let handler = self.handlers.lock_from_irq().get(&irq).cloned();
        match handler {
            Some(h) => h.handle(irq),
            None => IrqReturn::None,
        }
    }

    /// 中断线是否已被占用
    pub fn is_requested(&self, irq: u32) -> bool {
        self.handlers.lock().contains_key(&irq)
    }
}

impl Default for IrqManager {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    /// 全局中断管理器
    pub static ref IRQ_MANAGER: IrqManager = IrqManager::new();
}

#[cfg(test)]
mod tests {
    extern crate test_support;

    use super::*;
    use crate::test_util::init_sync_arch_ops;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use test_support::mock::device::MOCK_IRQ_OPS;

    struct CountingHandler(AtomicUsize);

    impl IrqHandler for CountingHandler {
        fn handle(&self, _irq: u32) -> IrqReturn {
            self.0.fetch_add(1, Ordering::SeqCst);
            IrqReturn::Handled
        }
    }

    #[test]
    fn test_request_and_dispatch() {
        init_sync_arch_ops();
        let mgr = IrqManager::new();
        let h = Arc::new(CountingHandler(AtomicUsize::new(0)));
        mgr.request_irq(101, IrqFlags::empty(), h.clone()).unwrap();
        assert!(MOCK_IRQ_OPS.is_enabled(101));
        assert!(mgr.is_requested(101));

        assert_eq!(mgr.handle_irq(101), IrqReturn::Handled);
        assert_eq!(mgr.handle_irq(102), IrqReturn::None);
        assert_eq!(h.0.load(Ordering::SeqCst), 1);

        mgr.free_irq(101);
        assert!(!MOCK_IRQ_OPS.is_enabled(101));
        assert_eq!(mgr.handle_irq(101), IrqReturn::None);
    }

    #[test]
    fn test_request_is_exclusive() {
        init_sync_arch_ops();
        let mgr = IrqManager::new();
        let h = Arc::new(CountingHandler(AtomicUsize::new(0)));
        mgr.request_irq(103, IrqFlags::empty(), h.clone()).unwrap();
        assert_eq!(
            mgr.request_irq(103, IrqFlags::empty(), h),
            Err(DeviceError::Busy)
        );
        mgr.free_irq(103);
    }

    #[test]
    fn test_shared_request_rejected() {
        init_sync_arch_ops();
        let mgr = IrqManager::new();
        let h = Arc::new(CountingHandler(AtomicUsize::new(0)));
        assert_eq!(
            mgr.request_irq(104, IrqFlags::SHARED, h),
            Err(DeviceError::InvalidArgument)
        );
        assert!(!mgr.is_requested(104));
        assert!(!MOCK_IRQ_OPS.is_enabled(104));
    }
}
