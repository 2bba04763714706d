//! UIO 设备登记与使用者句柄

use alloc::{string::String, sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicU32, Ordering};
use device::{DeviceError, IRQ_MANAGER, IrqHandler, IrqReturn};
use sync::SpinLock;

use crate::MAX_UIO_MAPS;
use crate::info::{IrqLine, UioHandler, UioInfo, UioMem};

/// 设备与其中断派发、使用者句柄共享的状态
///
/// 设备注销时 `handler` 被取走，此后的中断与控制请求都不再到达驱动。
struct UioShared {
    name: String,
    version: String,
    maps: Vec<UioMem>,
    irq: IrqLine,
    handler: SpinLock<Option<Arc<dyn UioHandler>>>,
    event: AtomicU32,
}

impl IrqHandler for UioShared {
    fn handle(&self, _irq: u32) -> IrqReturn {
        let guard = self.handler.lock_from_irq();
        let Some(handler) = guard.as_ref() else {
            return IrqReturn::None;
        };
        let ret = handler.handle();
        if ret == IrqReturn::Handled {
            self.event.fetch_add(1, Ordering::AcqRel);
        }
        ret
    }
}

/// 已登记的 UIO 设备
///
/// 持有对中断线的独占登记；被丢弃时在中断控制器上禁用中断线并注销处理函数。
pub struct UioDevice {
    shared: Arc<UioShared>,
}

/// 登记 UIO 设备
///
/// 中断线为 [`IrqLine::Irq`] 时在 [`IRQ_MANAGER`] 上独占该中断线。
///
/// # 错误
/// - 缺少名称或版本、内存映射过多、有中断线但没有处理函数：[`DeviceError::InvalidArgument`]
/// - 中断线尚未确定：[`DeviceError::InvalidArgument`]
/// - 中断线已被占用或请求共享中断：见 [`device::IrqManager::request_irq`]
pub fn register_device(info: UioInfo) -> Result<UioDevice, DeviceError> {
    let (Some(name), Some(version)) = (info.name, info.version) else {
        return Err(DeviceError::InvalidArgument);
    };
    if name.is_empty() || version.is_empty() || info.mem.len() > MAX_UIO_MAPS {
        return Err(DeviceError::InvalidArgument);
    }
    if info.irq == IrqLine::Unset {
        return Err(DeviceError::InvalidArgument);
    }
    if matches!(info.irq, IrqLine::Irq(_)) && info.handler.is_none() {
        return Err(DeviceError::InvalidArgument);
    }

    let shared = Arc::new(UioShared {
        name,
        version,
        maps: info.mem,
        irq: info.irq,
        handler: SpinLock::new(info.handler),
        event: AtomicU32::new(0),
    });

    if let IrqLine::Irq(irq) = shared.irq {
        IRQ_MANAGER.request_irq(irq, info.irq_flags, shared.clone())?;
    }

    log::debug!("uio: registered {} ({})", shared.name, shared.version);
    Ok(UioDevice { shared })
}

impl UioDevice {
    /// 设备名
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// 驱动版本
    pub fn version(&self) -> &str {
        &self.shared.version
    }

    /// 中断线
    pub fn irq(&self) -> IrqLine {
        self.shared.irq
    }

    /// 暴露给使用者的内存映射
    pub fn maps(&self) -> &[UioMem] {
        &self.shared.maps
    }

    /// 已处理的中断事件数
    pub fn event_count(&self) -> u32 {
        self.shared.event.load(Ordering::Acquire)
    }

    /// 为使用者打开一个句柄
    pub fn open(&self) -> UioListener {
        UioListener {
            shared: self.shared.clone(),
            event_count: self.event_count(),
        }
    }
}

impl Drop for UioDevice {
    fn drop(&mut self) {
        if let IrqLine::Irq(irq) = self.shared.irq {
            IRQ_MANAGER.free_irq(irq);
        }
        // 仍然打开的句柄此后只能得到 NoDevice
        let handler = self.shared.handler.lock().take();
        drop(handler);
        log::debug!("uio: unregistered {}", self.shared.name);
    }
}

/// 使用者句柄
///
/// 每个句柄记录自己上次看到的事件计数。
pub struct UioListener {
    shared: Arc<UioShared>,
    event_count: u32,
}

impl UioListener {
    /// 读取事件计数
    ///
    /// 自上次读取以来有新的中断事件时返回新的计数，否则返回 `Ok(None)`。
    /// 设备没有中断线时返回 [`DeviceError::IoError`]，设备已注销时返回
    /// [`DeviceError::NoDevice`]。
    pub fn read(&mut self) -> Result<Option<u32>, DeviceError> {
        if !matches!(self.shared.irq, IrqLine::Irq(_)) {
            return Err(DeviceError::IoError);
        }
        if self.shared.handler.lock().is_none() {
            return Err(DeviceError::NoDevice);
        }
        let count = self.shared.event.load(Ordering::Acquire);
        if count == self.event_count {
            return Ok(None);
        }
        self.event_count = count;
        Ok(Some(count))
    }

    /// 请求启用（非零）或屏蔽（零）中断
    ///
    /// 设备没有中断线时返回 [`DeviceError::IoError`]，设备已注销时返回
    /// [`DeviceError::NoDevice`]。
    pub fn write(&self, irq_on: i32) -> Result<(), DeviceError> {
        if !matches!(self.shared.irq, IrqLine::Irq(_)) {
            log::warn!("uio: {}: irq control without an interrupt line", self.shared.name);
            return Err(DeviceError::IoError);
        }
        let guard = self.shared.handler.lock();
        let Some(handler) = guard.as_ref() else {
            return Err(DeviceError::NoDevice);
        };
        handler.irqcontrol(irq_on != 0)
    }
}

#[cfg(test)]
mod tests {
    extern crate test_support;

    use super::*;
    use crate::test_util::init_test_ops;
    use core::sync::atomic::AtomicBool;
    use device::IrqFlags;
    use test_support::mock::device::MOCK_IRQ_OPS;

    /// 记录最后一次中断控制请求的处理函数
    struct Recorder {
        enabled: AtomicBool,
        handled: AtomicU32,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                enabled: AtomicBool::new(false),
                handled: AtomicU32::new(0),
            })
        }
    }

    impl UioHandler for Recorder {
        fn handle(&self) -> IrqReturn {
            self.handled.fetch_add(1, Ordering::SeqCst);
            self.enabled.store(false, Ordering::SeqCst);
            IrqReturn::Handled
        }

        fn irqcontrol(&self, irq_on: bool) -> Result<(), DeviceError> {
            self.enabled.store(irq_on, Ordering::SeqCst);
            Ok(())
        }
    }

    fn info_with_irq(irq: u32, handler: Arc<Recorder>) -> UioInfo {
        let mut info = UioInfo::new("test-uio", "0.1");
        info.irq = IrqLine::Irq(irq);
        info.handler = Some(handler);
        info
    }

    #[test]
    fn test_register_claims_and_releases_line() {
        init_test_ops();
        let dev = register_device(info_with_irq(201, Recorder::new())).unwrap();
        assert!(IRQ_MANAGER.is_requested(201));
        assert!(MOCK_IRQ_OPS.is_enabled(201));
        assert_eq!(dev.name(), "test-uio");
        assert_eq!(dev.version(), "0.1");

        drop(dev);
        assert!(!IRQ_MANAGER.is_requested(201));
        assert!(!MOCK_IRQ_OPS.is_enabled(201));
    }

    #[test]
    fn test_interrupt_events_reach_listener() {
        init_test_ops();
        let rec = Recorder::new();
        let dev = register_device(info_with_irq(202, rec.clone())).unwrap();
        let mut listener = dev.open();

        assert_eq!(listener.read(), Ok(None));
        listener.write(1).unwrap();
        assert!(rec.enabled.load(Ordering::SeqCst));

        assert_eq!(IRQ_MANAGER.handle_irq(202), IrqReturn::Handled);
        assert!(!rec.enabled.load(Ordering::SeqCst));
        assert_eq!(listener.read(), Ok(Some(1)));
        assert_eq!(listener.read(), Ok(None));

        IRQ_MANAGER.handle_irq(202);
        IRQ_MANAGER.handle_irq(202);
        assert_eq!(dev.event_count(), 3);
        assert_eq!(listener.read(), Ok(Some(3)));

        // 新句柄从当前计数开始
        let mut late = dev.open();
        assert_eq!(late.read(), Ok(None));
    }

    #[test]
    fn test_line_is_exclusive() {
        init_test_ops();
        let _dev = register_device(info_with_irq(203, Recorder::new())).unwrap();
        assert_eq!(
            register_device(info_with_irq(203, Recorder::new())).err(),
            Some(DeviceError::Busy)
        );
    }

    #[test]
    fn test_shared_line_rejected() {
        init_test_ops();
        let mut info = info_with_irq(204, Recorder::new());
        info.irq_flags = IrqFlags::SHARED;
        assert_eq!(
            register_device(info).err(),
            Some(DeviceError::InvalidArgument)
        );
        assert!(!IRQ_MANAGER.is_requested(204));
    }

    #[test]
    fn test_incomplete_info_rejected() {
        init_test_ops();
        let mut info = info_with_irq(205, Recorder::new());
        info.version = None;
        assert_eq!(
            register_device(info).err(),
            Some(DeviceError::InvalidArgument)
        );

        let mut info = UioInfo::new("x", "y");
        info.irq = IrqLine::Irq(205);
        assert_eq!(
            register_device(info).err(),
            Some(DeviceError::InvalidArgument)
        );

        let info = UioInfo::new("x", "y");
        assert_eq!(
            register_device(info).err(),
            Some(DeviceError::InvalidArgument)
        );
        assert!(!IRQ_MANAGER.is_requested(205));
    }

    #[test]
    fn test_device_without_irq() {
        init_test_ops();
        let mut info = UioInfo::new("noirq", "0.1");
        info.irq = IrqLine::None;
        let dev = register_device(info).unwrap();
        let mut listener = dev.open();
        assert_eq!(listener.read(), Err(DeviceError::IoError));
        assert_eq!(listener.write(1), Err(DeviceError::IoError));
    }

    #[test]
    fn test_listener_outliving_device() {
        init_test_ops();
        let rec = Recorder::new();
        let dev = register_device(info_with_irq(206, rec.clone())).unwrap();
        let mut listener = dev.open();
        drop(dev);

        assert_eq!(listener.write(1), Err(DeviceError::NoDevice));
        assert!(!rec.enabled.load(Ordering::SeqCst));
        assert_eq!(listener.read(), Err(DeviceError::NoDevice));
        // 驱动的处理函数已被释放
        assert_eq!(Arc::strong_count(&rec), 1);
    }
}
