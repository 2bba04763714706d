//! 驱动测试
//!
//! 寄存器窗口由 [`MockRegisterFile`] 模拟，每个测试线程模拟一个 CPU。
//! 全局中断管理器在测试间共享，各测试使用互不相同的中断号。


use alloc::{format, string::String, sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicUsize, Ordering};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::Mutex;
use device::{DeviceError, IoMapper, IrqOps, OfNode, PlatformDevice, RegisterIo, Resource};
use sync::ArchOps;
use test_support::mock::arch::MOCK_ARCH_OPS;
use test_support::mock::device::MOCK_IRQ_OPS;
use test_support::mock::regs::MockRegisterFile;

use crate::config::{OF_COMPATIBLE, REG_BLOCK_LEN};

struct TestArchOps;

impl ArchOps for TestArchOps {
    unsafe fn read_and_disable_interrupts(&self) -> usize {
        unsafe { MOCK_ARCH_OPS.read_and_disable_interrupts() }
    }

    unsafe fn restore_interrupts(&self, flags: usize) {
        unsafe { MOCK_ARCH_OPS.restore_interrupts(flags) }
    }

    fn intr_enable_bit(&self) -> usize {
        MOCK_ARCH_OPS.intr_enable_bit()
    }
}

struct TestIrqOps;

impl IrqOps for TestIrqOps {
    fn enable_irq(&self, irq: u32) {
        MOCK_IRQ_OPS.enable_irq(irq);
    }

    fn disable_irq(&self, irq: u32) {
        MOCK_IRQ_OPS.disable_irq(irq);
    }
}

/// 保存所有日志记录，供断言日志内容
struct RecordingLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for RecordingLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        let line = format!("{}", record.args());
        self.records.lock().unwrap().push((record.level(), line));
    }

    fn flush(&self) {}
}

static LOGGER: RecordingLogger = RecordingLogger {
    records: Mutex::new(Vec::new()),
};

/// 指定级别中包含 `needle` 的日志条数
pub(crate) fn logged(level: Level, needle: &str) -> usize {
    LOGGER
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(l, line)| *l == level && line.contains(needle))
        .count()
}

static TEST_ARCH_OPS: TestArchOps = TestArchOps;
static TEST_IRQ_OPS: TestIrqOps = TestIrqOps;
// 0 = uninit, 1 = initializing, 2 = ready
static INIT: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn init_test_ops() {
    match INIT.compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
            // Safety: tests use a single global set of ops.
            unsafe {
                sync::register_arch_ops(&TEST_ARCH_OPS);
                device::register_irq_ops(&TEST_IRQ_OPS);
            }
            if log::set_logger(&LOGGER).is_ok() {
                log::set_max_level(LevelFilter::Trace);
            }
            INIT.store(2, Ordering::Release);
        }
        Err(_) => {
            while INIT.load(Ordering::Acquire) != 2 {
                core::hint::spin_loop();
            }
        }
    }
}

/// 映射到模拟寄存器文件的窗口，析构即解除映射
pub(crate) struct MockWindow(Arc<MockRegisterFile>);

impl MockWindow {
    pub(crate) fn map(file: &Arc<MockRegisterFile>) -> Arc<dyn RegisterIo> {
        file.map();
        Arc::new(MockWindow(file.clone()))
    }
}

impl RegisterIo for MockWindow {
    fn read32(&self, offset: usize) -> u32 {
        self.0.read32(offset)
    }

    fn write32(&self, value: u32, offset: usize) {
        self.0.write32(value, offset);
    }

    fn size(&self) -> usize {
        self.0.len()
    }
}

impl Drop for MockWindow {
    fn drop(&mut self) {
        self.0.unmap();
    }
}

/// 把内存资源映射到一个模拟寄存器文件
pub(crate) struct MockMapper {
    file: Arc<MockRegisterFile>,
    fail: Option<DeviceError>,
}

impl MockMapper {
    pub(crate) fn new(file: &Arc<MockRegisterFile>) -> Arc<Self> {
        Arc::new(Self {
            file: file.clone(),
            fail: None,
        })
    }

    pub(crate) fn failing(err: DeviceError) -> Arc<Self> {
        Arc::new(Self {
            file: Arc::new(MockRegisterFile::new(REG_BLOCK_LEN)),
            fail: Some(err),
        })
    }
}

impl IoMapper for MockMapper {
    fn ioremap(&self, _res: &Resource) -> Result<Arc<dyn RegisterIo>, DeviceError> {
        match self.fail {
            Some(err) => Err(err),
            None => Ok(MockWindow::map(&self.file)),
        }
    }
}

pub(crate) const REGS_BASE: usize = 0x43C0_0000;

/// 新的寄存器文件
pub(crate) fn register_file() -> Arc<MockRegisterFile> {
    Arc::new(MockRegisterFile::new(REG_BLOCK_LEN))
}

/// 设备树描述的 Kronus 设备，带一个寄存器窗口和一个中断结果
pub(crate) fn of_device(
    node: &str,
    file: &Arc<MockRegisterFile>,
    irq: Result<u32, DeviceError>,
) -> PlatformDevice {
    PlatformDevice::new(node, MockMapper::new(file))
        .with_of_node(OfNode::new(node).with_compatible(OF_COMPATIBLE))
        .with_resource(Resource::mem(REGS_BASE, 0x1_0000, "kronus-regs"))
        .with_irq(irq)
}
