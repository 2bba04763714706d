//! MMIO 寄存器窗口
//!
//! [`RegisterIo`] 抽象一段已映射的寄存器窗口，[`IoMem`] 是基于裸指针和 volatile 访问的实现，
//! [`IoMapper`] 则负责把物理资源映射为可访问的窗口。窗口对象被丢弃即解除映射。

use alloc::sync::Arc;
use core::ptr::NonNull;

use crate::error::DeviceError;
use crate::resource::Resource;

/// 已映射的寄存器窗口
///
/// 所有访问都是完整的 32 位读写，不做读-改-写。
/// 访问越界属于编程错误，实现应当 panic。
pub trait RegisterIo: Send + Sync {
    /// 读取 `offset` 处的 32 位寄存器
    fn read32(&self, offset: usize) -> u32;

    /// 向 `offset` 处的 32 位寄存器写入 `value`
    fn write32(&self, value: u32, offset: usize);

    /// 窗口长度（字节）
    fn size(&self) -> usize;
}

/// 物理资源映射器
pub trait IoMapper: Send + Sync {
    /// 将内存资源映射为寄存器窗口
    fn ioremap(&self, res: &Resource) -> Result<Arc<dyn RegisterIo>, DeviceError>;
}

/// 基于裸指针的 MMIO 窗口
#[derive(Debug)]
pub struct IoMem {
    base: NonNull<u8>,
    size: usize,
}

// SAFETY: IoMem 只做 volatile 的 32 位访问，由调用方负责访问的同步
unsafe impl Send for IoMem {}
unsafe impl Sync for IoMem {}

impl IoMem {
    /// 从已映射的虚拟地址创建窗口
    ///
    /// # Safety
    /// `[base, base + size)` 必须是有效映射的设备内存，并在 IoMem 存活期间保持映射，
    /// 且 `base` 按 4 字节对齐。
    pub unsafe fn new(base: NonNull<u8>, size: usize) -> Self {
        Self { base, size }
    }

    /// 窗口基址
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    fn check(&self, offset: usize) {
        assert!(
            offset % 4 == 0 && offset + 4 <= self.size,
            "IoMem: access at {:#x} outside window of {:#x} bytes",
            offset,
            self.size
        );
    }
}

impl RegisterIo for IoMem {
    fn read32(&self, offset: usize) -> u32 {
        self.check(offset);
        // SAFETY: offset 已检查在窗口内且对齐
        unsafe { self.base.as_ptr().add(offset).cast::<u32>().read_volatile() }
    }

    fn write32(&self, value: u32, offset: usize) {
        self.check(offset);
        // SAFETY: offset 已检查在窗口内且对齐
        unsafe {
            self.base
                .as_ptr()
                .add(offset)
                .cast::<u32>()
                .write_volatile(value)
        }
    }

    fn size(&self) -> usize {
        self.size
    }
}
