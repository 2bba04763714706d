//! 用户态 I/O（UIO）暴露层
//!
//! 驱动把设备的寄存器窗口和中断线登记为一个 UIO 设备，用户空间的使用者
//! 通过 [`UioListener`] 观察中断事件计数，并通过写入请求启用/屏蔽中断。
//!
//! - [`UioInfo`] - 驱动填写的设备描述（名称、版本、内存映射、中断线、处理函数）
//! - [`UioHandler`] - 驱动提供的两个回调：中断处理与中断控制
//! - [`register_device`] - 登记设备并独占中断线，返回 [`UioDevice`]
//!
//! 中断派发路径：宿主中断入口 → [`device::IRQ_MANAGER`] → [`UioHandler::handle`]，
//! 返回 [`IrqReturn::Handled`](device::IrqReturn::Handled) 时事件计数加一。

#![no_std]

extern crate alloc;

mod info;
mod uio_device;

pub use uio_device::{UioDevice, UioListener, register_device};
pub use info::{IrqLine, MemType, UioHandler, UioInfo, UioMem};

/// 宿主页大小
pub const PAGE_SIZE: usize = 4096;
/// 页对齐掩码
pub const PAGE_MASK: usize = !(PAGE_SIZE - 1);
/// 每个 UIO 设备最多登记的内存映射数
pub const MAX_UIO_MAPS: usize = 5;
