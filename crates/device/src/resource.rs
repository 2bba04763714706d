//! 设备资源描述

use alloc::string::String;
use bitflags::bitflags;

bitflags! {
    /// 资源类型标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResourceFlags: u32 {
        /// I/O 端口空间
        const IO = 0x0000_0100;
        /// 内存映射空间
        const MEM = 0x0000_0200;
    }
}

/// 一段物理资源，区间为 `[start, start + size)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// 起始物理地址
    pub start: usize,
    /// 长度（字节）
    pub size: usize,
    /// 资源名称
    pub name: String,
    /// 资源类型
    pub flags: ResourceFlags,
}

impl Resource {
    /// 创建一段内存资源
    pub fn mem(start: usize, size: usize, name: &str) -> Self {
        Self {
            start,
            size,
            name: String::from(name),
            flags: ResourceFlags::MEM,
        }
    }

    /// 资源的最后一个字节地址
    pub fn end(&self) -> usize {
        self.start + self.size.saturating_sub(1)
    }

    /// 是否为内存资源
    pub fn is_mem(&self) -> bool {
        self.flags.contains(ResourceFlags::MEM)
    }
}
