//! UIO 设备描述

use alloc::{string::String, sync::Arc, vec::Vec};
use device::{DeviceError, IrqFlags, IrqReturn, Resource};

use crate::{PAGE_MASK, PAGE_SIZE};

/// 内存映射的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemType {
    /// 未使用
    #[default]
    None,
    /// 物理地址，使用者直接映射设备内存
    Phys,
    /// 内核逻辑地址
    Logical,
    /// 内核虚拟地址
    Virtual,
}

/// 暴露给使用者的一段内存
///
/// `addr` 页对齐，`offs` 是真实起始地址在页内的偏移，`size` 向上取整到页大小。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UioMem {
    /// 映射名称
    pub name: String,
    /// 页对齐的起始地址
    pub addr: usize,
    /// 真实起始地址在页内的偏移
    pub offs: usize,
    /// 按页取整后的长度
    pub size: usize,
    /// 内存类型
    pub memtype: MemType,
}

impl UioMem {
    /// 由物理内存资源构造按页取整的映射描述
    pub fn from_resource(res: &Resource) -> Self {
        let offs = res.start & !PAGE_MASK;
        Self {
            name: res.name.clone(),
            addr: res.start & PAGE_MASK,
            offs,
            size: (offs + res.size + PAGE_SIZE - 1) & PAGE_MASK,
            memtype: MemType::Phys,
        }
    }
}

/// 设备的中断线
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IrqLine {
    /// 尚未确定，由驱动在探测时查询
    #[default]
    Unset,
    /// 设备没有可用的中断
    None,
    /// 中断号
    Irq(u32),
}

/// 驱动提供给 UIO 层的回调
pub trait UioHandler: Send + Sync {
    /// 中断处理函数，在中断上下文中执行，不可睡眠
    fn handle(&self) -> IrqReturn;

    /// 使用者请求启用（`true`）或屏蔽（`false`）中断
    fn irqcontrol(&self, irq_on: bool) -> Result<(), DeviceError>;
}

/// UIO 设备描述
#[derive(Clone, Default)]
pub struct UioInfo {
    /// 设备名
    pub name: Option<String>,
    /// 驱动版本
    pub version: Option<String>,
    /// 内存映射
    pub mem: Vec<UioMem>,
    /// 中断线
    pub irq: IrqLine,
    /// 中断请求标志
    pub irq_flags: IrqFlags,
    /// 中断回调
    pub handler: Option<Arc<dyn UioHandler>>,
}

impl UioInfo {
    /// 以名称和版本创建描述
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: Some(String::from(name)),
            version: Some(String::from(version)),
            ..Self::default()
        }
    }
}
