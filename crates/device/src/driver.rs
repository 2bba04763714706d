//! 设备驱动基础类型
//!
//! 包含 Driver trait 和 DeviceType 枚举

use alloc::string::String;

/// 设备类型枚举
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DeviceType {
    /// 用户态 I/O 设备（寄存器窗口与中断暴露给用户空间）
    Uio,
}

/// 已绑定设备实例的特征
///
/// 平台驱动探测成功后返回实现此 trait 的实例，由 [`PlatformBus`](crate::PlatformBus) 持有。
/// 实例被丢弃即意味着设备解绑，实现者应在 `Drop` 中完成设备的静默。
pub trait Driver: Send + Sync {
    /// 返回对应的设备类型，请参阅 DeviceType
    fn device_type(&self) -> DeviceType;

    /// 获取此设备的唯一标识符
    /// 每个实例的标识符应该不同
    fn get_id(&self) -> String;
}
