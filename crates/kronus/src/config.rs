//! 驱动常量

/// 平台驱动名
pub const DRIVER_NAME: &str = "kronus-uio";
/// 设备树 compatible
pub const OF_COMPATIBLE: &str = "kronus-uio";
/// 覆盖 UIO 设备名的设备树属性
pub const OF_UIO_NAME_PROP: &str = "linux,uio-name";
/// 从设备树绑定时登记的版本字符串
pub const OF_UIO_VERSION: &str = "devicetree";

/// 状态寄存器偏移（保留）
pub const STATUS_REG: usize = 0x00;
/// 控制寄存器偏移
pub const CTRL_REG: usize = 0x10;
/// 寄存器块长度
pub const REG_BLOCK_LEN: usize = CTRL_REG + 4;

/// 复位
pub const CTRL_RESET: u32 = 0x001;
/// 屏蔽中断
pub const CTRL_IRQ_MASK: u32 = 0x000;
/// 启用中断
pub const CTRL_IRQ_EN: u32 = 0xFF0;

/// 模块描述
pub const MODULE_DESCRIPTION: &str = "Kronus userspace I/O platform driver";
/// 模块作者
pub const MODULE_AUTHOR: &str = "Brett Witherspoon";
/// 模块许可证
pub const MODULE_LICENSE: &str = "GPL v2";
