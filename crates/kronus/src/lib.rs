//! Kronus 用户态 I/O 平台驱动
//!
//! 把 Kronus 设备的寄存器窗口和中断线以 UIO 设备的形式交给用户空间。
//!
//! - [`regs`] - 寄存器映射与控制字
//! - [`arbiter`] - 中断仲裁器：中断处理函数与使用者控制请求共用一把自旋锁
//! - [`driver`] - 平台驱动与探测流程
//! - [`config`] - 驱动常量
//!
//! 宿主内核在注册 `sync` 与 `device` 的架构操作之后调用 [`init`]，卸载时调用 [`exit`]。

#![no_std]

extern crate alloc;
#[cfg(test)]
extern crate std;

pub mod arbiter;
pub mod config;
pub mod driver;
pub mod error;
pub mod regs;

#[cfg(test)]
mod tests;

use alloc::sync::Arc;
use device::{DeviceError, PLATFORM_BUS, PlatformBus};

pub use arbiter::IrqArbiter;
pub use driver::{KronusDriver, KronusUio};
pub use error::ProbeError;
pub use regs::{ControlWord, KronusRegs};

/// 在指定总线上注册驱动
pub fn register(bus: &PlatformBus) -> Result<(), DeviceError> {
    bus.register_driver(Arc::new(KronusDriver))
}

/// 从指定总线注销驱动，解绑所有已绑定的设备
pub fn unregister(bus: &PlatformBus) -> Result<(), DeviceError> {
    bus.unregister_driver(config::DRIVER_NAME)
}

/// 模块初始化
pub fn init() -> Result<(), DeviceError> {
    register(&PLATFORM_BUS)?;
    log::info!("{}", config::MODULE_DESCRIPTION);
    Ok(())
}

/// 模块卸载
pub fn exit() {
    if let Err(e) = unregister(&PLATFORM_BUS) {
        log::warn!("{}: unregister failed: {}", config::DRIVER_NAME, e);
    }
}
