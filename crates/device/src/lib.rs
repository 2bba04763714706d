//! 平台设备绑定框架
//!
//! 此 crate 提供驱动绑定设备所需的通用设施，包括：
//!
//! - [`Driver`] trait - 已绑定设备实例的基础接口
//! - [`PlatformDriver`] trait / [`PlatformBus`] - 平台驱动注册、匹配与延迟探测
//! - [`RegisterIo`] / [`IoMem`] / [`IoMapper`] - MMIO 寄存器窗口与映射
//! - [`Resource`] - 设备资源描述
//! - [`OfNode`] - 设备树节点的属性视图
//! - [`IrqManager`] - 中断线到处理函数的派发
//! - [`DeviceError`] - 错误码
//!
//! # 架构解耦
//!
//! 通过 trait 抽象与宿主中断控制器解耦：
//! - [`IrqOps`]: 中断线启用/禁用操作
//!
//! 使用前必须调用 [`register_irq_ops`] 注册实现。

#![no_std]
#![allow(clippy::module_inception)]

extern crate alloc;

pub mod driver;
pub mod error;
pub mod io;
pub mod irq;
pub mod of;
pub mod ops;
pub mod platform;
pub mod resource;

// Re-export ops
pub use ops::{IrqOps, irq_ops, register_irq_ops};

// Re-export driver
pub use driver::{DeviceType, Driver};

// Re-export error
pub use error::DeviceError;

// Re-export io
pub use io::{IoMapper, IoMem, RegisterIo};

// Re-export irq
pub use irq::{IRQ_MANAGER, IrqFlags, IrqHandler, IrqManager, IrqReturn};

// Re-export of
pub use of::{OfDeviceId, OfNode};

// Re-export platform
pub use platform::{PLATFORM_BUS, PlatformBus, PlatformDevice, PlatformDriver};

// Re-export resource
pub use resource::{Resource, ResourceFlags};
