//! 寄存器映射
//!
//! | 偏移   | 名称   | 说明                         |
//! |--------|--------|------------------------------|
//! | `0x00` | STATUS | 状态（保留，驱动不依赖）     |
//! | `0x10` | CTRL   | 控制，写入 [`ControlWord`]   |
//!
//! 控制寄存器总是整字写入，从不读回。

use alloc::sync::Arc;
use device::{DeviceError, RegisterIo};

use crate::config::{CTRL_IRQ_EN, CTRL_IRQ_MASK, CTRL_REG, CTRL_RESET, REG_BLOCK_LEN, STATUS_REG};

/// 控制寄存器的取值
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlWord {
    /// 复位设备
    Reset = CTRL_RESET,
    /// 屏蔽中断
    IrqMasked = CTRL_IRQ_MASK,
    /// 启用中断
    IrqEnabled = CTRL_IRQ_EN,
}

impl ControlWord {
    /// 写入寄存器的位模式
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// 由位模式还原，非法值返回 `None`
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            CTRL_RESET => Some(Self::Reset),
            CTRL_IRQ_MASK => Some(Self::IrqMasked),
            CTRL_IRQ_EN => Some(Self::IrqEnabled),
            _ => None,
        }
    }
}

/// 映射后的 Kronus 寄存器块
///
/// 只有 [`IrqArbiter`](crate::arbiter::IrqArbiter) 持有它，所有控制写入都在仲裁器的锁内发生。
pub struct KronusRegs {
    io: Arc<dyn RegisterIo>,
}

impl KronusRegs {
    /// 包装一个寄存器窗口
    ///
    /// 窗口短于寄存器块时返回 [`DeviceError::InvalidArgument`]。
    pub fn new(io: Arc<dyn RegisterIo>) -> Result<Self, DeviceError> {
        if io.size() < REG_BLOCK_LEN {
            return Err(DeviceError::InvalidArgument);
        }
        Ok(Self { io })
    }

    pub(crate) fn write_control(&self, word: ControlWord) {
        self.io.write32(word.bits(), CTRL_REG);
    }

    pub(crate) fn read_status(&self) -> u32 {
        self.io.read32(STATUS_REG)
    }
}
