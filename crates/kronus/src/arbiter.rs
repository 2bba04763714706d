//! 中断仲裁器
//!
//! 中断处理函数与使用者的启用/屏蔽请求都要写同一个控制寄存器。
//! 二者共享一把 [`SpinLock`]：
//!
//! - 中断上下文通过 [`SpinLock::lock_from_irq`] 获取，只自旋不改中断状态；
//! - 使用者的控制路径通过 [`SpinLock::lock`] 获取，持锁期间本地中断被禁用，
//!   因此本 CPU 上的中断处理函数不会在持锁时抢占它。
//!
//! 寄存器块本身位于锁内，不持锁就无法写控制寄存器。
//!
//! 状态机：
//!
//! ```text
//!            set_irq_enabled(true)
//!   MASKED ------------------------> ENABLED
//!     ^  ^                              |
//!     |  +------------------------------+
//!     |    on_interrupt / set_irq_enabled(false)
//!   reset()
//! ```

use device::{DeviceError, IrqReturn};
use sync::SpinLock;
use uio::UioHandler;

use crate::regs::{ControlWord, KronusRegs};

struct ArbiterState {
    regs: KronusRegs,
    /// 最后一次写入的值，只在锁内更新
    last: Option<ControlWord>,
}

impl ArbiterState {
    fn commit(&mut self, word: ControlWord) {
        self.regs.write_control(word);
        self.last = Some(word);
    }
}

/// 控制寄存器的唯一写入者
pub struct IrqArbiter {
    state: SpinLock<ArbiterState>,
}

impl IrqArbiter {
    /// 接管寄存器块
    ///
    /// 此时不写任何寄存器；绑定流程随后调用 [`IrqArbiter::reset`]。
    pub fn new(regs: KronusRegs) -> Self {
        Self {
            state: SpinLock::new(ArbiterState { regs, last: None }),
        }
    }

    /// 中断处理函数
    ///
    /// 屏蔽设备中断后返回，由使用者决定何时重新启用。电平触发的中断线
    /// 因此不会在使用者处理前反复进入。设备不提供待处理状态，所以总是认领本次中断。
    pub fn on_interrupt(&self) -> IrqReturn {
        self.state.lock_from_irq().commit(ControlWord::IrqMasked);
        IrqReturn::Handled
    }

    /// 使用者请求启用或屏蔽中断
    pub fn set_irq_enabled(&self, enable: bool) -> Result<(), DeviceError> {
        let word = if enable {
            ControlWord::IrqEnabled
        } else {
            ControlWord::IrqMasked
        };
        self.state.lock().commit(word);
        Ok(())
    }

    /// 复位设备并使其处于屏蔽状态，仅在绑定时调用
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.commit(ControlWord::Reset);
        state.commit(ControlWord::IrqMasked);
    }

    /// 屏蔽设备中断
    ///
    /// 仲裁器被丢弃时自动调用，此后寄存器窗口随之释放。
    pub fn quiesce(&self) {
        self.state.lock().commit(ControlWord::IrqMasked);
    }

    /// 最后一次写入控制寄存器的值，复位前为 `None`
    pub fn last_written(&self) -> Option<ControlWord> {
        self.state.lock().last
    }

    /// 读取状态寄存器
    pub fn read_status(&self) -> u32 {
        self.state.lock().regs.read_status()
    }
}

impl Drop for IrqArbiter {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.last.is_some() {
            state.commit(ControlWord::IrqMasked);
        }
    }
}

impl UioHandler for IrqArbiter {
    fn handle(&self) -> IrqReturn {
        self.on_interrupt()
    }

    fn irqcontrol(&self, irq_on: bool) -> Result<(), DeviceError> {
        self.set_irq_enabled(irq_on)
    }
}
