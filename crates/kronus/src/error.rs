//! 绑定错误

use core::fmt;
use device::DeviceError;

/// 探测失败的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeError {
    /// 平台数据缺失或中断配置不受支持
    Config(&'static str),
    /// 中断号暂不可用，稍后重试
    Defer,
    /// 查询中断号失败
    Irq(DeviceError),
    /// 寄存器窗口缺失或映射失败
    Map(DeviceError),
    /// UIO 登记失败
    Register(DeviceError),
}

impl ProbeError {
    /// 是否应当稍后重新探测
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProbeError::Defer)
    }
}

impl From<ProbeError> for DeviceError {
    fn from(err: ProbeError) -> Self {
        match err {
            ProbeError::Config(_) => DeviceError::InvalidArgument,
            ProbeError::Defer => DeviceError::ProbeDefer,
            ProbeError::Irq(e) | ProbeError::Map(e) | ProbeError::Register(e) => e,
        }
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Config(msg) => f.write_str(msg),
            ProbeError::Defer => f.write_str("interrupt not yet available"),
            ProbeError::Irq(e) => write!(f, "failed to get interrupt: {}", e),
            ProbeError::Map(e) => write!(f, "failed to map registers: {}", e),
            ProbeError::Register(e) => write!(f, "failed to register uio device: {}", e),
        }
    }
}
