//! 设备层错误类型
//!
//! 各错误码对应 Linux 内核的 errno 值，可通过 [`DeviceError::to_errno()`] 转换。

use core::fmt;

/// 设备层错误类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// 无效参数 (-EINVAL)
    InvalidArgument,
    /// 内存不足 (-ENOMEM)
    NoMemory,
    /// 设备不存在 (-ENODEV)
    NoDevice,
    /// 资源不存在 (-ENXIO)
    NotFound,
    /// 资源暂不可用，稍后重新探测 (-EPROBE_DEFER)
    ProbeDefer,
    /// 资源已被占用 (-EBUSY)
    Busy,
    /// I/O 错误 (-EIO)
    IoError,
}

impl DeviceError {
    /// 转换为内核错误码（负数）
    pub fn to_errno(&self) -> isize {
        match self {
            DeviceError::IoError => -5,
            DeviceError::NotFound => -6,
            DeviceError::NoMemory => -12,
            DeviceError::Busy => -16,
            DeviceError::NoDevice => -19,
            DeviceError::InvalidArgument => -22,
            DeviceError::ProbeDefer => -517,
        }
    }

    /// 是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeviceError::ProbeDefer)
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceError::InvalidArgument => "invalid argument",
            DeviceError::NoMemory => "out of memory",
            DeviceError::NoDevice => "no such device",
            DeviceError::NotFound => "no such device or address",
            DeviceError::ProbeDefer => "probe deferred",
            DeviceError::Busy => "device or resource busy",
            DeviceError::IoError => "I/O error",
        };
        f.write_str(s)
    }
}
