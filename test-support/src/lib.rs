//! 测试支持 crate
//!
//! 提供宿主机测试使用的 Mock 实现：本地中断状态、中断控制器、模拟寄存器文件。
//! 每个测试线程被视为一个模拟 CPU。

pub mod mock;
