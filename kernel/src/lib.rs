//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! Minos — Unix 风格教学内核的进程/IPC/描述符核心
//!
//! 本 crate 实现内核中最核心的子系统：
//! - 进程生命周期 (fork/exec/exit/wait/kill) 与进程表
//! - Round-Robin 调度器（睡眠/唤醒、时间片）
//! - 管道 (pipe) 字节流 IPC
//! - 每进程文件描述符表与共享文件对象
//!
//! 物理内存分配器、磁盘 inode 层、程序加载器和控制台驱动都是外部
//! 协作者，通过 `mm::MemoryOps` / `fs::FileSystem` / `console` 的
//! 接口边界接入，内核核心不依赖它们的具体实现。

#![cfg_attr(not(test), no_std)]

extern crate alloc;
extern crate log;

pub mod config;
pub mod console;
pub mod print;
pub mod errno;
pub mod mm;
pub mod process;
pub mod sched;
pub mod fs;
pub mod syscall;

mod kernel;

#[cfg(test)]
mod tests;

pub use errno::Errno;
pub use kernel::Kernel;
pub use process::task::Pid;
pub use syscall::{SysOutcome, SysRet};
