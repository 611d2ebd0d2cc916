//! 场景测试
//!
//! 每个模块针对一块子系统的端到端行为，经由 `Kernel` 的系统调用
//! 边界驱动，协作者使用 `SimpleMm` 和 `RamFs`。
//!
//! 驱动纪律：fork 出的子进程先 `resume`（兑现"如同从 fork 返回 0"），
//! 阻塞返回 `Blocked` 的进程在被唤醒后同样经 `resume` 续跑。

pub mod exec;
pub mod fdtable;
pub mod fs;

use alloc::boxed::Box;

use crate::fs::RamFs;
use crate::mm::{MmStats, SimpleMm};
use crate::syscall::{SysOutcome, SysRet};
use crate::{Kernel, Pid};

/// 标准测试内核：计数内存协作者 + 内存文件系统
pub fn boot() -> Kernel {
    Kernel::new(Box::new(SimpleMm::new()), Box::new(RamFs::new()))
}

/// 带内存计数视图的测试内核
pub fn boot_with_stats() -> (Kernel, MmStats) {
    let mm = SimpleMm::new();
    let stats = mm.stats();
    (Kernel::new(Box::new(mm), Box::new(RamFs::new())), stats)
}

/// fork 一个子进程并完成它的首次调度（fork 的子进程侧返回 0）
pub fn spawn(kernel: &mut Kernel, parent: Pid) -> Pid {
    let child = kernel.sys_fork(parent).expect("fork failed");
    assert_eq!(
        kernel.resume(child).expect("child first schedule failed"),
        SysOutcome::Ready(SysRet::Fork(0))
    );
    child
}
