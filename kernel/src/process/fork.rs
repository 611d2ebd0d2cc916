//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 进程创建 (fork)
//!
//! 流程：
//! 1. 分配进程表槽位（EMBRYO）
//! 2. 克隆地址空间（独立副本，失败则整体回滚）
//! 3. 逐槽复制文件描述符表（共享文件对象，引用计数 +1）
//! 4. 继承当前目录
//! 5. 设置父链接与子进程的返回值 0，转 RUNNABLE
//!
//! 双重返回：父进程从本调用拿到子 PID；子进程是一个新调度的
//! 任务，首次 resume 时"如同从 fork 返回 0"。

use crate::errno::Errno;
use crate::kernel::Kernel;
use crate::process::task::{PendingOp, Pid, TaskState};

impl Kernel {
    /// 创建子进程，返回其 PID
    ///
    /// 进程表满（或 PID 耗尽）返回 `TryAgain`，地址空间克隆失败
    /// 返回 `OutOfMemory`；两者都不留下任何可见的中间状态
    pub fn sys_fork(&mut self, pid: Pid) -> Result<Pid, Errno> {
        let pslot = self.on_cpu(pid)?;

        let child_slot = self.ptable.alloc().ok_or(Errno::TryAgain)?;

        let parent_space = self
            .ptable
            .get(pslot)
            .address_space
            .expect("fork: user task without address space");
        let child_space = match self.mm.clone_address_space(parent_space) {
            Ok(space) => space,
            Err(e) => {
                self.ptable.release(child_slot);
                return Err(e);
            }
        };

        let fdtable = self.ptable.get(pslot).fdtable.fork_copy();
        let cwd = self.ptable.get(pslot).cwd;
        self.fs.idup(cwd);
        let name = self.ptable.get(pslot).name.clone();

        let child_pid = {
            let child = self.ptable.get_mut(child_slot);
            child.address_space = Some(child_space);
            child.fdtable = fdtable;
            child.cwd = cwd;
            child.name = name;
            child.parent = Some((pslot, pid));
            child.context.retval = 0;
            child.pending = Some(PendingOp::ForkChild);
            child.set_state(TaskState::Runnable);
            child.pid()
        };

        log::debug!("fork: pid {} -> child {}", pid, child_pid);
        self.set_retval(pslot, child_pid as i64);
        Ok(child_pid)
    }
}
