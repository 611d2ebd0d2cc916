//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 进程退出与回收 (exit/wait/kill)
//!
//! exit 负责释放进程持有的一切共享资源（描述符、cwd、地址空间）、
//! 把子进程过继给 init，然后进入 ZOMBIE 等待父进程回收；PCB 槽位
//! 和 PID 在父进程 wait 成功后才变回 UNUSED。
//!
//! 唤醒顺序约定：先置 ZOMBIE、后唤醒父进程，二者都在进程表锁内，
//! 子进程对 wait 可见的时刻不早于 ZOMBIE 生效，不存在丢失唤醒。

use alloc::vec::Vec;

use crate::config::INIT_PID;
use crate::errno::Errno;
use crate::kernel::Kernel;
use crate::process::task::{PendingOp, Pid, TaskFlags, TaskState, WaitChannel};
use crate::syscall::SysOutcome;

impl Kernel {
    /// 终止调用进程，status 交给父进程的 wait
    ///
    /// 本调用不返回到调用进程；init 退出是致命错误
    pub fn sys_exit(&mut self, pid: Pid, status: i32) {
        let slot = self
            .ptable
            .slot_of(pid)
            .unwrap_or_else(|| panic!("exit of unknown pid {}", pid));
        match self.ptable.get(slot).state() {
            TaskState::Running | TaskState::Runnable => {}
            state => panic!("exit of pid {} in state {:?}", pid, state),
        }
        self.do_exit_slot(slot, status);
    }

    /// exit 的核心；也用于兑现未决的 kill
    pub(crate) fn do_exit_slot(&mut self, slot: usize, status: i32) {
        let pid = self.ptable.get(slot).pid();
        if pid == INIT_PID {
            panic!("init exiting");
        }
        // exit 是在退出进程自己的上下文里执行的
        self.switch_current(slot);
        self.ptable.get_mut(slot).flags |= TaskFlags::EXITING;
        log::debug!("exit: pid {} status {}", pid, status);

        // 关闭全部打开的描述符
        let files = self.ptable.get_mut(slot).fdtable.drain();
        for file in files {
            self.file_close(file);
        }

        // 归还当前目录的打开引用
        let cwd = self.ptable.get(slot).cwd;
        self.fs.iput(cwd);

        // 地址空间归还分配器
        if let Some(space) = self.ptable.get_mut(slot).address_space.take() {
            self.mm.destroy_address_space(space);
        }

        // 子进程（含 Zombie）全部过继给 init；有 Zombie 要交接时
        // 唤醒 init，确保它们仍会被回收
        let init_slot = self.init_slot;
        let children = self.ptable.children_of(slot);
        let mut zombie_handed = false;
        for child in children {
            self.ptable.get_mut(child).parent = Some((init_slot, INIT_PID));
            if self.ptable.get(child).state() == TaskState::Zombie {
                zombie_handed = true;
            }
        }
        if zombie_handed {
            self.wakeup(WaitChannel::ChildExit(INIT_PID));
        }

        // 转 ZOMBIE，然后通知父进程
        let parent = self.ptable.parent_slot(slot);
        {
            let task = self.ptable.get_mut(slot);
            task.set_exit_code(status);
            task.chan = None;
            task.pending = None;
            task.set_state(TaskState::Zombie);
        }
        if let Some(pslot) = parent {
            let ppid = self.ptable.get(pslot).pid();
            self.wakeup(WaitChannel::ChildExit(ppid));
        }

        // 永久让出 CPU
        if self.current == Some(slot) {
            self.current = None;
        }
        self.schedule();
    }

    /// 等待一个子进程退出，返回其 PID 和退出状态
    ///
    /// 没有任何子进程时立即返回 `NoChild`（不阻塞）；有子进程但
    /// 都未退出时睡眠，由子进程的 exit 唤醒
    pub fn sys_wait(&mut self, pid: Pid) -> Result<SysOutcome<(Pid, i32)>, Errno> {
        let slot = self.on_cpu(pid)?;
        self.wait_step(slot)
    }

    /// wait 的单次扫描；也在被唤醒后通过 resume 重入
    pub(crate) fn wait_step(&mut self, slot: usize) -> Result<SysOutcome<(Pid, i32)>, Errno> {
        let my_pid = self.ptable.get(slot).pid();
        let children: Vec<usize> = self.ptable.children_of(slot);
        if children.is_empty() {
            return Err(Errno::NoChild);
        }

        // 确定性回收：取 PID 最小的 Zombie 子进程
        let zombie = children
            .iter()
            .copied()
            .filter(|&c| self.ptable.get(c).state() == TaskState::Zombie)
            .min_by_key(|&c| self.ptable.get(c).pid());

        if let Some(child) = zombie {
            let child_pid = self.ptable.get(child).pid();
            let status = self.ptable.get(child).exit_code();
            self.ptable.release(child);
            log::debug!("wait: pid {} reaped child {} status {}", my_pid, child_pid, status);
            self.set_retval(slot, child_pid as i64);
            return Ok(SysOutcome::Ready((child_pid, status)));
        }

        self.sleep_on(slot, WaitChannel::ChildExit(my_pid), PendingOp::Wait);
        Ok(SysOutcome::Blocked)
    }

    /// 标记目标进程终止
    ///
    /// 睡眠中的目标被置为 RUNNABLE，下次获得 CPU 时经由 exit 退出；
    /// PID 不存在返回 `NoSuchProcess`。对 Zombie 目标是无害的空操作。
    pub fn sys_kill(&mut self, pid: Pid, target: Pid) -> Result<(), Errno> {
        self.on_cpu(pid)?;
        let tslot = self.ptable.slot_of(target).ok_or(Errno::NoSuchProcess)?;

        let task = self.ptable.get_mut(tslot);
        if task.state() == TaskState::Zombie {
            return Ok(());
        }
        task.flags |= TaskFlags::KILLED;
        if task.state() == TaskState::Sleeping {
            task.set_state(TaskState::Runnable);
            task.chan = None;
        }
        log::debug!("kill: pid {} -> target {}", pid, target);
        self.need_resched = true;
        Ok(())
    }
}
