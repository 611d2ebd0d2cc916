//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 调度器
//!
//! RUNNABLE 进程上的 Round-Robin 选择，没有优先级，也没有
//! Round-Robin 顺序之外的防饥饿机制。上下文切换发生在：
//! - 进程阻塞（管道等待、wait）
//! - 进程退出
//! - 主动让出 (sys_yield)
//! - 时钟中断耗尽时间片后分发层调用 schedule()（抢占）
//!
//! 睡眠/唤醒协议：睡眠方先把状态改为 SLEEPING 并登记唤醒条件，
//! 再切走；唤醒方修改共享状态后按同一条件 wakeup。二者都在
//! `&mut Kernel`（进程表锁）之下执行，不存在丢失唤醒的窗口。

use crate::kernel::Kernel;
use crate::process::task::{PendingOp, Pid, TaskState, WaitChannel};

impl Kernel {
    /// 从游标处顺时针找下一个 RUNNABLE 槽位
    fn pick_next(&mut self) -> Option<usize> {
        let n = self.ptable.capacity();
        for off in 1..=n {
            let slot = (self.rr_cursor + off) % n;
            if self.ptable.get(slot).state() == TaskState::Runnable {
                return Some(slot);
            }
        }
        None
    }

    /// 主调度入口：选出下一个进程并完成切换，返回其 PID
    ///
    /// 没有任何 RUNNABLE 进程可选是内核级死锁，直接 panic
    pub fn schedule(&mut self) -> Pid {
        if let Some(cur) = self.current {
            if self.ptable.get(cur).state() == TaskState::Running {
                self.ptable.get_mut(cur).set_state(TaskState::Runnable);
            }
        }
        self.current = None;
        let next = self
            .pick_next()
            .unwrap_or_else(|| panic!("scheduler: no runnable process"));
        self.switch_current(next);
        self.ptable.get(next).pid()
    }

    /// 阻塞点：登记唤醒条件与挂起操作，切到别的进程
    pub(crate) fn sleep_on(&mut self, slot: usize, chan: WaitChannel, pending: PendingOp) {
        let task = self.ptable.get_mut(slot);
        task.set_state(TaskState::Sleeping);
        task.chan = Some(chan);
        task.pending = Some(pending);
        log::debug!("sleep: pid {} on {:?}", task.pid(), chan);

        if self.current == Some(slot) {
            self.current = None;
        }
        let next = self
            .pick_next()
            .unwrap_or_else(|| panic!("scheduler: no runnable process"));
        self.switch_current(next);
    }

    /// 唤醒在 chan 上睡眠的所有进程
    pub(crate) fn wakeup(&mut self, chan: WaitChannel) {
        let mut woken = 0usize;
        for slot in 0..self.ptable.capacity() {
            let task = self.ptable.get_mut(slot);
            if task.state() == TaskState::Sleeping && task.chan == Some(chan) {
                task.set_state(TaskState::Runnable);
                task.chan = None;
                woken += 1;
            }
        }
        if woken > 0 {
            log::debug!("wakeup: {:?} woke {} task(s)", chan, woken);
            self.need_resched = true;
        }
    }

    /// 时钟中断（外部计时器驱动）：时间片记账
    pub fn scheduler_tick(&mut self) {
        if let Some(cur) = self.current {
            if !self.ptable.get_mut(cur).tick_time_slice() {
                self.ptable.get_mut(cur).reset_time_slice();
                self.need_resched = true;
            }
        }
    }

    /// 分发层据此决定是否调用 schedule()
    pub fn need_resched(&self) -> bool {
        self.need_resched
    }

    /// 主动让出 CPU
    pub fn sys_yield(&mut self, pid: Pid) -> Result<Pid, crate::errno::Errno> {
        self.on_cpu(pid)?;
        Ok(self.schedule())
    }
}
