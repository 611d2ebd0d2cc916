//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 内核聚合体
//!
//! [`Kernel`] 把进程表、调度器状态和两个外部协作者（内存/加载器、
//! 文件系统）装在一起。外部的系统调用分发层很薄：它知道是哪个
//! 进程陷入的，把 PID 连同参数转交给对应的 `sys_*` 方法。
//!
//! 单 CPU 模型：任一时刻只有一个进程 RUNNING。对 `Kernel` 的
//! 独占可变访问就是进程表锁，完全串行化 fork/fork、exit/wait
//! 的竞争；跨描述符表共享的对象（管道、文件偏移）各带自己的锁。

use alloc::boxed::Box;

use crate::errno::Errno;
use crate::fs::vfs::FileSystem;
use crate::mm::MemoryOps;
use crate::print;
use crate::process::table::ProcessTable;
use crate::process::task::{PendingOp, Pid, TaskState};
use crate::syscall::{SysOutcome, SysRet};

pub struct Kernel {
    pub(crate) ptable: ProcessTable,
    /// RUNNING 进程的槽位
    pub(crate) current: Option<usize>,
    /// Round-Robin 游标：上次调度到的槽位
    pub(crate) rr_cursor: usize,
    pub(crate) need_resched: bool,
    pub(crate) init_slot: usize,
    pub(crate) mm: Box<dyn MemoryOps>,
    pub(crate) fs: Box<dyn FileSystem>,
}

impl Kernel {
    /// 创建内核并手工构造第一个进程 (init)
    ///
    /// init 无法通过 fork 产生，引导失败是致命的
    pub fn new(mm: Box<dyn MemoryOps>, fs: Box<dyn FileSystem>) -> Self {
        print::init_logging();

        let mut kernel = Self {
            ptable: ProcessTable::new(),
            current: None,
            rr_cursor: 0,
            need_resched: false,
            init_slot: 0,
            mm,
            fs,
        };

        let slot = kernel
            .ptable
            .alloc()
            .expect("boot: empty process table has no free slot");
        let space = kernel
            .mm
            .create_address_space()
            .expect("boot: cannot create address space for init");

        let root = kernel.fs.root();
        kernel.fs.idup(root);

        let task = kernel.ptable.get_mut(slot);
        task.name = alloc::string::String::from("init");
        task.cwd = root;
        task.address_space = Some(space);
        task.set_state(TaskState::Running);

        kernel.init_slot = slot;
        kernel.current = Some(slot);
        kernel.rr_cursor = slot;

        log::info!(
            "{} {}: init pid {}",
            crate::config::KERNEL_NAME,
            crate::config::KERNEL_VERSION,
            kernel.ptable.get(slot).pid()
        );

        kernel
    }

    /// init 进程的 PID
    pub fn init_pid(&self) -> Pid {
        self.ptable.get(self.init_slot).pid()
    }

    /// 当前 RUNNING 进程的 PID
    pub fn current_pid(&self) -> Option<Pid> {
        self.current.map(|slot| self.ptable.get(slot).pid())
    }

    /// 查询进程状态（诊断/测试用）
    pub fn state_of(&self, pid: Pid) -> Option<TaskState> {
        self.ptable
            .slot_of(pid)
            .map(|slot| self.ptable.get(slot).state())
    }

    /// 系统调用入口：pid 陷入内核
    ///
    /// 给它 CPU（上一个 RUNNING 进程退回 RUNNABLE，相当于一次
    /// 抢占切换），并在此处兑现未决的 kill。分发层为不存在或
    /// 不可运行的进程发起系统调用属于协议错误，按内核不变量
    /// 破坏处理 (panic)。
    pub(crate) fn on_cpu(&mut self, pid: Pid) -> Result<usize, Errno> {
        let slot = self
            .ptable
            .slot_of(pid)
            .unwrap_or_else(|| panic!("syscall from unknown pid {}", pid));

        match self.ptable.get(slot).state() {
            TaskState::Running | TaskState::Runnable => {}
            state => panic!("syscall from pid {} in state {:?}", pid, state),
        }
        if self.ptable.get(slot).pending.is_some() {
            panic!("syscall from pid {} with an operation still pending", pid);
        }

        if self.ptable.get(slot).killed() {
            // 未决的 kill 在下次获得 CPU 时兑现
            self.do_exit_slot(slot, -1);
            return Err(Errno::InterruptedSystemCall);
        }

        self.switch_current(slot);
        Ok(slot)
    }

    /// 被唤醒（或刚 fork 出）的进程重新获得 CPU，继续其挂起操作
    ///
    /// 返回操作的最终结果；条件仍不满足则再次睡眠并返回 Blocked
    pub fn resume(&mut self, pid: Pid) -> Result<SysOutcome<SysRet>, Errno> {
        let slot = self
            .ptable
            .slot_of(pid)
            .unwrap_or_else(|| panic!("resume of unknown pid {}", pid));

        match self.ptable.get(slot).state() {
            TaskState::Runnable | TaskState::Running => {}
            // 虚假恢复：还在睡眠，条件未满足
            TaskState::Sleeping => return Ok(SysOutcome::Blocked),
            state => panic!("resume of pid {} in state {:?}", pid, state),
        }

        if self.ptable.get(slot).killed() {
            self.do_exit_slot(slot, -1);
            return Err(Errno::InterruptedSystemCall);
        }

        let pending = self
            .ptable
            .get_mut(slot)
            .pending
            .take()
            .unwrap_or_else(|| panic!("resume of pid {} with nothing pending", pid));

        self.switch_current(slot);

        match pending {
            PendingOp::ForkChild => {
                // 双重返回契约的另一半：子进程"如同从 fork 返回 0"
                self.set_retval(slot, 0);
                Ok(SysOutcome::Ready(SysRet::Fork(0)))
            }
            PendingOp::Wait => Ok(self
                .wait_step(slot)?
                .map(|(pid, status)| SysRet::Wait { pid, status })),
            PendingOp::PipeRead { file, max } => Ok(self
                .pipe_read_step(slot, file, max)?
                .map(SysRet::Read)),
            PendingOp::PipeWrite {
                file,
                data,
                written,
            } => Ok(self
                .pipe_write_step(slot, file, data, written)?
                .map(SysRet::Write)),
        }
    }

    /// 把 CPU 交给 slot（隐式的上下文切换）
    pub(crate) fn switch_current(&mut self, slot: usize) {
        if self.current == Some(slot) {
            return;
        }
        if let Some(prev) = self.current {
            if self.ptable.get(prev).state() == TaskState::Running {
                self.ptable.get_mut(prev).set_state(TaskState::Runnable);
            }
        }
        self.ptable.get_mut(slot).set_state(TaskState::Running);
        self.ptable.get_mut(slot).reset_time_slice();
        self.current = Some(slot);
        self.rr_cursor = slot;
        self.need_resched = false;
    }

    /// 把完成的系统调用结果写入保存的上下文（a0 槽）
    pub(crate) fn set_retval(&mut self, slot: usize, retval: i64) {
        self.ptable.get_mut(slot).context.retval = retval;
    }
}
