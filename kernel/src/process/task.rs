//! MIT License
//!
//! Copyright (c) 2026 Fei Wang
//!
//! 进程控制块 (PCB)
//!
//! 关键设计要点：
//! 1. 进程槽位组成固定大小的 arena，父子关系用 (槽位, PID) 对
//!    表示并在解引用时校验代际，绝不保存裸指针
//! 2. 阻塞 = 显式状态转移 (Running → Sleeping) + 唤醒条件记录
//!    (`WaitChannel`) + 挂起操作记录 (`PendingOp`)，没有栈式协程
//! 3. ZOMBIE 槽位保留 PID 和退出码，直到父进程 wait 回收

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::TIME_SLICE_TICKS;
use crate::fs::file::{FdTable, File};
use crate::fs::vfs::Ino;
use crate::mm::AsHandle;

/// 进程标识符
pub type Pid = u32;

/// 进程状态
///
/// 生命周期：UNUSED → EMBRYO → RUNNABLE ⇄ RUNNING → SLEEPING →
/// RUNNABLE（循环）；RUNNING → ZOMBIE（exit）→ UNUSED（wait 回收）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TaskState {
    /// 空闲槽位
    Unused = 0,
    /// 正在构造（fork 进行中）
    Embryo = 1,
    /// 就绪，等待调度
    Runnable = 2,
    /// 正在 CPU 上执行
    Running = 3,
    /// 睡眠，等待 chan 上的唤醒
    Sleeping = 4,
    /// 已退出，等待父进程回收
    Zombie = 5,
}

/// 任务标志 (task flags)
pub mod task_flags {
    use bitflags::bitflags;

    bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct TaskFlags: u32 {
            /// 有未决的 kill，下次被调度时退出
            const KILLED  = 0x0001;
            /// 正在执行退出清理
            const EXITING = 0x0002;
        }
    }
}

pub use task_flags::TaskFlags;

/// 唤醒条件记录
///
/// SLEEPING 进程登记自己等待的条件；事件发生方用相同的值做
/// wakeup。管道用其分配地址作身份令牌（两端共享同一 Arc）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitChannel {
    /// 管道有数据可读（或写端关闭）
    PipeReadable(usize),
    /// 管道有空间可写（或读端关闭）
    PipeWritable(usize),
    /// 自己的某个子进程退出（值为父进程 PID）
    ChildExit(Pid),
}

/// 挂起的系统调用记录
///
/// 阻塞的系统调用把自己的续体存在这里；进程被唤醒并重新获得
/// CPU 时（resume），内核从记录处继续执行
pub enum PendingOp {
    /// fork 出的子进程首次被调度，"如同从 fork 返回 0"
    ForkChild,
    /// 阻塞在 wait 中，唤醒后重新扫描子进程
    Wait,
    /// 阻塞的管道读
    PipeRead { file: Arc<File>, max: usize },
    /// 阻塞的管道写，written 记录已写入的进度
    PipeWrite {
        file: Arc<File>,
        data: Vec<u8>,
        written: usize,
    },
}

/// CPU 上下文
///
/// 本核心真正随进程切换保存/恢复的只有系统调用返回值寄存器
/// (a0)；其余寄存器状态属于外部的陷入/恢复胶水层
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    /// 系统调用返回值槽（fork 的子进程在这里拿到 0）
    pub retval: i64,
}

/// 进程控制块
pub struct Task {
    /// 进程状态
    state: TaskState,

    /// 进程 ID；Unused 槽位为 0
    pid: Pid,

    /// 父进程 (槽位, 当时的 PID)；解引用时校验 PID 防止槽位复用
    /// 后悬空。init 没有父进程。
    pub(crate) parent: Option<(usize, Pid)>,

    /// 任务标志
    pub(crate) flags: TaskFlags,

    /// 进程名（诊断用）
    pub(crate) name: String,

    /// 退出码，仅 Zombie 状态有效
    exit_code: i32,

    /// 时间片剩余（时钟中断数）
    time_slice: u32,

    /// CPU 上下文
    pub(crate) context: Context,

    /// 睡眠时等待的条件
    pub(crate) chan: Option<WaitChannel>,

    /// 挂起的系统调用
    pub(crate) pending: Option<PendingOp>,

    /// 文件描述符表（本进程独占，文件对象共享）
    pub(crate) fdtable: FdTable,

    /// 当前目录（对文件系统协作者持有一个打开引用）
    pub(crate) cwd: Ino,

    /// 地址空间句柄，本 PCB 独占直到 exit
    pub(crate) address_space: Option<AsHandle>,
}

impl Task {
    /// 空闲槽位
    pub fn unused() -> Self {
        Self {
            state: TaskState::Unused,
            pid: 0,
            parent: None,
            flags: TaskFlags::empty(),
            name: String::new(),
            exit_code: 0,
            time_slice: TIME_SLICE_TICKS,
            context: Context::default(),
            chan: None,
            pending: None,
            fdtable: FdTable::new(),
            cwd: 0,
            address_space: None,
        }
    }

    /// 把槽位重置为 EMBRYO 并赋予新 PID（fork 构造期）
    pub fn reset(&mut self, pid: Pid) {
        debug_assert_eq!(self.state, TaskState::Unused);
        *self = Self::unused();
        self.pid = pid;
        self.state = TaskState::Embryo;
    }

    /// 回收槽位（wait 回收或 fork 失败回滚）
    pub fn clear(&mut self) {
        debug_assert_eq!(self.fdtable.open_count(), 0);
        debug_assert!(self.address_space.is_none());
        *self = Self::unused();
    }

    #[inline]
    pub fn state(&self) -> TaskState {
        self.state
    }

    #[inline]
    pub fn set_state(&mut self, state: TaskState) {
        self.state = state;
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    #[inline]
    pub fn set_exit_code(&mut self, code: i32) {
        self.exit_code = code;
    }

    #[inline]
    pub fn killed(&self) -> bool {
        self.flags.contains(TaskFlags::KILLED)
    }

    /// 减少时间片；返回 false 表示时间片已用完
    #[inline]
    pub fn tick_time_slice(&mut self) -> bool {
        if self.time_slice > 0 {
            self.time_slice -= 1;
        }
        self.time_slice > 0
    }

    /// 重新获得 CPU 时重置时间片
    #[inline]
    pub fn reset_time_slice(&mut self) {
        self.time_slice = TIME_SLICE_TICKS;
    }
}
