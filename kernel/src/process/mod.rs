//! 进程管理模块
//!
//! - `task`: 进程控制块与状态机
//! - `table`: 固定大小的进程表 arena
//! - `pid`: PID 分配
//! - `fork` / `exit` / `exec`: 生命周期操作（Kernel 的方法）

pub mod exec;
pub mod exit;
pub mod fork;
pub mod pid;
pub mod table;
pub mod task;

pub use table::ProcessTable;
pub use task::{Pid, Task, TaskState};
